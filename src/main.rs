use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use secapp::config::WorkerConfig;
use secapp::consts::DEFAULT_SCRIPT;
use secapp::result::WorkerResult;
use secapp::service::QueryService;
use secapp::worker::process::ProcessInvoker;

#[derive(Parser)]
#[command(name = "secapp", version, about = "Ask questions about filings via the query worker.")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Worker directory (default: ../worker_py relative to the current directory)
    #[arg(long, env = "SECAPP_WORKER_DIR")]
    worker_dir: Option<PathBuf>,

    /// Interpreter to run the worker with (default: worker venv, then python3)
    #[arg(long, env = "PYTHON_BIN")]
    python: Option<PathBuf>,

    /// Worker script, relative to the worker directory
    #[arg(long, env = "SECAPP_WORKER_SCRIPT", default_value = DEFAULT_SCRIPT)]
    script: PathBuf,

    /// Worker timeout in seconds
    #[arg(short, long, default_value_t = 360)]
    timeout: u64,

    /// Ask a single prompt and exit (non-interactive)
    #[arg(short, long)]
    prompt: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Show how the worker would be launched and verify it exists
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout is reserved for result JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("secapp=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let base = match cli.worker_dir {
        Some(dir) => WorkerConfig::new(dir),
        None => WorkerConfig::from_current_dir().context("cannot determine current directory")?,
    };
    let config = WorkerConfig {
        interpreter: cli.python,
        script: cli.script,
        timeout: Duration::from_secs(cli.timeout),
        ..base
    };
    let invoker = ProcessInvoker::new(config);

    if let Some(Command::Check) = cli.command {
        return handle_check(&invoker);
    }

    let service = QueryService::new(Arc::new(invoker));

    // Single prompt mode
    if let Some(prompt) = cli.prompt {
        let result = service.submit(&prompt).await?;
        print_result(&result)?;
        return Ok(());
    }

    // REPL: one prompt per line, one JSON result per line
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        let line = tokio::select! {
            result = lines.next_line() => {
                match result {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::error!(error = %e, "input error");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        };

        let prompt = line.trim();
        if prompt.is_empty() {
            continue;
        }
        if prompt == "quit" || prompt == "exit" {
            break;
        }

        // Ctrl+C while a worker runs stops the REPL; dropping the run kills the child.
        tokio::select! {
            result = service.submit(prompt) => {
                match result {
                    Ok(result) => print_result(&result)?,
                    Err(e) => eprintln!("error: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                eprintln!("interrupted");
                break;
            }
        }
    }

    Ok(())
}

fn print_result(result: &WorkerResult) -> anyhow::Result<()> {
    let json = serde_json::to_string(result)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", json)?;
    stdout.flush()?;
    Ok(())
}

fn handle_check(invoker: &ProcessInvoker) -> anyhow::Result<()> {
    let config = invoker.config();
    let script = config.worker_dir.join(&config.script);

    println!("worker dir:  {}", config.worker_dir.display());
    println!("interpreter: {}", invoker.resolve_interpreter().display());
    println!("script:      {}", script.display());
    println!("timeout:     {}s", config.timeout.as_secs());

    if !config.worker_dir.is_dir() {
        bail!("worker directory not found: {}", config.worker_dir.display());
    }
    if !script.is_file() {
        bail!("worker script not found: {}", script.display());
    }
    println!("OK");
    Ok(())
}
