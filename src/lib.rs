pub mod config;
pub mod consts;
pub mod request;
pub mod result;
pub mod service;
pub mod worker;
