pub mod complete;
pub mod config;
pub mod deploy;
pub mod manifest;
pub mod notify;
