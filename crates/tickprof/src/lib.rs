pub mod cli;
pub mod commands;
pub mod error;
pub mod storage;
pub mod workload;

pub use error::{Error, Result};
