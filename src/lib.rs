//! Taskloom: a priority task runner that interleaves background work with
//! interactive questions answered through a pluggable front end.

pub mod channels;
pub mod config;
pub mod error;
pub mod handlers;
pub mod runner;
pub mod store;
pub mod worker;

#[cfg(test)]
mod testing;

pub use config::RunnerConfig;
pub use error::{Error, Result};
pub use runner::run_workload;
