//! Built-in handlers for the task names a normalized workload contains.

pub mod lifecycle;
pub mod repository;

pub use lifecycle::{ForceQuit, PromptQuit, WaitThreadpool};
pub use repository::RepositoryLoad;

use crate::handlers::HandlerRegistry;
use crate::worker::task::{FORCE_QUIT, PROMPT_QUIT, REPOSITORY_LOAD, WAIT_THREADPOOL};

/// Install every built-in handler under its task name.
pub fn register_builtins(registry: &mut HandlerRegistry) {
    registry.register(REPOSITORY_LOAD, RepositoryLoad);
    registry.register(PROMPT_QUIT, PromptQuit);
    registry.register(WAIT_THREADPOOL, WaitThreadpool);
    registry.register(FORCE_QUIT, ForceQuit);
}
