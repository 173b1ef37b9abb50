//! Task handlers: what a dispatched task actually does.

pub mod builtin;
pub mod registry;

pub use registry::{FnHandler, HandlerRegistry, TaskContext, TaskHandler, handler_fn};
