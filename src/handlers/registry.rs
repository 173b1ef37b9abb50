//! Handler registry: maps task names to the code that runs them.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::channels::FrontEnd;
use crate::error::DispatchError;
use crate::worker::Controller;
use crate::worker::task::Task;

/// Everything a handler gets for one dispatch.
#[derive(Clone)]
pub struct TaskContext {
    /// The task being run.
    pub task: Task,
    /// Handle back into the run loop (enqueue, quit, idle checks).
    pub controller: Controller,
    /// Correlates log lines for this dispatch.
    pub run_id: Uuid,
}

impl TaskContext {
    pub fn new(task: Task, controller: Controller) -> Self {
        Self {
            task,
            controller,
            run_id: Uuid::new_v4(),
        }
    }

    /// The front end questions for this run go to.
    pub fn front_end(&self) -> &Arc<dyn FrontEnd> {
        self.controller.front_end()
    }
}

/// Body of a task.
///
/// Errors are logged by the controller as handler failures; the task is not
/// retried.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn run(&self, ctx: TaskContext) -> anyhow::Result<()>;
}

/// Adapter turning an async closure into a [`TaskHandler`].
pub struct FnHandler<F>(F);

/// Wrap an async function or closure as a handler.
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(TaskContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    FnHandler(f)
}

#[async_trait]
impl<F, Fut> TaskHandler for FnHandler<F>
where
    F: Fn(TaskContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn run(&self, ctx: TaskContext) -> anyhow::Result<()> {
        (self.0)(ctx).await
    }
}

/// Registry of task handlers, keyed by task name.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in handlers installed.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        super::builtin::register_builtins(&mut registry);
        registry
    }

    /// Register a handler, replacing any existing one with the same name.
    pub fn register(&mut self, name: impl Into<String>, handler: impl TaskHandler + 'static) {
        let name = name.into();
        if self
            .handlers
            .insert(name.clone(), Arc::new(handler))
            .is_some()
        {
            tracing::warn!(task = %name, "Replaced existing task handler");
        } else {
            tracing::debug!("Registered task handler: {}", name);
        }
    }

    /// Look up the handler for a task name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn TaskHandler>, DispatchError> {
        self.handlers
            .get(name)
            .cloned()
            .ok_or_else(|| DispatchError::NoSuchHandler {
                name: name.to_string(),
            })
    }

    /// Check if a handler exists.
    pub fn has(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn count(&self) -> usize {
        self.handlers.len()
    }
}
