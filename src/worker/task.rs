//! Task records: the unit of work the controller schedules.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the background repository loading task.
pub const REPOSITORY_LOAD: &str = "repository_load";
/// Name of the idle-detector sentinel.
pub const WAIT_THREADPOOL: &str = "wait_threadpool";
/// Name of the unconditional terminator sentinel.
pub const FORCE_QUIT: &str = "force_quit";
/// Name of the interactive "do you want to quit?" task.
pub const PROMPT_QUIT: &str = "prompt_quit";

/// Priority of the idle detector. Everything below it is real work.
pub const IDLE_PRIORITY: i64 = 999;
/// Priority of the terminator; always last.
pub const QUIT_PRIORITY: i64 = 1000;
/// Priority used for any other task that does not carry one.
pub const DEFAULT_PRIORITY: i64 = 100;

/// Priority a task gets when its record has none.
pub fn default_priority(name: &str) -> i64 {
    match name {
        WAIT_THREADPOOL => IDLE_PRIORITY,
        FORCE_QUIT => QUIT_PRIORITY,
        _ => DEFAULT_PRIORITY,
    }
}

/// A flat task record as stored in the workload snapshot.
///
/// Unknown keys are kept in `fields` so handler-specific data survives a
/// load/save cycle untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Selects the handler.
    pub name: String,
    /// Interactive tasks run serialized on the controller.
    #[serde(default)]
    pub interactive: bool,
    /// Lower runs first. `None` falls back to [`default_priority`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    /// Handler-specific fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Task {
    /// Create a task with no explicit priority.
    pub fn new(name: impl Into<String>, interactive: bool) -> Self {
        Self {
            name: name.into(),
            interactive,
            priority: None,
            fields: Map::new(),
        }
    }

    /// Create a background task.
    pub fn background(name: impl Into<String>) -> Self {
        Self::new(name, false)
    }

    /// Create an interactive task.
    pub fn interactive(name: impl Into<String>) -> Self {
        Self::new(name, true)
    }

    /// The idle-detector sentinel.
    pub fn wait_threadpool() -> Self {
        Self::interactive(WAIT_THREADPOOL).with_priority(IDLE_PRIORITY)
    }

    /// The terminator sentinel.
    pub fn force_quit() -> Self {
        Self::interactive(FORCE_QUIT).with_priority(QUIT_PRIORITY)
    }

    /// Set an explicit priority.
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Attach a handler-specific field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Priority used for ordering.
    pub fn effective_priority(&self) -> i64 {
        self.priority.unwrap_or_else(|| default_priority(&self.name))
    }

    /// Sentinels bound the run loop and never count as real work.
    pub fn is_sentinel(&self) -> bool {
        self.effective_priority() >= IDLE_PRIORITY
    }
}
