//! Error types for taskloom.

use std::time::Duration;

/// Top-level error type for the runner.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Interaction error: {0}")]
    Interaction(#[from] InteractionError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Durable store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to open store: {0}")]
    Open(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Pending request queue errors.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Pop attempted on an empty queue")]
    EmptyQueue,
}

/// Errors raised while resolving or running a task handler.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("No handler registered for task {name}")]
    NoSuchHandler { name: String },

    #[error("Task {name} failed: {reason}")]
    HandlerFailure { name: String, reason: String },
}

/// Errors surfaced by the interaction rendezvous.
#[derive(Debug, thiserror::Error)]
pub enum InteractionError {
    #[error("Rejected response {input:?}: {reason}")]
    InvalidResponse { input: String, reason: String },

    #[error("A question is already outstanding on this front end")]
    Busy,

    #[error("Question abandoned before an answer arrived")]
    Abandoned,

    #[error("No answer within {timeout:?}")]
    TimedOut { timeout: Duration },

    #[error("Failed to deliver message: {0}")]
    Delivery(String),
}

/// Result type alias for the runner.
pub type Result<T> = std::result::Result<T, Error>;
