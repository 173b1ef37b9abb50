//! Worker system: the pending queue, the controller that drains it and the
//! pool background tasks run on.
//!
//! Core components:
//! - `task`: task records and sentinel priorities
//! - `queue`: priority queue, stable for equal priorities
//! - `workload`: normalization of a saved task list
//! - `pool`: bounded pool for background tasks
//! - `controller`: run loop, quit and idle bookkeeping

pub mod controller;
pub mod pool;
pub mod queue;
pub mod task;
pub mod workload;

pub use controller::{Controller, ControllerGuard, RunState};
pub use pool::WorkerPool;
pub use queue::PendingRequestQueue;
pub use task::Task;
pub use workload::normalize;
