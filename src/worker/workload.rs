//! Workload normalization: brings a saved task list up to the shape the
//! controller expects before a run starts.

use crate::worker::task::{FORCE_QUIT, REPOSITORY_LOAD, Task, WAIT_THREADPOOL};

/// Minimum number of background repository loads kept in a workload.
pub const MIN_REPOSITORY_LOADS: usize = 3;

/// Normalize with the default repository-load minimum.
pub fn normalize(tasks: Vec<Task>) -> Vec<Task> {
    normalize_with(tasks, MIN_REPOSITORY_LOADS)
}

/// Ensure at least `min_loads` repository loads and exactly one of each
/// sentinel exist. Existing tasks keep their order; additions go last.
pub fn normalize_with(tasks: Vec<Task>, min_loads: usize) -> Vec<Task> {
    let loads = count_names(&tasks, &[REPOSITORY_LOAD]);
    let has_idle = count_names(&tasks, &[WAIT_THREADPOOL]) > 0;
    let has_quit = count_names(&tasks, &[FORCE_QUIT]) > 0;

    let mut result = tasks;
    for _ in loads..min_loads {
        result.push(Task::background(REPOSITORY_LOAD));
    }
    if !has_idle {
        result.push(Task::wait_threadpool());
    }
    if !has_quit {
        result.push(Task::force_quit());
    }
    result
}

/// Number of tasks whose name is in `names`.
pub fn count_names(tasks: &[Task], names: &[&str]) -> usize {
    tasks
        .iter()
        .filter(|task| names.contains(&task.name.as_str()))
        .count()
}
