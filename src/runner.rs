//! One full run: load the saved workload, normalize it, run it to
//! completion and save what is left.

use std::sync::Arc;

use crate::channels::FrontEnd;
use crate::config::RunnerConfig;
use crate::error::{Result, StoreError};
use crate::handlers::HandlerRegistry;
use crate::store::{self, KeyValueStore};
use crate::worker::Controller;
use crate::worker::task::Task;
use crate::worker::workload::normalize_with;

/// Load the workload saved under the configured key.
///
/// A missing key is an empty workload. So is a value that no longer decodes
/// as a task list; the next save overwrites it.
pub async fn load_workload(store: &dyn KeyValueStore, key: &str) -> Result<Vec<Task>> {
    match store::get_json(store, key, Vec::new()).await {
        Ok(tasks) => Ok(tasks),
        Err(StoreError::Serialization(e)) => {
            tracing::warn!(key, "Saved workload is unreadable, starting empty: {}", e);
            Ok(Vec::new())
        }
        Err(e) => Err(e.into()),
    }
}

/// Run the saved workload and persist the snapshot left when it quits.
pub async fn run_workload(
    store: &dyn KeyValueStore,
    registry: Arc<HandlerRegistry>,
    front_end: Arc<dyn FrontEnd>,
    config: &RunnerConfig,
) -> Result<Vec<Task>> {
    let saved = load_workload(store, &config.workload_key).await?;
    let loaded = saved.len();
    let tasks = normalize_with(saved, config.min_repository_loads);
    tracing::info!(
        key = %config.workload_key,
        loaded,
        normalized = tasks.len(),
        "Workload loaded"
    );

    let controller = Controller::new(registry, front_end, config);
    for task in tasks {
        controller.add(task);
    }

    let snapshot = controller.run().await?;
    store::set_json(store, &config.workload_key, &snapshot).await?;
    tracing::info!(
        key = %config.workload_key,
        saved = snapshot.len(),
        "Workload saved"
    );
    Ok(snapshot)
}
