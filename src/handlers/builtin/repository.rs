//! Background repository loading.

use async_trait::async_trait;

use crate::handlers::{TaskContext, TaskHandler};

/// Loads the next repository. The loading itself lives outside the runner;
/// this handler records the dispatch and completes.
pub struct RepositoryLoad;

#[async_trait]
impl TaskHandler for RepositoryLoad {
    async fn run(&self, ctx: TaskContext) -> anyhow::Result<()> {
        let repository = ctx
            .task
            .fields
            .get("repository")
            .and_then(|v| v.as_str())
            .unwrap_or("next");
        tracing::info!(
            run_id = %ctx.run_id,
            repository,
            "Loading repository"
        );
        Ok(())
    }
}
