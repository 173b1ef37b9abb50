//! Lifecycle handlers: idle detection and quitting.

use async_trait::async_trait;

use crate::handlers::{TaskContext, TaskHandler};
use crate::worker::RunState;
use crate::worker::task::IDLE_PRIORITY;

/// Notice sent when the idle detector ends the run.
pub const IDLE_QUIT_NOTICE: &str = "All tasks complete and no new input - quitting.";

/// Idle detector.
///
/// Defers to any real work that shows up by re-queueing itself. When
/// nothing is queued and nothing is running it quits the run. Otherwise it
/// waits for a queue change, bounded by the idle timeout, and re-checks.
/// A quit issued elsewhere ends the wait on the next wake-up.
pub struct WaitThreadpool;

#[async_trait]
impl TaskHandler for WaitThreadpool {
    async fn run(&self, ctx: TaskContext) -> anyhow::Result<()> {
        let controller = &ctx.controller;
        let requeued = ctx.task.clone().with_priority(IDLE_PRIORITY);

        loop {
            let notified = controller.changed();
            {
                let mut state = controller.lock();
                if state.run_state() == RunState::Stopped {
                    tracing::debug!("Run stopped, idle detector exiting");
                    state.add(requeued);
                    return Ok(());
                }
                if state.has_pending_work() {
                    tracing::debug!(
                        next_priority = ?state.peek_priority(),
                        "Idle detector deferring to queued work"
                    );
                    state.add(requeued);
                    return Ok(());
                }
                if state.tasks_empty() {
                    // Keep the sentinel in the queue so it lands in the snapshot.
                    state.add(requeued);
                    state.quit();
                    break;
                }
                state.mark_draining();
                tracing::debug!(in_flight = state.in_flight(), "Idle detector waiting");
            }
            let _ = tokio::time::timeout(controller.idle_wait(), notified).await;
        }

        tracing::info!("{}", IDLE_QUIT_NOTICE);
        ctx.front_end().send(IDLE_QUIT_NOTICE).await?;
        Ok(())
    }
}

/// Asks the front end whether to quit.
pub struct PromptQuit;

#[async_trait]
impl TaskHandler for PromptQuit {
    async fn run(&self, ctx: TaskContext) -> anyhow::Result<()> {
        if ctx.front_end().check_quit(&ctx.controller).await? {
            ctx.controller.quit();
        }
        Ok(())
    }
}

/// Unconditional terminator.
pub struct ForceQuit;

#[async_trait]
impl TaskHandler for ForceQuit {
    async fn run(&self, ctx: TaskContext) -> anyhow::Result<()> {
        tracing::info!(run_id = %ctx.run_id, "Force quit");
        ctx.controller.quit();
        Ok(())
    }
}
