//! Controller: pulls tasks off the pending queue and dispatches them.
//!
//! Interactive tasks are awaited inline on the run loop, so at most one of
//! them talks to the front end at a time. Background tasks go to the
//! [`WorkerPool`] and the loop keeps popping. The loop only ends through
//! [`Controller::quit`]; an empty queue just makes it wait.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::Notify;
use tokio::sync::futures::Notified;

use crate::channels::FrontEnd;
use crate::config::RunnerConfig;
use crate::error::{DispatchError, Result};
use crate::handlers::{HandlerRegistry, TaskContext, TaskHandler};
use crate::worker::pool::WorkerPool;
use crate::worker::queue::PendingRequestQueue;
use crate::worker::task::{IDLE_PRIORITY, Task};

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Dispatching work.
    Running,
    /// The idle detector is waiting on in-flight work; new real work moves
    /// the run back to `Running`.
    Draining,
    /// Quit requested. Nothing new is dispatched.
    Stopped,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        };
        write!(f, "{s}")
    }
}

struct ControllerState {
    queue: PendingRequestQueue,
    run_state: RunState,
    in_flight: usize,
}

struct Inner {
    state: Mutex<ControllerState>,
    changed: Notify,
    pool: WorkerPool,
    registry: Arc<HandlerRegistry>,
    front_end: Arc<dyn FrontEnd>,
    idle_wait: Duration,
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Shared handle to the run context. Cheap to clone.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<Inner>,
}

impl Controller {
    /// Create a controller with an empty queue.
    pub fn new(
        registry: Arc<HandlerRegistry>,
        front_end: Arc<dyn FrontEnd>,
        config: &RunnerConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(ControllerState {
                    queue: PendingRequestQueue::new(),
                    run_state: RunState::Running,
                    in_flight: 0,
                }),
                changed: Notify::new(),
                pool: WorkerPool::new(config.max_workers),
                registry,
                front_end,
                idle_wait: config.idle_wait,
            }),
        }
    }

    /// Lock the run context. Keep the guard short-lived and never hold it
    /// across an await.
    pub fn lock(&self) -> ControllerGuard<'_> {
        ControllerGuard {
            state: self.inner.lock_state(),
            changed: &self.inner.changed,
        }
    }

    /// Future resolving on the next queue or liveness change.
    ///
    /// Create it *before* inspecting state through [`Controller::lock`] so a
    /// change made in between is not missed.
    pub fn changed(&self) -> Notified<'_> {
        self.inner.changed.notified()
    }

    /// Queue a task and wake waiters.
    pub fn add(&self, task: Task) {
        self.lock().add(task);
    }

    /// Stop dispatching and wake every waiter.
    pub fn quit(&self) {
        self.lock().quit();
    }

    /// No real work queued and nothing running in the pool.
    pub fn tasks_empty(&self) -> bool {
        self.lock().tasks_empty()
    }

    pub fn run_state(&self) -> RunState {
        self.lock().run_state()
    }

    pub fn is_stopped(&self) -> bool {
        self.run_state() == RunState::Stopped
    }

    /// Background tasks submitted but not yet finished.
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight()
    }

    /// Number of queued tasks, sentinels included.
    pub fn pending(&self) -> usize {
        self.inner.lock_state().queue.len()
    }

    /// Upper bound for a single idle wait.
    pub fn idle_wait(&self) -> Duration {
        self.inner.idle_wait
    }

    pub fn front_end(&self) -> &Arc<dyn FrontEnd> {
        &self.inner.front_end
    }

    /// Run until [`Controller::quit`] is called.
    ///
    /// Returns the snapshot to persist: tasks still queued, in dispatch
    /// order, followed by background tasks that never got a worker slot.
    pub async fn run(&self) -> Result<Vec<Task>> {
        tracing::info!(
            pending = self.pending(),
            workers = self.inner.pool.capacity(),
            front_end = %self.inner.front_end.name(),
            "Controller started"
        );

        loop {
            let notified = self.changed();
            let next = {
                let mut state = self.inner.lock_state();
                if state.run_state == RunState::Stopped {
                    break;
                }
                if state.queue.is_empty() {
                    None
                } else {
                    let task = state.queue.pop()?;
                    let in_flight = if task.interactive {
                        None
                    } else {
                        state.in_flight += 1;
                        Some(InFlight {
                            inner: Arc::clone(&self.inner),
                        })
                    };
                    Some((task, in_flight))
                }
            };

            match next {
                Some((task, in_flight)) => self.dispatch(task, in_flight).await,
                None => {
                    tracing::debug!("Queue empty, waiting for work");
                    let _ = tokio::time::timeout(self.inner.idle_wait, notified).await;
                }
            }
        }

        let unstarted = self.inner.pool.drain().await;
        let mut snapshot = self.inner.lock_state().queue.drain_sorted();
        snapshot.extend(unstarted);

        tracing::info!(remaining = snapshot.len(), "Controller stopped");
        Ok(snapshot)
    }

    async fn dispatch(&self, task: Task, in_flight: Option<InFlight>) {
        let handler = match self.inner.registry.get(&task.name) {
            Ok(handler) => handler,
            Err(e) => {
                tracing::warn!(task = %task.name, "{}; dropping task", e);
                return;
            }
        };

        let interactive = task.interactive;
        let ctx = TaskContext::new(task, self.clone());
        tracing::debug!(
            task = %ctx.task.name,
            priority = ctx.task.effective_priority(),
            interactive,
            run_id = %ctx.run_id,
            "Dispatching task"
        );

        if interactive {
            execute(handler, ctx).await;
        } else {
            let task = ctx.task.clone();
            self.inner.pool.submit(task, async move {
                let _in_flight = in_flight;
                execute(handler, ctx).await;
            });
        }
    }
}

/// Run a handler, containing its errors and panics.
async fn execute(handler: Arc<dyn TaskHandler>, ctx: TaskContext) {
    let name = ctx.task.name.clone();
    let run_id = ctx.run_id;
    let start = Instant::now();

    let reason = match AssertUnwindSafe(handler.run(ctx)).catch_unwind().await {
        Ok(Ok(())) => {
            tracing::debug!(
                task = %name,
                run_id = %run_id,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Task completed"
            );
            return;
        }
        Ok(Err(e)) => format!("{e:#}"),
        Err(panic) => panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .map(|s| format!("panicked: {s}"))
            .unwrap_or_else(|| "panicked".to_string()),
    };

    let failure = DispatchError::HandlerFailure { name, reason };
    tracing::error!(run_id = %run_id, "{}", failure);
}

/// Counts one background task as in flight until dropped, whether the job
/// ran to completion or was discarded unstarted by a draining pool.
struct InFlight {
    inner: Arc<Inner>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut state = self.inner.lock_state();
        state.in_flight = state.in_flight.saturating_sub(1);
        drop(state);
        self.inner.changed.notify_waiters();
    }
}

/// Locked view of the run context for handlers that must check and act
/// atomically.
pub struct ControllerGuard<'a> {
    state: MutexGuard<'a, ControllerState>,
    changed: &'a Notify,
}

impl ControllerGuard<'_> {
    /// Queue a task and wake waiters.
    pub fn add(&mut self, task: Task) {
        let priority = task.effective_priority();
        if !task.is_sentinel() && self.state.run_state == RunState::Draining {
            self.state.run_state = RunState::Running;
        }
        tracing::debug!(
            task = %task.name,
            priority,
            interactive = task.interactive,
            "Task queued"
        );
        self.state.queue.add(priority, task);
        self.changed.notify_waiters();
    }

    /// Stop dispatching and wake every waiter.
    pub fn quit(&mut self) {
        if self.state.run_state == RunState::Stopped {
            return;
        }
        tracing::info!(
            pending = self.state.queue.len(),
            in_flight = self.state.in_flight,
            "Quit requested"
        );
        self.state.run_state = RunState::Stopped;
        self.changed.notify_waiters();
    }

    /// No real work queued and nothing running in the pool.
    pub fn tasks_empty(&self) -> bool {
        !self.state.queue.has_work_below(IDLE_PRIORITY) && self.state.in_flight == 0
    }

    /// A non-sentinel task is waiting to be dispatched.
    pub fn has_pending_work(&self) -> bool {
        self.state.queue.has_work_below(IDLE_PRIORITY)
    }

    /// Priority of the next task to be dispatched.
    pub fn peek_priority(&self) -> Option<i64> {
        self.state.queue.peek().map(|(priority, _)| priority)
    }

    /// Record that the idle detector is waiting on in-flight work.
    pub fn mark_draining(&mut self) {
        if self.state.run_state == RunState::Running {
            self.state.run_state = RunState::Draining;
        }
    }

    pub fn run_state(&self) -> RunState {
        self.state.run_state
    }

    pub fn in_flight(&self) -> usize {
        self.state.in_flight
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::oneshot;

    use super::*;
    use crate::handlers::handler_fn;
    use crate::testing::SilentFrontEnd;
    use crate::worker::task::{FORCE_QUIT, WAIT_THREADPOOL};

    fn controller_with(registry: HandlerRegistry) -> Controller {
        let config = RunnerConfig {
            idle_wait: Duration::from_millis(50),
            ..RunnerConfig::default()
        };
        Controller::new(Arc::new(registry), Arc::new(SilentFrontEnd::default()), &config)
    }

    #[test]
    fn tasks_empty_ignores_sentinels() {
        let controller = controller_with(HandlerRegistry::new());
        assert!(controller.tasks_empty());

        controller.add(Task::wait_threadpool());
        controller.add(Task::force_quit());
        assert!(controller.tasks_empty());

        controller.add(Task::background("repository_load"));
        assert!(!controller.tasks_empty());
    }

    #[test]
    fn real_work_ends_draining() {
        let controller = controller_with(HandlerRegistry::new());
        controller.lock().mark_draining();
        assert_eq!(controller.run_state(), RunState::Draining);

        controller.add(Task::wait_threadpool());
        assert_eq!(controller.run_state(), RunState::Draining);

        controller.add(Task::interactive("review"));
        assert_eq!(controller.run_state(), RunState::Running);
    }

    #[test]
    fn quit_is_terminal() {
        let controller = controller_with(HandlerRegistry::new());
        controller.quit();
        controller.lock().mark_draining();
        assert!(controller.is_stopped());
    }

    #[tokio::test]
    async fn add_wakes_registered_waiter() {
        let controller = controller_with(HandlerRegistry::new());
        let notified = controller.changed();
        controller.add(Task::background("repository_load"));
        tokio::time::timeout(Duration::from_secs(1), notified)
            .await
            .expect("waiter should be woken by add");
    }

    async fn quit_handler(ctx: TaskContext) -> anyhow::Result<()> {
        ctx.controller.quit();
        Ok(())
    }

    async fn broken_handler(_ctx: TaskContext) -> anyhow::Result<()> {
        anyhow::bail!("disk on fire")
    }

    async fn panicking_handler(_ctx: TaskContext) -> anyhow::Result<()> {
        panic!("boom")
    }

    /// Stand-in idle detector: quit once nothing is queued or running.
    async fn quit_when_idle(ctx: TaskContext) -> anyhow::Result<()> {
        loop {
            let notified = ctx.controller.changed();
            if ctx.controller.tasks_empty() {
                ctx.controller.quit();
                return Ok(());
            }
            let _ = tokio::time::timeout(Duration::from_millis(50), notified).await;
        }
    }

    #[tokio::test]
    async fn interactive_runs_in_priority_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HandlerRegistry::new();
        for name in ["first", "second"] {
            let order = Arc::clone(&order);
            registry.register(
                name,
                handler_fn(move |ctx: TaskContext| {
                    let order = Arc::clone(&order);
                    async move {
                        order.lock().unwrap().push(ctx.task.name.clone());
                        Ok(())
                    }
                }),
            );
        }
        registry.register(FORCE_QUIT, handler_fn(quit_handler));

        let controller = controller_with(registry);
        controller.add(Task::force_quit());
        controller.add(Task::interactive("second").with_priority(20));
        controller.add(Task::interactive("first").with_priority(10));

        let snapshot = tokio::time::timeout(Duration::from_secs(2), controller.run())
            .await
            .unwrap()
            .unwrap();
        assert!(snapshot.is_empty());
        assert_eq!(*order.lock().unwrap(), ["first", "second"]);
    }

    #[tokio::test]
    async fn unknown_and_failing_tasks_do_not_stop_the_loop() {
        let mut registry = HandlerRegistry::new();
        registry.register("broken", handler_fn(broken_handler));
        registry.register("panics", handler_fn(panicking_handler));
        registry.register(FORCE_QUIT, handler_fn(quit_handler));
        registry.register(WAIT_THREADPOOL, handler_fn(quit_when_idle));

        let controller = controller_with(registry);
        controller.add(Task::interactive("nobody_handles_this"));
        controller.add(Task::interactive("broken"));
        controller.add(Task::background("panics"));
        controller.add(Task::wait_threadpool());
        controller.add(Task::force_quit());

        let snapshot = tokio::time::timeout(Duration::from_secs(2), controller.run())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].name, FORCE_QUIT);
        assert_eq!(controller.in_flight(), 0);
    }

    #[tokio::test]
    async fn background_counts_as_in_flight_until_done() {
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let release_rx = Arc::new(Mutex::new(Some(release_rx)));
        let finished = Arc::new(AtomicUsize::new(0));
        let observed = Arc::new(Mutex::new(None));

        let mut registry = HandlerRegistry::new();
        {
            let finished = Arc::clone(&finished);
            registry.register(
                "slow",
                handler_fn(move |_ctx: TaskContext| {
                    let rx = release_rx.lock().unwrap().take();
                    let finished = Arc::clone(&finished);
                    async move {
                        if let Some(rx) = rx {
                            let _ = rx.await;
                        }
                        finished.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                }),
            );
        }
        {
            let observed = Arc::clone(&observed);
            registry.register(
                "check",
                handler_fn(move |ctx: TaskContext| {
                    let observed = Arc::clone(&observed);
                    async move {
                        *observed.lock().unwrap() =
                            Some((ctx.controller.in_flight(), ctx.controller.tasks_empty()));
                        Ok(())
                    }
                }),
            );
        }
        registry.register(WAIT_THREADPOOL, handler_fn(quit_when_idle));

        let controller = controller_with(registry);
        controller.add(Task::background("slow").with_priority(1));
        controller.add(Task::interactive("check").with_priority(2));
        controller.add(Task::wait_threadpool());

        let run = tokio::spawn({
            let controller = controller.clone();
            async move { controller.run().await }
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!controller.is_stopped());
        assert_eq!(*observed.lock().unwrap(), Some((1, false)));
        release_tx.send(()).unwrap();

        let snapshot = tokio::time::timeout(Duration::from_secs(2), run)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(snapshot.is_empty());
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }
}
