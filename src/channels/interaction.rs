//! Interaction rendezvous: one asker blocked on one answer slot.
//!
//! The asker posts an [`Awaiter`] and waits. A different task feeds raw
//! replies through [`Interaction::receive`]; a valid reply fills the slot
//! and wakes the asker. The slot has its own lock, separate from the
//! controller's, so answering a question never contends with queue traffic.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::sync::Notify;

use crate::channels::awaiter::{Answer, Awaiter};
use crate::config::RunnerConfig;
use crate::error::InteractionError;

/// Whether a question is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionState {
    Idle,
    Awaiting,
}

/// What [`Interaction::receive`] did with a raw reply.
#[derive(Debug)]
pub enum Received {
    /// Nothing was being asked; the reply was dropped.
    Discarded,
    /// The reply failed validation; the question stays open.
    Rejected(InteractionError),
    /// The reply answered the question.
    Resolved(Answer),
}

#[derive(Default)]
struct Slot {
    current: Option<Awaiter>,
    response: Option<Answer>,
    closed: bool,
}

/// Per-front-end question slot.
pub struct Interaction {
    slot: Mutex<Slot>,
    answered: Notify,
    liveness_poll: Duration,
    answer_timeout: Option<Duration>,
}

impl Interaction {
    /// Create a slot. `liveness_poll` bounds each wait; `answer_timeout`
    /// abandons a question nobody answers.
    pub fn new(liveness_poll: Duration, answer_timeout: Option<Duration>) -> Self {
        Self {
            slot: Mutex::new(Slot::default()),
            answered: Notify::new(),
            liveness_poll,
            answer_timeout,
        }
    }

    pub fn from_config(config: &RunnerConfig) -> Self {
        Self::new(config.liveness_poll, config.answer_timeout)
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// `Awaiting` while a question is open. A resolved question counts as
    /// `Idle` even before the asker has picked up the answer.
    pub fn state(&self) -> InteractionState {
        if self.lock().current.is_some() {
            InteractionState::Awaiting
        } else {
            InteractionState::Idle
        }
    }

    /// The question currently waiting for an answer.
    pub fn current(&self) -> Option<Awaiter> {
        self.lock().current.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Make `awaiter` the outstanding question.
    ///
    /// The question stays open while the returned [`PendingQuestion`] lives;
    /// dropping it unanswered withdraws the question, so a cancelled asker
    /// never leaves the slot `Busy`.
    pub fn post(&self, awaiter: Awaiter) -> Result<PendingQuestion<'_>, InteractionError> {
        let mut slot = self.lock();
        if slot.closed {
            return Err(InteractionError::Abandoned);
        }
        if slot.current.is_some() || slot.response.is_some() {
            return Err(InteractionError::Busy);
        }
        tracing::debug!(question = %awaiter.message(), "Question posted");
        slot.current = Some(awaiter);
        Ok(PendingQuestion {
            interaction: self,
            armed: true,
        })
    }

    /// Drop the outstanding question without an answer.
    pub fn withdraw(&self) {
        let mut slot = self.lock();
        slot.current = None;
        slot.response = None;
    }

    /// Block until the posted question is answered.
    ///
    /// Wakes every liveness period only to re-check the slot. Fails with
    /// `Abandoned` if the interaction is closed and with `TimedOut` once the
    /// configured answer timeout passes.
    pub async fn wait(&self) -> Result<Answer, InteractionError> {
        let start = Instant::now();
        loop {
            let notified = self.answered.notified();
            {
                let mut slot = self.lock();
                if let Some(answer) = slot.response.take() {
                    tracing::debug!(
                        waited_ms = start.elapsed().as_millis() as u64,
                        "Question answered"
                    );
                    return Ok(answer);
                }
                if slot.closed {
                    slot.current = None;
                    return Err(InteractionError::Abandoned);
                }
                if let Some(timeout) = self.answer_timeout
                    && start.elapsed() >= timeout
                {
                    slot.current = None;
                    tracing::warn!(?timeout, "Question abandoned without an answer");
                    return Err(InteractionError::TimedOut { timeout });
                }
            }

            let mut poll = self.liveness_poll;
            if let Some(timeout) = self.answer_timeout {
                poll = poll.min(timeout.saturating_sub(start.elapsed()));
            }
            if tokio::time::timeout(poll, notified).await.is_err() {
                tracing::trace!("Still waiting for an answer");
            }
        }
    }

    /// Take the answer if one has arrived, without waiting.
    pub fn take_answer(&self) -> Option<Answer> {
        self.lock().response.take()
    }

    /// Feed a raw reply to the outstanding question.
    pub fn receive(&self, raw: &str) -> Received {
        let mut slot = self.lock();
        let Some(awaiter) = slot.current.as_ref() else {
            tracing::debug!(input = %raw, "Reply discarded, nothing is being asked");
            return Received::Discarded;
        };

        match awaiter.validate_and_resolve(raw) {
            Ok(answer) => {
                slot.current = None;
                slot.response = Some(answer.clone());
                drop(slot);
                self.answered.notify_waiters();
                Received::Resolved(answer)
            }
            Err(e) => {
                tracing::debug!(input = %raw, "Reply rejected");
                Received::Rejected(e)
            }
        }
    }

    /// Answer the outstanding question directly. Returns `false` if nothing
    /// was being asked.
    pub fn respond(&self, answer: Answer) -> bool {
        let mut slot = self.lock();
        if slot.current.take().is_none() {
            return false;
        }
        slot.response = Some(answer);
        drop(slot);
        self.answered.notify_waiters();
        true
    }

    /// Abandon the outstanding question and refuse new ones.
    pub fn close(&self) {
        self.lock().closed = true;
        self.answered.notify_waiters();
    }
}

/// An open question on an [`Interaction`]. Withdraws it on drop unless it
/// was answered or abandoned through [`PendingQuestion::wait`] or
/// [`PendingQuestion::finish`].
#[must_use = "dropping a PendingQuestion withdraws the question"]
pub struct PendingQuestion<'a> {
    interaction: &'a Interaction,
    armed: bool,
}

impl PendingQuestion<'_> {
    /// Block until the question is answered. See [`Interaction::wait`].
    pub async fn wait(mut self) -> Result<Answer, InteractionError> {
        let result = self.interaction.wait().await;
        self.armed = false;
        result
    }

    /// The caller resolved the question itself.
    pub fn finish(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingQuestion<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!("Question withdrawn before it was answered");
            self.interaction.withdraw();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn interaction() -> Arc<Interaction> {
        Arc::new(Interaction::new(Duration::from_millis(20), None))
    }

    #[test]
    fn receive_while_idle_is_discarded() {
        let interaction = interaction();
        assert!(matches!(interaction.receive("Y"), Received::Discarded));
        assert_eq!(interaction.state(), InteractionState::Idle);
    }

    #[test]
    fn only_one_question_at_a_time() {
        let interaction = interaction();
        let first = interaction.post(Awaiter::free_text("a?")).unwrap();
        assert!(matches!(
            interaction.post(Awaiter::free_text("b?")),
            Err(InteractionError::Busy)
        ));
        drop(first);
        let _second = interaction.post(Awaiter::free_text("b?")).unwrap();
        assert_eq!(interaction.state(), InteractionState::Awaiting);
    }

    #[tokio::test]
    async fn cancelled_wait_frees_the_slot() {
        let interaction = interaction();
        let question = interaction.post(Awaiter::free_text("first?")).unwrap();
        let cancelled = tokio::time::timeout(Duration::from_millis(50), question.wait()).await;
        assert!(cancelled.is_err());
        assert_eq!(interaction.state(), InteractionState::Idle);

        let second = interaction.post(Awaiter::free_text("second?")).unwrap();
        assert!(matches!(interaction.receive("ok"), Received::Resolved(_)));
        assert_eq!(second.wait().await.unwrap(), Answer::Text("ok".into()));
    }

    #[test]
    fn resolved_question_reads_idle_before_pickup() {
        let interaction = interaction();
        let question = interaction.post(Awaiter::confirmation("x?", true)).unwrap();
        assert!(matches!(interaction.receive("y"), Received::Resolved(_)));
        assert_eq!(interaction.state(), InteractionState::Idle);
        assert_eq!(interaction.take_answer(), Some(Answer::Confirmed(true)));
        question.finish();
    }

    #[tokio::test]
    async fn invalid_reply_keeps_waiting() {
        let interaction = interaction();
        let question = interaction.post(Awaiter::confirmation("x?", true)).unwrap();

        let waiter = tokio::spawn({
            let interaction = Arc::clone(&interaction);
            async move { interaction.wait().await }
        });

        assert!(matches!(interaction.receive("q"), Received::Rejected(_)));
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!waiter.is_finished());
        assert_eq!(interaction.state(), InteractionState::Awaiting);

        assert!(matches!(
            interaction.receive("N"),
            Received::Resolved(Answer::Confirmed(false))
        ));
        let answer = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(answer, Answer::Confirmed(false));
        assert_eq!(interaction.state(), InteractionState::Idle);
        question.finish();
    }

    #[tokio::test]
    async fn respond_wakes_the_asker() {
        let interaction = interaction();
        assert!(!interaction.respond(Answer::Text("early".into())));

        let question = interaction.post(Awaiter::free_text("Name?")).unwrap();
        let waiter = tokio::spawn({
            let interaction = Arc::clone(&interaction);
            async move { interaction.wait().await }
        });
        assert!(interaction.respond(Answer::Text("ada".into())));
        assert_eq!(interaction.state(), InteractionState::Idle);
        let answer = waiter.await.unwrap().unwrap();
        assert_eq!(answer, Answer::Text("ada".into()));
        question.finish();
    }

    #[tokio::test]
    async fn close_abandons_the_asker() {
        let interaction = interaction();
        let question = interaction.post(Awaiter::free_text("Name?")).unwrap();
        let waiter = tokio::spawn({
            let interaction = Arc::clone(&interaction);
            async move { interaction.wait().await }
        });
        interaction.close();
        assert!(matches!(
            waiter.await.unwrap(),
            Err(InteractionError::Abandoned)
        ));
        drop(question);
        assert!(matches!(
            interaction.post(Awaiter::free_text("again?")),
            Err(InteractionError::Abandoned)
        ));
    }

    #[tokio::test]
    async fn answer_timeout_gives_up() {
        let interaction = Interaction::new(Duration::from_secs(10), Some(Duration::from_millis(30)));
        let question = interaction.post(Awaiter::free_text("Anyone?")).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(1), question.wait())
            .await
            .expect("timeout should end the wait, not the liveness poll");
        assert!(matches!(result, Err(InteractionError::TimedOut { .. })));
        assert_eq!(interaction.state(), InteractionState::Idle);
    }
}
