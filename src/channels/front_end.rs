//! Front end abstraction: where questions go and replies come from.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::channels::awaiter::{Answer, Awaiter};
use crate::error::InteractionError;
use crate::worker::Controller;

/// Question asked by the interactive quit task.
pub const QUIT_QUESTION: &str = "Do you want to quit?";

/// A user-facing front end.
///
/// `ask` blocks the calling task until the question is answered. Replies
/// arrive through `receive`, which a front end may call itself (console) or
/// which an inbound deliverer calls from another task (chat).
#[async_trait]
pub trait FrontEnd: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Post a question and wait for a valid answer.
    async fn ask(&self, awaiter: Awaiter) -> Result<Answer, InteractionError>;

    /// Feed one raw inbound reply.
    async fn receive(&self, raw: &str);

    /// Deliver a one-way message.
    async fn send(&self, text: &str) -> Result<(), InteractionError>;

    /// Whether the interactive quit task should end the run.
    async fn check_quit(&self, controller: &Controller) -> Result<bool, InteractionError>;

    /// Abandon any outstanding question and refuse new ones.
    fn close(&self);

    async fn get_confirmation(
        &self,
        message: &str,
        default: bool,
    ) -> Result<bool, InteractionError> {
        let answer = self.ask(Awaiter::confirmation(message, default)).await?;
        Ok(answer.as_bool().unwrap_or(default))
    }

    async fn get_input(&self, message: &str) -> Result<String, InteractionError> {
        let answer = self.ask(Awaiter::free_text(message)).await?;
        Ok(answer.into_text().unwrap_or_default())
    }

}

/// Helpers generic over the answer type, kept off [`FrontEnd`] so it stays
/// usable as a trait object.
#[async_trait]
pub trait FrontEndExt: FrontEnd {
    /// Ask the user to pick one of `options` by label; returns the value
    /// paired with the chosen label. Labels are listed sorted and a repeated
    /// label keeps its last value.
    async fn make_choice<V: Send>(
        &self,
        message: &str,
        options: Vec<(String, V)>,
    ) -> Result<V, InteractionError>;
}

#[async_trait]
impl<F: FrontEnd + ?Sized> FrontEndExt for F {
    async fn make_choice<V: Send>(
        &self,
        message: &str,
        options: Vec<(String, V)>,
    ) -> Result<V, InteractionError> {
        let mut values: BTreeMap<String, V> = options.into_iter().collect();
        let answer = self
            .ask(Awaiter::choice(message, values.keys().cloned()))
            .await?;
        let label = answer.into_text().unwrap_or_default();
        values
            .remove(&label)
            .ok_or_else(|| InteractionError::InvalidResponse {
                input: label,
                reason: "not one of the offered choices".to_string(),
            })
    }
}
