//! Test doubles shared by unit tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::channels::{Answer, Awaiter, FrontEnd};
use crate::error::InteractionError;
use crate::worker::Controller;

/// Front end with nobody on the other side. Records `send` lines, answers
/// `check_quit` with a fixed value and abandons every question.
#[derive(Default)]
pub struct SilentFrontEnd {
    quit_answer: Option<bool>,
    sent: Mutex<Vec<String>>,
}

impl SilentFrontEnd {
    pub fn answering_quit(answer: bool) -> Self {
        Self {
            quit_answer: Some(answer),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl FrontEnd for SilentFrontEnd {
    fn name(&self) -> &str {
        "silent"
    }

    async fn ask(&self, _awaiter: Awaiter) -> Result<Answer, InteractionError> {
        Err(InteractionError::Abandoned)
    }

    async fn receive(&self, _raw: &str) {}

    async fn send(&self, text: &str) -> Result<(), InteractionError> {
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn check_quit(&self, controller: &Controller) -> Result<bool, InteractionError> {
        Ok(self
            .quit_answer
            .unwrap_or_else(|| controller.tasks_empty()))
    }

    fn close(&self) {}
}
