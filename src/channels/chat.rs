//! Chat front end: questions go out as messages, answers come back from
//! an inbound message stream on a separate task.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{Stream, StreamExt, stream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::channels::awaiter::{Answer, Awaiter};
use crate::channels::front_end::FrontEnd;
use crate::channels::interaction::{Interaction, Received};
use crate::error::InteractionError;
use crate::worker::Controller;

/// Stream of raw inbound replies.
pub type InboundStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// Inbound channel: push replies into the sender, hand the stream to
/// [`spawn_inbound`].
pub fn inbound_channel() -> (mpsc::UnboundedSender<String>, InboundStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    let stream = stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|msg| (msg, rx))
    });
    (tx, Box::pin(stream))
}

/// Asynchronous front end over a message channel.
///
/// `ask` posts the question, sends the prompt and blocks until the inbound
/// deliverer resolves it. Every outbound message (prompts, rejections,
/// notices) goes to the outbox in order.
pub struct ChatFrontEnd {
    name: String,
    interaction: Interaction,
    outbox: mpsc::UnboundedSender<String>,
}

impl ChatFrontEnd {
    /// Create a front end and the receiver its outbound messages arrive on.
    pub fn new(
        name: impl Into<String>,
        interaction: Interaction,
    ) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (outbox, rx) = mpsc::unbounded_channel();
        let front_end = Self {
            name: name.into(),
            interaction,
            outbox,
        };
        (front_end, rx)
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    fn deliver(&self, text: String) -> Result<(), InteractionError> {
        self.outbox
            .send(text)
            .map_err(|_| InteractionError::Delivery(format!("{} outbox closed", self.name)))
    }
}

#[async_trait]
impl FrontEnd for ChatFrontEnd {
    fn name(&self) -> &str {
        &self.name
    }

    async fn ask(&self, awaiter: Awaiter) -> Result<Answer, InteractionError> {
        let prompt = awaiter.prompt();
        let question = self.interaction.post(awaiter)?;
        self.deliver(prompt)?;
        question.wait().await
    }

    async fn receive(&self, raw: &str) {
        let reply = match self.interaction.receive(raw) {
            Received::Resolved(_) => return,
            Received::Discarded => format!("Message discarded {raw:?}: not ready yet."),
            Received::Rejected(e) => e.to_string(),
        };
        if let Err(e) = self.deliver(reply) {
            tracing::warn!(front_end = %self.name, "{}", e);
        }
    }

    async fn send(&self, text: &str) -> Result<(), InteractionError> {
        self.deliver(text.to_string())
    }

    /// Nobody sits at a chat waiting to confirm; quit once the run is idle.
    async fn check_quit(&self, controller: &Controller) -> Result<bool, InteractionError> {
        Ok(controller.tasks_empty())
    }

    fn close(&self) {
        self.interaction.close();
    }
}

/// Spawn the inbound deliverer: every reply on `inbound` goes to
/// [`FrontEnd::receive`]. When the stream ends the front end is closed so a
/// pending `ask` is abandoned instead of waiting forever.
pub fn spawn_inbound(front_end: Arc<dyn FrontEnd>, mut inbound: InboundStream) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(raw) = inbound.next().await {
            front_end.receive(&raw).await;
        }
        tracing::info!(front_end = %front_end.name(), "Inbound stream ended");
        front_end.close();
    })
}
