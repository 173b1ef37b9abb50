//! Console front end: prompts on stdout and reads answers from stdin.
//!
//! Asking is synchronous: `ask` writes the prompt and reads lines inline
//! until one resolves the question. Invalid lines are reported and the
//! prompt is shown again.

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::sync::Mutex;

use crate::channels::awaiter::{Answer, Awaiter};
use crate::channels::front_end::{FrontEnd, QUIT_QUESTION};
use crate::channels::interaction::{Interaction, Received};
use crate::config::RunnerConfig;
use crate::error::InteractionError;
use crate::worker::Controller;

type LineReader = Lines<Box<dyn AsyncBufRead + Send + Unpin>>;
type Output = Box<dyn AsyncWrite + Send + Unpin>;

/// Front end bound to a line-oriented reader and a writer.
pub struct ConsoleFrontEnd {
    interaction: Interaction,
    input: Mutex<LineReader>,
    output: Mutex<Output>,
}

impl ConsoleFrontEnd {
    pub fn new(
        input: impl AsyncBufRead + Send + Unpin + 'static,
        output: impl AsyncWrite + Send + Unpin + 'static,
        interaction: Interaction,
    ) -> Self {
        let input: Box<dyn AsyncBufRead + Send + Unpin> = Box::new(input);
        Self {
            interaction,
            input: Mutex::new(input.lines()),
            output: Mutex::new(Box::new(output)),
        }
    }

    /// Console on the process's stdin and stdout.
    pub fn stdio(config: &RunnerConfig) -> Self {
        Self::new(
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
            Interaction::from_config(config),
        )
    }

    async fn write_line(&self, text: &str) -> Result<(), InteractionError> {
        let mut output = self.output.lock().await;
        output
            .write_all(format!("{text}\n").as_bytes())
            .await
            .map_err(|e| InteractionError::Delivery(e.to_string()))?;
        output
            .flush()
            .await
            .map_err(|e| InteractionError::Delivery(e.to_string()))
    }

    /// Feed one line, reporting a rejection back to the console.
    async fn handle_line(&self, line: &str) -> Received {
        let received = self.interaction.receive(line);
        if let Received::Rejected(e) = &received
            && let Err(err) = self.write_line(&e.to_string()).await
        {
            tracing::warn!("Failed to report rejected reply: {}", err);
        }
        received
    }
}

#[async_trait]
impl FrontEnd for ConsoleFrontEnd {
    fn name(&self) -> &str {
        "console"
    }

    async fn ask(&self, awaiter: Awaiter) -> Result<Answer, InteractionError> {
        let question = self.interaction.post(awaiter.clone())?;
        let prompt = awaiter.prompt();
        self.write_line(&prompt).await?;

        let mut lines = self.input.lock().await;
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    tracing::info!("Console input closed");
                    self.interaction.close();
                    return Err(InteractionError::Abandoned);
                }
                Err(e) => return Err(InteractionError::Delivery(e.to_string())),
            };

            // An empty line takes the confirmation default.
            let line = match &awaiter {
                Awaiter::Confirmation { default, .. } if line.trim().is_empty() => {
                    (if *default { "y" } else { "n" }).to_string()
                }
                _ => line,
            };

            match self.handle_line(&line).await {
                Received::Resolved(_) => {
                    let answer = self.interaction.take_answer();
                    question.finish();
                    return answer.ok_or(InteractionError::Abandoned);
                }
                Received::Rejected(_) => self.write_line(&prompt).await?,
                Received::Discarded => return Err(InteractionError::Abandoned),
            }
        }
    }

    async fn receive(&self, raw: &str) {
        if let Received::Discarded = self.handle_line(raw).await {
            tracing::debug!(input = %raw, "Console reply with no question outstanding");
        }
    }

    async fn send(&self, text: &str) -> Result<(), InteractionError> {
        self.write_line(text).await
    }

    async fn check_quit(&self, _controller: &Controller) -> Result<bool, InteractionError> {
        self.get_confirmation(QUIT_QUESTION, true).await
    }

    fn close(&self) {
        self.interaction.close();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::AsyncReadExt;

    use super::*;
    use crate::channels::front_end::FrontEndExt;

    fn console(input: &'static [u8]) -> (ConsoleFrontEnd, tokio::io::DuplexStream) {
        let (output, transcript) = tokio::io::duplex(64 * 1024);
        let interaction = Interaction::new(Duration::from_millis(50), None);
        (ConsoleFrontEnd::new(input, output, interaction), transcript)
    }

    async fn transcript_of(console: ConsoleFrontEnd, mut transcript: tokio::io::DuplexStream) -> String {
        drop(console);
        let mut text = String::new();
        transcript.read_to_string(&mut text).await.unwrap();
        text
    }

    #[tokio::test]
    async fn confirmation_reprompts_then_takes_default() {
        let (console, transcript) = console(b"maybe\n\nN\n");

        assert!(!console.get_confirmation("Go?", false).await.unwrap());
        assert!(!console.get_confirmation("Again?", true).await.unwrap());

        let text = transcript_of(console, transcript).await;
        assert_eq!(text.matches("Go? [y/N]").count(), 2);
        assert!(text.contains("Rejected response \"maybe\": expected Y or N"));
        assert!(text.contains("Again? [Y/n]"));
    }

    #[tokio::test]
    async fn choice_returns_the_value_for_the_picked_label() {
        let (console, transcript) = console(b"7\n2\n");
        let options = vec![
            ("pear".to_string(), 'P'),
            ("apple".to_string(), 'A'),
            ("fig".to_string(), 'F'),
        ];
        assert_eq!(console.make_choice("Fruit?", options).await.unwrap(), 'P');

        let text = transcript_of(console, transcript).await;
        assert!(text.contains("0. apple\n1. fig\n2. pear"));
        assert!(text.contains("expected a number from 0 to 2"));
    }

    #[tokio::test]
    async fn end_of_input_abandons() {
        let (console, _transcript) = console(b"");
        assert!(matches!(
            console.get_input("Name?").await,
            Err(InteractionError::Abandoned)
        ));
        assert!(matches!(
            console.get_input("Name?").await,
            Err(InteractionError::Abandoned)
        ));
    }

    #[tokio::test]
    async fn send_writes_a_line() {
        let (console, transcript) = console(b"");
        console.send("hello").await.unwrap();
        assert_eq!(transcript_of(console, transcript).await, "hello\n");
    }
}
