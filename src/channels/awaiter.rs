//! Awaiters: typed questions posted to a front end, and the rules for
//! turning a raw reply into an answer.

use std::collections::BTreeSet;

use crate::error::InteractionError;

/// One outstanding question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Awaiter {
    /// Yes/no question.
    Confirmation { message: String, default: bool },
    /// Any text.
    FreeText { message: String },
    /// Pick one of a fixed set of labels. Options are deduplicated and
    /// sorted at construction, so index `i` always means `options[i]`.
    Choice { message: String, options: Vec<String> },
}

/// A resolved answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Confirmed(bool),
    Text(String),
    Selected { index: usize, label: String },
}

impl Awaiter {
    pub fn confirmation(message: impl Into<String>, default: bool) -> Self {
        Self::Confirmation {
            message: message.into(),
            default,
        }
    }

    pub fn free_text(message: impl Into<String>) -> Self {
        Self::FreeText {
            message: message.into(),
        }
    }

    pub fn choice<I, S>(message: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options: BTreeSet<String> = options.into_iter().map(Into::into).collect();
        Self::Choice {
            message: message.into(),
            options: options.into_iter().collect(),
        }
    }

    /// The question text without any option listing.
    pub fn message(&self) -> &str {
        match self {
            Self::Confirmation { message, .. }
            | Self::FreeText { message }
            | Self::Choice { message, .. } => message,
        }
    }

    /// The text shown to the user.
    pub fn prompt(&self) -> String {
        match self {
            Self::Confirmation { message, default } => {
                let hint = if *default { "[Y/n]" } else { "[y/N]" };
                format!("{message} {hint}")
            }
            Self::FreeText { message } => message.clone(),
            Self::Choice { message, options } => {
                let listing = options
                    .iter()
                    .enumerate()
                    .map(|(index, label)| format!("{index}. {label}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("{message}\n\n{listing}")
            }
        }
    }

    /// Validate a raw reply.
    ///
    /// An `InvalidResponse` error leaves the question open; the caller
    /// reports it and keeps waiting.
    pub fn validate_and_resolve(&self, raw: &str) -> Result<Answer, InteractionError> {
        match self {
            Self::Confirmation { .. } => {
                let reply = raw.trim();
                if reply.eq_ignore_ascii_case("y") {
                    Ok(Answer::Confirmed(true))
                } else if reply.eq_ignore_ascii_case("n") {
                    Ok(Answer::Confirmed(false))
                } else {
                    Err(InteractionError::InvalidResponse {
                        input: raw.to_string(),
                        reason: "expected Y or N".to_string(),
                    })
                }
            }
            Self::FreeText { .. } => Ok(Answer::Text(raw.to_string())),
            Self::Choice { options, .. } => raw
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|index| {
                    options.get(index).map(|label| Answer::Selected {
                        index,
                        label: label.clone(),
                    })
                })
                .ok_or_else(|| InteractionError::InvalidResponse {
                    input: raw.to_string(),
                    reason: match options.len() {
                        0 => "there are no choices".to_string(),
                        n => format!("expected a number from 0 to {}", n - 1),
                    },
                }),
        }
    }
}

impl Answer {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Confirmed(value) => Some(*value),
            _ => None,
        }
    }

    /// The answer as text: the reply for free text, the label for a choice.
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text),
            Self::Selected { label, .. } => Some(label),
            Self::Confirmed(_) => None,
        }
    }
}
