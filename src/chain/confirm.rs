//! Two-step confirmation flow: restate the request, then act on yes

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{ChainFlow, ChainStep, PendingCommand};
use crate::commands::contains_any;
use crate::scenario::{DEFAULT_TIMEOUT, run_program};
use crate::{Error, Result};

/// Action run once a chained command is confirmed
#[async_trait]
pub trait DeferredAction: Send + Sync {
    /// Perform the confirmed action
    ///
    /// # Errors
    ///
    /// Returns error if the action fails
    async fn run(&self, kind: &str, payload: &serde_json::Value) -> Result<()>;
}

/// Deferred action that only records the confirmation
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAction;

#[async_trait]
impl DeferredAction for NoopAction {
    async fn run(&self, kind: &str, payload: &serde_json::Value) -> Result<()> {
        tracing::info!(kind, %payload, "chain confirmed, no action configured");
        Ok(())
    }
}

/// Deferred action that runs a program with the payload as JSON on stdin
#[derive(Debug, Clone)]
pub struct ExecAction {
    argv: Vec<String>,
    timeout: Duration,
}

impl ExecAction {
    /// Create a program-backed action
    ///
    /// # Errors
    ///
    /// Returns error if `argv` is empty
    pub fn new(argv: Vec<String>, timeout: Option<Duration>) -> Result<Self> {
        if argv.is_empty() {
            return Err(Error::Config("chain exec command must not be empty".to_string()));
        }
        Ok(Self {
            argv,
            timeout: timeout.unwrap_or(DEFAULT_TIMEOUT),
        })
    }
}

#[async_trait]
impl DeferredAction for ExecAction {
    async fn run(&self, kind: &str, payload: &serde_json::Value) -> Result<()> {
        let input = serde_json::to_string(payload)?;
        let output = run_program(&self.argv, Some(&input), self.timeout)
            .await
            .map_err(|e| Error::Chain(format!("{kind}: {e}")))?;
        tracing::debug!(kind, output = %output, "deferred action finished");
        Ok(())
    }
}

/// Phrases used by a confirmation flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmMessages {
    /// Appended to the restated request
    pub suffix: String,
    /// Spoken on confirmation
    pub proceeding: String,
    /// Spoken on cancellation
    pub canceled: String,
    /// Substrings that count as a yes
    pub confirm_words: Vec<String>,
}

impl Default for ConfirmMessages {
    fn default() -> Self {
        Self {
            suffix: "Proceed?".to_string(),
            proceeding: "proceeding".to_string(),
            canceled: "canceled".to_string(),
            confirm_words: vec!["yes".to_string(), "proceed".to_string()],
        }
    }
}

/// Restate the request with a question, then confirm or cancel on the answer
pub struct ConfirmFlow {
    kind: String,
    messages: ConfirmMessages,
    action: Arc<dyn DeferredAction>,
}

impl ConfirmFlow {
    /// Create a flow with default phrases and no deferred action
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            messages: ConfirmMessages::default(),
            action: Arc::new(NoopAction),
        }
    }

    /// Override the phrases
    #[must_use]
    pub fn with_messages(mut self, messages: ConfirmMessages) -> Self {
        self.messages = messages;
        self
    }

    /// Set the action run on confirmation
    #[must_use]
    pub fn with_action(mut self, action: Arc<dyn DeferredAction>) -> Self {
        self.action = action;
        self
    }
}

#[async_trait]
impl ChainFlow for ConfirmFlow {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn advance(&self, pending: &PendingCommand, transcript: &str, normalized: &str) -> ChainStep {
        match pending.step {
            1 => ChainStep::Prompt {
                message: format!("{transcript}. {}", self.messages.suffix),
                next: pending.next(serde_json::json!({ "request": transcript })),
            },
            2 if contains_any(normalized, &self.messages.confirm_words) => ChainStep::Confirmed {
                message: self.messages.proceeding.clone(),
            },
            2 => ChainStep::Canceled {
                message: self.messages.canceled.clone(),
            },
            step => {
                tracing::warn!(kind = %self.kind, step, "unexpected confirmation step");
                ChainStep::Canceled {
                    message: self.messages.canceled.clone(),
                }
            }
        }
    }

    async fn on_confirmed(&self, pending: &PendingCommand) -> Result<()> {
        self.action.run(&self.kind, &pending.payload).await
    }
}

impl std::fmt::Debug for ConfirmFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmFlow")
            .field("kind", &self.kind)
            .field("messages", &self.messages)
            .finish_non_exhaustive()
    }
}
