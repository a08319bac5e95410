//! Chained (multi-turn) commands
//!
//! A chained command spans several capture cycles. Between cycles the
//! interpreter holds a single [`PendingCommand`]; each new transcript is routed
//! to the [`ChainFlow`] registered for the pending command's kind, which decides
//! whether to prompt again, confirm or cancel.
//!
//! New kinds are added by registering another flow; existing flows are untouched.

mod confirm;

pub use confirm::{ConfirmFlow, ConfirmMessages, DeferredAction, ExecAction, NoopAction};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// An in-flight chained command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCommand {
    /// Which flow is active
    pub kind: String,
    /// Position within the flow, starting at 1
    pub step: u32,
    /// Flow-specific accumulated data
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl PendingCommand {
    /// First step of a flow
    pub fn start(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            step: 1,
            payload: serde_json::Value::Null,
        }
    }

    /// The following step, carrying a new payload
    #[must_use]
    pub fn next(&self, payload: serde_json::Value) -> Self {
        Self {
            kind: self.kind.clone(),
            step: self.step + 1,
            payload,
        }
    }
}

/// What a flow wants to happen after a transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainStep {
    /// Say `message`, then listen again with `next` pending
    Prompt {
        message: String,
        next: PendingCommand,
    },
    /// Say `message`, then run the flow's deferred action
    Confirmed { message: String },
    /// Say `message` and drop the chain
    Canceled { message: String },
}

/// A chained command flow for one kind
#[async_trait]
pub trait ChainFlow: Send + Sync {
    /// Kind this flow handles
    fn kind(&self) -> &str;

    /// Decide the next step for a transcript
    ///
    /// `transcript` is the raw recognizer text, `normalized` its lower-cased form.
    fn advance(&self, pending: &PendingCommand, transcript: &str, normalized: &str) -> ChainStep;

    /// Run the deferred action after the acknowledgment was spoken
    ///
    /// # Errors
    ///
    /// Returns error if the action fails
    async fn on_confirmed(&self, pending: &PendingCommand) -> Result<()>;
}

/// Flows indexed by kind
#[derive(Default, Clone)]
pub struct ChainRegistry {
    flows: HashMap<String, Arc<dyn ChainFlow>>,
}

impl ChainRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a flow under its kind, replacing any previous one
    pub fn register(&mut self, flow: Arc<dyn ChainFlow>) {
        let kind = flow.kind().to_string();
        if self.flows.insert(kind.clone(), flow).is_some() {
            tracing::warn!(kind = %kind, "chain flow replaced");
        }
    }

    /// Builder form of [`Self::register`]
    #[must_use]
    pub fn with(mut self, flow: Arc<dyn ChainFlow>) -> Self {
        self.register(flow);
        self
    }

    /// Flow for a kind
    #[must_use]
    pub fn get(&self, kind: &str) -> Option<Arc<dyn ChainFlow>> {
        self.flows.get(kind).cloned()
    }

    /// Check if a kind has a flow
    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.flows.contains_key(kind)
    }

    /// Sorted registered kinds
    #[must_use]
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.flows.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

impl std::fmt::Debug for ChainRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
