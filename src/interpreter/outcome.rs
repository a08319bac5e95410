//! Observable results of interpreter turns

/// Where the interpreter stands between turns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterpreterState {
    /// No chained command in flight; the next transcript goes to the command table
    Idle,
    /// A chained command waits for its next answer
    Awaiting { kind: String, step: u32 },
}

/// Result of one scenario execution cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The scenario reported a result and it was spoken
    Completed { scenario: String, result: String },
    /// The scenario failed; nothing was spoken after the feedback message
    Failed { scenario: String, error: String },
}

impl CycleOutcome {
    /// Name of the scenario the cycle ran
    #[must_use]
    pub fn scenario(&self) -> &str {
        match self {
            Self::Completed { scenario, .. } | Self::Failed { scenario, .. } => scenario,
        }
    }

    /// Whether the scenario succeeded
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// How a turn ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// A single-scenario command ran
    Scenario { binding: String, cycle: CycleOutcome },
    /// A composite command ran its scenarios in order
    Sequence {
        binding: String,
        cycles: Vec<CycleOutcome>,
    },
    /// A chained command was confirmed and its deferred action invoked
    Confirmed { kind: String },
    /// A chained command was canceled
    Canceled { kind: String },
    /// Nothing matched; the transcript was spoken back
    Echoed { transcript: String },
    /// Nothing was heard; the user was asked to try again
    RetryRequested,
    /// Recognition failed for another reason
    RecognitionFailed { reason: String },
}

/// What the interpreter needs after handling one capture result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Listen again within the same turn, with a chained command pending
    Listen,
    /// The turn is over
    Done(TurnOutcome),
}
