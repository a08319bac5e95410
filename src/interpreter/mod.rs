//! Interpreter - turns transcripts into spoken feedback and scenario runs
//!
//! One [`Interpreter`] owns the whole dialogue state: the command table, the
//! chained flows, the single pending command and the speech bridges. It is
//! driven one turn at a time; every step awaits exactly one external event
//! (a capture result, the end of an utterance, a scenario completion).
//!
//! ```text
//!   run_turn ──► capture(context) ──► transcript ─┬─► pending? ──► ChainFlow::advance
//!       ▲                                         │        ├─ Prompt ──► speak ──┐
//!       │                                         │        ├─ Confirmed ─► speak, act
//!       │                                         │        └─ Canceled ──► speak
//!       │                                         └─► CommandTable::find
//!       │                                                  ├─ Scenario / Sequence ─► cycles
//!       │                                                  ├─ Chain ─► ChainFlow (step 1)
//!       │                                                  └─ Echo ─► speak transcript
//!       └──────────────────── listen again with next pending ◄──────────────┘
//! ```

mod cycle;
mod outcome;

pub use outcome::{CycleOutcome, InterpreterState, Step, TurnOutcome};

use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;

use crate::chain::{ChainRegistry, ChainStep, PendingCommand};
use crate::commands::{Action, CommandTable, normalize};
use crate::voice::{CaptureOutcome, RecognitionFailure, SpeechCapture, SpeechFeedback, StatusDisplay};
use crate::{Error, Result};

/// Phrases and timing of the dialogue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueSettings {
    /// Shown while a capture session is open
    pub listening_message: String,
    /// Shown and spoken when nothing was heard
    pub retry_message: String,
    /// Pause before each scenario of a sequence
    pub sequence_delay: Duration,
}

impl Default for DialogueSettings {
    fn default() -> Self {
        Self {
            listening_message: "Listening...".to_string(),
            retry_message: "Sorry. Try again.".to_string(),
            sequence_delay: Duration::from_secs(2),
        }
    }
}

/// The command interpretation state machine
pub struct Interpreter {
    table: CommandTable,
    chains: ChainRegistry,
    capture: Arc<dyn SpeechCapture>,
    feedback: SpeechFeedback,
    status: Arc<dyn StatusDisplay>,
    settings: DialogueSettings,
    pending: Option<PendingCommand>,
}

impl Interpreter {
    /// Create an interpreter
    ///
    /// # Errors
    ///
    /// Returns error if the table starts a chain kind with no registered flow
    pub fn new(
        table: CommandTable,
        chains: ChainRegistry,
        capture: Arc<dyn SpeechCapture>,
        feedback: SpeechFeedback,
        status: Arc<dyn StatusDisplay>,
    ) -> Result<Self> {
        if let Some(kind) = table.chain_kinds().find(|kind| !chains.contains(kind)) {
            return Err(Error::Config(format!("no chain flow registered for kind: {kind}")));
        }

        Ok(Self {
            table,
            chains,
            capture,
            feedback,
            status,
            settings: DialogueSettings::default(),
            pending: None,
        })
    }

    /// Replace the dialogue settings
    #[must_use]
    pub fn with_settings(mut self, settings: DialogueSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Current dialogue state
    #[must_use]
    pub fn state(&self) -> InterpreterState {
        self.pending
            .as_ref()
            .map_or(InterpreterState::Idle, |p| InterpreterState::Awaiting {
                kind: p.kind.clone(),
                step: p.step,
            })
    }

    /// Chained command in flight, if any
    #[must_use]
    pub const fn pending(&self) -> Option<&PendingCommand> {
        self.pending.as_ref()
    }

    /// Command table
    #[must_use]
    pub const fn table(&self) -> &CommandTable {
        &self.table
    }

    /// Speech feedback bridge
    #[must_use]
    pub const fn feedback(&self) -> &SpeechFeedback {
        &self.feedback
    }

    /// Dialogue settings
    #[must_use]
    pub const fn settings(&self) -> &DialogueSettings {
        &self.settings
    }

    /// Run one user-initiated turn
    ///
    /// Listens, interprets and responds. A chained command keeps listening
    /// within the same turn until it is confirmed or canceled. If a chained
    /// command is pending from an earlier turn, the new transcript continues it.
    pub async fn run_turn(&mut self) -> TurnOutcome {
        let span = tracing::info_span!("turn", id = %uuid::Uuid::new_v4());

        async {
            loop {
                let context = self.pending.take();
                let outcome = self.capture(context).await;
                match self.process(outcome).await {
                    Step::Listen => {}
                    Step::Done(outcome) => {
                        tracing::debug!(?outcome, "turn finished");
                        return outcome;
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Open one capture session with `context` attached
    pub async fn capture(&self, context: Option<PendingCommand>) -> CaptureOutcome {
        self.status.set(&self.settings.listening_message);
        let result = self.capture.listen().await;
        CaptureOutcome { result, context }
    }

    /// Handle the result of a capture session
    ///
    /// A chained command left pending by an earlier turn is continued when
    /// the outcome carries no context of its own.
    pub async fn process(&mut self, outcome: CaptureOutcome) -> Step {
        let context = outcome.context.or_else(|| self.pending.take());
        let result = match outcome.result {
            Ok(transcript) if transcript.trim().is_empty() => Err(RecognitionFailure::NoSpeech),
            result => result,
        };

        match result {
            Ok(transcript) => {
                self.status.clear();
                self.interpret(&transcript, context).await
            }
            Err(failure) if failure.is_recoverable() => {
                // The pending chain survives; the next turn picks it up again
                self.pending = context;
                self.status.set(&self.settings.retry_message);
                self.feedback.speak(&self.settings.retry_message).await;
                self.status.clear();
                Step::Done(TurnOutcome::RetryRequested)
            }
            Err(failure) => {
                self.status.clear();
                tracing::error!(reason = failure.reason(), "speech recognition failed");
                match context {
                    Some(pending) => {
                        tracing::warn!(kind = %pending.kind, "chained command dropped");
                        Step::Done(TurnOutcome::Canceled { kind: pending.kind })
                    }
                    None => Step::Done(TurnOutcome::RecognitionFailed {
                        reason: failure.reason().to_string(),
                    }),
                }
            }
        }
    }

    /// Interpret a transcript, continuing `context` when a chain is pending
    ///
    /// Without `context`, a chained command left pending by an earlier turn
    /// takes the transcript; the command table is consulted only when none is.
    pub async fn interpret(&mut self, transcript: &str, context: Option<PendingCommand>) -> Step {
        let normalized = normalize(transcript);

        if let Some(pending) = context.or_else(|| self.pending.take()) {
            return self.advance_chain(pending, transcript, &normalized).await;
        }

        let binding = self.table.find(&normalized).clone();
        tracing::info!(binding = binding.name(), transcript, "command matched");

        match binding.action() {
            Action::Scenario(scenario) => {
                let cycle = self.run_cycle(scenario).await;
                Step::Done(TurnOutcome::Scenario {
                    binding: binding.name().to_string(),
                    cycle,
                })
            }
            Action::Sequence(scenarios) => {
                let cycles = self.run_sequence(scenarios).await;
                Step::Done(TurnOutcome::Sequence {
                    binding: binding.name().to_string(),
                    cycles,
                })
            }
            Action::Chain(kind) => {
                self.advance_chain(PendingCommand::start(kind.as_str()), transcript, &normalized)
                    .await
            }
            Action::Echo => {
                self.status.set(transcript);
                self.feedback.speak(transcript).await;
                Step::Done(TurnOutcome::Echoed {
                    transcript: transcript.to_string(),
                })
            }
        }
    }

    /// Route a transcript to the flow of the pending command
    async fn advance_chain(
        &mut self,
        pending: PendingCommand,
        transcript: &str,
        normalized: &str,
    ) -> Step {
        let Some(flow) = self.chains.get(&pending.kind) else {
            tracing::warn!(kind = %pending.kind, "no flow for pending command, dropping it");
            return Step::Done(TurnOutcome::Canceled { kind: pending.kind });
        };

        match flow.advance(&pending, transcript, normalized) {
            ChainStep::Prompt { message, next } => {
                tracing::debug!(kind = %next.kind, step = next.step, "awaiting chained answer");
                self.status.set(&message);
                self.feedback.speak(&message).await;
                self.pending = Some(next);
                Step::Listen
            }
            ChainStep::Confirmed { message } => {
                tracing::info!(kind = %pending.kind, "chained command confirmed");
                self.status.clear();
                self.feedback.speak(&message).await;
                if let Err(e) = flow.on_confirmed(&pending).await {
                    tracing::warn!(kind = %pending.kind, error = %e, "deferred action failed");
                }
                Step::Done(TurnOutcome::Confirmed { kind: pending.kind })
            }
            ChainStep::Canceled { message } => {
                tracing::info!(kind = %pending.kind, "chained command canceled");
                self.status.clear();
                self.feedback.speak(&message).await;
                Step::Done(TurnOutcome::Canceled { kind: pending.kind })
            }
        }
    }
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("table", &self.table)
            .field("chains", &self.chains)
            .field("settings", &self.settings)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}
