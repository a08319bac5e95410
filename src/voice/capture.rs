//! Speech capture bridge
//!
//! A capture session listens for a single utterance and stops itself after
//! the first final result. Backends implement [`SpeechCapture`]; the
//! interpreter pairs each session with the chain context it was started with.

use async_trait::async_trait;

use crate::chain::PendingCommand;

/// Platform reason string for "nothing was said"
pub const NO_SPEECH: &str = "no-speech";

/// Why a capture session produced no transcript
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecognitionFailure {
    /// Nothing was heard before the session ended
    #[error("no-speech")]
    NoSpeech,
    /// Any other recognizer failure (aborted, network, audio-capture, ...)
    #[error("{0}")]
    Other(String),
}

impl RecognitionFailure {
    /// Map a platform reason string to a failure
    #[must_use]
    pub fn from_reason(reason: &str) -> Self {
        let reason = reason.trim();
        if reason.eq_ignore_ascii_case(NO_SPEECH) {
            Self::NoSpeech
        } else {
            Self::Other(reason.to_string())
        }
    }

    /// Reason string as reported by the platform
    #[must_use]
    pub fn reason(&self) -> &str {
        match self {
            Self::NoSpeech => NO_SPEECH,
            Self::Other(reason) => reason,
        }
    }

    /// Whether the user should be asked to try again
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::NoSpeech)
    }
}

/// One-shot speech recognition
#[async_trait]
pub trait SpeechCapture: Send + Sync {
    /// Listen for one utterance and return its transcript
    ///
    /// Resolves exactly once, with either a transcript or a failure.
    async fn listen(&self) -> Result<String, RecognitionFailure>;
}

/// Result of a capture session together with the context it was started with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOutcome {
    /// Transcript or failure
    pub result: Result<String, RecognitionFailure>,
    /// Pending chain the session belongs to, if any
    pub context: Option<PendingCommand>,
}
