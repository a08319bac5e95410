//! Speech bridges
//!
//! Capture, feedback and status contracts consumed by the interpreter, plus
//! console and (with the `audio` feature) microphone/speaker backends.

#[cfg(feature = "audio")]
pub mod audio;
mod capture;
pub mod console;
pub mod endpoint;
mod feedback;
mod status;

pub use capture::{CaptureOutcome, NO_SPEECH, RecognitionFailure, SpeechCapture};
pub use console::{ConsoleCapture, ConsoleStatus, ConsoleSynthesizer};
pub use endpoint::{DetectorState, SAMPLE_RATE, UtteranceDetector};
pub use feedback::{SpeechFeedback, SpeechSynthesizer, VoiceInfo, select_voice};
pub use status::{LogStatus, StatusDisplay};
