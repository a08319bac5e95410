//! Voice Commands - a spoken command interpreter
//!
//! This library turns speech transcripts into actions:
//! - Command matching (normalized transcripts against ordered token sets)
//! - Scenario cycles (spoken feedback, execution, spoken result)
//! - Chained confirmation dialogues
//! - Speech capture and feedback bridges
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  Speech engines                      │
//! │   Console  │  Microphone + Whisper  │  OpenAI TTS    │
//! └────────────────────┬────────────────────────────────┘
//!                      │ transcripts / utterances
//! ┌────────────────────▼────────────────────────────────┐
//! │                   Interpreter                        │
//! │   Command table  │  Chains  │  Scenario cycles       │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                    Scenarios                         │
//! │   Fixed results  │  External programs                │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod chain;
pub mod commands;
pub mod config;
pub mod error;
pub mod interpreter;
pub mod scenario;
pub mod voice;

pub use chain::{ChainFlow, ChainRegistry, ChainStep, ConfirmFlow, PendingCommand};
pub use commands::{Action, Binding, CommandTable};
pub use config::{Backend, Config};
pub use error::{Error, Result};
pub use interpreter::{CycleOutcome, DialogueSettings, Interpreter, InterpreterState, TurnOutcome};
pub use scenario::{Scenario, ScenarioCatalog, StaticScenario};
pub use voice::{SpeechCapture, SpeechFeedback, SpeechSynthesizer, StatusDisplay};
