//! Terminal stand-ins for the speech engines
//!
//! Each line typed on stdin is one utterance. A blank line is reported as
//! `no-speech` and a line starting with `!` as the failure reason that
//! follows it (e.g. `!network`). Spoken text and status updates go to stdout.

use std::io::Write;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use super::capture::{RecognitionFailure, SpeechCapture};
use super::feedback::{SpeechSynthesizer, VoiceInfo};
use super::status::StatusDisplay;
use crate::Result;

/// Reason reported once stdin is exhausted
pub const END_OF_INPUT: &str = "end-of-input";

/// Interpret one line of console input as a recognition result
///
/// # Errors
///
/// Returns the failure the line stands for
pub fn parse_utterance(line: &str) -> std::result::Result<String, RecognitionFailure> {
    let line = line.trim();
    if line.is_empty() {
        return Err(RecognitionFailure::NoSpeech);
    }
    if let Some(reason) = line.strip_prefix('!') {
        let reason = if reason.trim().is_empty() { "aborted" } else { reason };
        return Err(RecognitionFailure::from_reason(reason));
    }
    Ok(line.to_string())
}

/// Reads utterances from stdin
pub struct ConsoleCapture {
    lines: tokio::sync::Mutex<Lines<BufReader<Stdin>>>,
    closed: AtomicBool,
}

impl Default for ConsoleCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleCapture {
    /// Create a capture reading from this process's stdin
    #[must_use]
    pub fn new() -> Self {
        Self {
            lines: tokio::sync::Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
            closed: AtomicBool::new(false),
        }
    }

    /// Whether stdin has been exhausted
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SpeechCapture for ConsoleCapture {
    async fn listen(&self) -> std::result::Result<String, RecognitionFailure> {
        let mut lines = self.lines.lock().await;
        match lines.next_line().await {
            Ok(Some(line)) => parse_utterance(&line),
            Ok(None) => {
                self.closed.store(true, Ordering::Relaxed);
                Err(RecognitionFailure::Other(END_OF_INPUT.to_string()))
            }
            Err(e) => Err(RecognitionFailure::Other(format!("audio-capture: {e}"))),
        }
    }
}

/// Prints utterances instead of speaking them
#[derive(Debug, Clone)]
pub struct ConsoleSynthesizer {
    voices: Vec<VoiceInfo>,
}

impl Default for ConsoleSynthesizer {
    fn default() -> Self {
        Self {
            voices: vec![
                VoiceInfo::new("console-alto", "en-US"),
                VoiceInfo::new("console-british", "en-GB"),
                VoiceInfo::new("console-tenor", "en-US"),
                VoiceInfo::new("console-soprano", "en-US"),
            ],
        }
    }
}

impl ConsoleSynthesizer {
    /// Create a synthesizer advertising the given voices
    #[must_use]
    pub const fn with_voices(voices: Vec<VoiceInfo>) -> Self {
        Self { voices }
    }
}

#[async_trait]
impl SpeechSynthesizer for ConsoleSynthesizer {
    async fn voices(&self) -> Vec<VoiceInfo> {
        self.voices.clone()
    }

    fn cancel(&self) {}

    async fn speak(&self, text: &str, voice: Option<&VoiceInfo>) -> Result<()> {
        let name = voice.map_or("default", |v| v.name.as_str());
        let mut out = std::io::stdout().lock();
        writeln!(out, "say [{name}]: {text}")?;
        out.flush()?;
        Ok(())
    }
}

/// Prints status changes to stdout
#[derive(Debug, Default)]
pub struct ConsoleStatus {
    current: Mutex<String>,
}

impl ConsoleStatus {
    /// Create an empty status line
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently displayed text
    #[must_use]
    pub fn current(&self) -> String {
        self.current
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

impl StatusDisplay for ConsoleStatus {
    fn set(&self, text: &str) {
        let Ok(mut current) = self.current.lock() else {
            return;
        };
        if *current == text {
            return;
        }
        text.clone_into(&mut *current);
        drop(current);

        if !text.is_empty() {
            println!("status: {text}");
        }
    }
}
