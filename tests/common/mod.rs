//! Shared test utilities

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use voice_commands::chain::{ChainRegistry, ConfirmFlow, DeferredAction};
use voice_commands::voice::{
    RecognitionFailure, SpeechCapture, SpeechFeedback, SpeechSynthesizer, StatusDisplay,
    VoiceInfo,
};
use voice_commands::{CommandTable, DialogueSettings, Error, Interpreter, Result, Scenario};

/// Ordered log of everything the fakes observed
#[derive(Debug, Clone, Default)]
pub struct Events(Arc<Mutex<Vec<String>>>);

impl Events {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn all(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Spoken utterances, in order
    pub fn spoken(&self) -> Vec<String> {
        self.filtered("say:")
    }

    /// Status updates, in order ("" is a clear)
    pub fn statuses(&self) -> Vec<String> {
        self.filtered("status:")
    }

    /// Position of the first event equal to `event`
    pub fn position(&self, event: &str) -> Option<usize> {
        self.all().iter().position(|e| e == event)
    }

    fn filtered(&self, prefix: &str) -> Vec<String> {
        self.all()
            .iter()
            .filter_map(|e| e.strip_prefix(prefix).map(ToString::to_string))
            .collect()
    }
}

pub fn heard(text: &str) -> std::result::Result<String, RecognitionFailure> {
    Ok(text.to_string())
}

pub fn no_speech() -> std::result::Result<String, RecognitionFailure> {
    Err(RecognitionFailure::NoSpeech)
}

pub fn failure(reason: &str) -> std::result::Result<String, RecognitionFailure> {
    Err(RecognitionFailure::Other(reason.to_string()))
}

/// Capture that replays a fixed script of recognition results
pub struct ScriptedCapture {
    script: Mutex<VecDeque<std::result::Result<String, RecognitionFailure>>>,
    events: Events,
}

impl ScriptedCapture {
    pub fn new(
        events: &Events,
        script: impl IntoIterator<Item = std::result::Result<String, RecognitionFailure>>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            events: events.clone(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }
}

#[async_trait]
impl SpeechCapture for ScriptedCapture {
    async fn listen(&self) -> std::result::Result<String, RecognitionFailure> {
        self.events.push("listen");
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(RecognitionFailure::Other("script exhausted".to_string())))
    }
}

/// Synthesizer that records utterances instead of playing them
pub struct RecordingSynth {
    events: Events,
    voices: Vec<VoiceInfo>,
    empty_polls: AtomicUsize,
    cancels: AtomicUsize,
    used_voices: Mutex<Vec<Option<String>>>,
    fail: bool,
}

impl RecordingSynth {
    pub fn new(events: &Events) -> Self {
        Self {
            events: events.clone(),
            voices: vec![
                VoiceInfo::new("alto", "en-US"),
                VoiceInfo::new("british", "en-GB"),
                VoiceInfo::new("tenor", "en-US"),
                VoiceInfo::new("soprano", "en-US"),
            ],
            empty_polls: AtomicUsize::new(0),
            cancels: AtomicUsize::new(0),
            used_voices: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// Report no voices for the first `polls` queries
    #[must_use]
    pub fn with_empty_polls(self, polls: usize) -> Self {
        self.empty_polls.store(polls, Ordering::SeqCst);
        self
    }

    /// Fail every utterance
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }

    pub fn used_voices(&self) -> Vec<Option<String>> {
        self.used_voices.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for RecordingSynth {
    async fn voices(&self) -> Vec<VoiceInfo> {
        let pending = self.empty_polls.load(Ordering::SeqCst);
        if pending > 0 {
            self.empty_polls.store(pending - 1, Ordering::SeqCst);
            return Vec::new();
        }
        self.voices.clone()
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }

    async fn speak(&self, text: &str, voice: Option<&VoiceInfo>) -> Result<()> {
        self.events.push(format!("say:{text}"));
        self.used_voices
            .lock()
            .unwrap()
            .push(voice.map(|v| v.name.clone()));
        if self.fail {
            return Err(Error::Synthesis("device unavailable".to_string()));
        }
        Ok(())
    }
}

/// Status display that records every update
pub struct RecordingStatus {
    events: Events,
}

impl RecordingStatus {
    pub fn new(events: &Events) -> Self {
        Self {
            events: events.clone(),
        }
    }
}

impl StatusDisplay for RecordingStatus {
    fn set(&self, text: &str) {
        self.events.push(format!("status:{text}"));
    }
}

/// Scenario that records when it starts and finishes
pub struct RecordingScenario {
    name: String,
    feedback: String,
    result: std::result::Result<String, String>,
    delay: Duration,
    events: Events,
}

impl RecordingScenario {
    pub fn new(events: &Events, name: &str, feedback: &str, result: &str) -> Self {
        Self {
            name: name.to_string(),
            feedback: feedback.to_string(),
            result: Ok(result.to_string()),
            delay: Duration::ZERO,
            events: events.clone(),
        }
    }

    pub fn failing(events: &Events, name: &str, feedback: &str) -> Self {
        Self {
            result: Err(format!("{name} broke")),
            ..Self::new(events, name, feedback, "")
        }
    }

    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl Scenario for RecordingScenario {
    fn name(&self) -> &str {
        &self.name
    }

    fn feedback_message(&self) -> String {
        self.feedback.clone()
    }

    async fn execute(&self) -> Result<String> {
        self.events.push(format!("exec:{}", self.name));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.events.push(format!("done:{}", self.name));
        self.result.clone().map_err(Error::Scenario)
    }
}

/// Deferred action that records its payloads
pub struct RecordingAction {
    events: Events,
    payloads: Mutex<Vec<serde_json::Value>>,
}

impl RecordingAction {
    pub fn new(events: &Events) -> Self {
        Self {
            events: events.clone(),
            payloads: Mutex::new(Vec::new()),
        }
    }

    pub fn payloads(&self) -> Vec<serde_json::Value> {
        self.payloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeferredAction for RecordingAction {
    async fn run(&self, kind: &str, payload: &serde_json::Value) -> Result<()> {
        self.events.push(format!("act:{kind}"));
        self.payloads.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

/// Everything needed to drive and observe an interpreter
pub struct Harness {
    pub events: Events,
    pub capture: Arc<ScriptedCapture>,
    pub synth: Arc<RecordingSynth>,
    pub feedback: SpeechFeedback,
    pub interpreter: Interpreter,
}

/// Settings with no pause between sequence steps
pub fn fast_settings() -> DialogueSettings {
    DialogueSettings {
        sequence_delay: Duration::ZERO,
        ..DialogueSettings::default()
    }
}

/// Build an interpreter over a scripted capture and recording fakes
pub fn harness(
    events: &Events,
    table: CommandTable,
    chains: ChainRegistry,
    script: impl IntoIterator<Item = std::result::Result<String, RecognitionFailure>>,
) -> Harness {
    let capture = Arc::new(ScriptedCapture::new(events, script));
    let synth = Arc::new(RecordingSynth::new(events));
    let feedback = SpeechFeedback::new(synth.clone());
    let status = Arc::new(RecordingStatus::new(events));

    let interpreter = Interpreter::new(table, chains, capture.clone(), feedback.clone(), status)
        .expect("failed to build interpreter")
        .with_settings(fast_settings());

    Harness {
        events: events.clone(),
        capture,
        synth,
        feedback,
        interpreter,
    }
}

/// Registry with one confirmation flow whose action is recorded
pub fn archive_chain(action: Arc<RecordingAction>) -> ChainRegistry {
    ChainRegistry::new().with(Arc::new(ConfirmFlow::new("archive").with_action(action)))
}
