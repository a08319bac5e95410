//! Speech feedback bridge
//!
//! Wraps a [`SpeechSynthesizer`] so that at most one utterance is active
//! (every new request cancels the previous one) and so that callers always get
//! a completion, even when synthesis fails.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;

use crate::Result;

/// A synthesis voice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceInfo {
    /// Voice name as reported by the engine
    pub name: String,
    /// BCP 47 language tag (e.g. "en-US")
    pub lang: String,
}

impl VoiceInfo {
    /// Create a voice descriptor
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
        }
    }
}

/// Text-to-speech engine
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Voices currently known to the engine (may be empty while loading)
    async fn voices(&self) -> Vec<VoiceInfo>;

    /// Stop the active utterance and drop anything queued
    fn cancel(&self);

    /// Speak `text` and resolve when the utterance ends
    ///
    /// `None` selects the engine's default voice.
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or playback fails
    async fn speak(&self, text: &str, voice: Option<&VoiceInfo>) -> Result<()>;
}

/// Pick the voice at `index` among voices matching `locale`
#[must_use]
pub fn select_voice(voices: &[VoiceInfo], locale: &str, index: usize) -> Option<VoiceInfo> {
    voices
        .iter()
        .filter(|v| v.lang == locale)
        .nth(index)
        .cloned()
}

/// Spoken feedback with a process-wide cached voice
#[derive(Clone)]
pub struct SpeechFeedback {
    synth: Arc<dyn SpeechSynthesizer>,
    voice: Arc<OnceCell<VoiceInfo>>,
}

impl SpeechFeedback {
    /// Wrap a synthesizer; the default voice is used until one is resolved
    pub fn new(synth: Arc<dyn SpeechSynthesizer>) -> Self {
        Self {
            synth,
            voice: Arc::new(OnceCell::new()),
        }
    }

    /// Resolved voice, if resolution has finished and found one
    #[must_use]
    pub fn voice(&self) -> Option<&VoiceInfo> {
        self.voice.get()
    }

    /// Poll the engine until it lists voices, then cache the selected one
    ///
    /// Returns the cached voice. When the engine lists voices but none at
    /// `index` for `locale`, nothing is cached and the default voice stays in use.
    pub async fn resolve_voice(
        &self,
        locale: &str,
        index: usize,
        poll_interval: Duration,
    ) -> Option<VoiceInfo> {
        if let Some(voice) = self.voice.get() {
            return Some(voice.clone());
        }

        let mut interval = tokio::time::interval(poll_interval.max(Duration::from_millis(1)));
        let voices = loop {
            interval.tick().await;
            let voices = self.synth.voices().await;
            if !voices.is_empty() {
                break voices;
            }
            tracing::trace!("no voices available yet");
        };

        let Some(voice) = select_voice(&voices, locale, index) else {
            tracing::warn!(
                locale,
                index,
                available = voices.len(),
                "no voice at configured index, using default voice"
            );
            return None;
        };

        tracing::info!(voice = %voice.name, lang = %voice.lang, "voice selected");
        // A concurrent resolution may have won; keep whichever was set first
        let _ = self.voice.set(voice);
        self.voice.get().cloned()
    }

    /// Resolve the voice in the background
    #[must_use]
    pub fn spawn_voice_resolution(
        &self,
        locale: String,
        index: usize,
        poll_interval: Duration,
    ) -> JoinHandle<()> {
        let feedback = self.clone();
        tokio::spawn(async move {
            feedback.resolve_voice(&locale, index, poll_interval).await;
        })
    }

    /// Speak `text`, preempting any active utterance
    ///
    /// Always completes: synthesis errors are logged and treated as the end
    /// of the utterance.
    pub async fn speak(&self, text: &str) {
        self.synth.cancel();
        tracing::debug!(text, "speaking");

        if let Err(e) = self.synth.speak(text, self.voice.get()).await {
            tracing::warn!(error = %e, text, "speech synthesis failed");
        }
    }
}

impl std::fmt::Debug for SpeechFeedback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechFeedback")
            .field("voice", &self.voice.get())
            .finish_non_exhaustive()
    }
}
