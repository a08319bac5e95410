//! Audio backend: microphone + Whisper for capture, `OpenAI` TTS + speakers for feedback

mod microphone;
mod playback;
mod stt;
mod tts;

pub use microphone::{Microphone, samples_to_wav};
pub use playback::{PLAYBACK_SAMPLE_RATE, decode_mp3, play_blocking};
pub use stt::WhisperClient;
pub use tts::{DEFAULT_VOICE, OPENAI_VOICES, OpenAiTts};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::capture::{RecognitionFailure, SpeechCapture};
use super::endpoint::SAMPLE_RATE;
use super::feedback::{SpeechSynthesizer, VoiceInfo};
use crate::{Error, Result};

/// Locale of every `OpenAI` voice
const OPENAI_VOICE_LANG: &str = "en-US";

/// Records one utterance from the microphone and transcribes it
pub struct WhisperCapture {
    stt: WhisperClient,
    listen_window: Duration,
}

impl WhisperCapture {
    /// Create a capture backend
    #[must_use]
    pub const fn new(stt: WhisperClient, listen_window: Duration) -> Self {
        Self { stt, listen_window }
    }
}

#[async_trait]
impl SpeechCapture for WhisperCapture {
    async fn listen(&self) -> std::result::Result<String, RecognitionFailure> {
        let window = self.listen_window;
        let samples = match tokio::task::spawn_blocking(move || {
            Microphone::record_utterance(window)
        })
        .await
        {
            Ok(Ok(Some(samples))) => samples,
            Ok(Ok(None)) => return Err(RecognitionFailure::NoSpeech),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "microphone failed");
                return Err(RecognitionFailure::Other("audio-capture".to_string()));
            }
            Err(e) => {
                tracing::error!(error = %e, "capture task failed");
                return Err(RecognitionFailure::Other("aborted".to_string()));
            }
        };

        let wav = samples_to_wav(&samples, SAMPLE_RATE).map_err(|e| {
            tracing::error!(error = %e, "wav encoding failed");
            RecognitionFailure::Other("audio-capture".to_string())
        })?;

        match self.stt.transcribe(&wav).await {
            Ok(text) if text.trim().is_empty() => Err(RecognitionFailure::NoSpeech),
            Ok(text) => Ok(text.trim().to_string()),
            Err(e) => {
                tracing::warn!(error = %e, "transcription failed");
                Err(RecognitionFailure::Other("network".to_string()))
            }
        }
    }
}

/// Speaks through `OpenAI` TTS and the default output device
pub struct OpenAiSynthesizer {
    tts: OpenAiTts,
    active: Mutex<Arc<AtomicBool>>,
}

impl OpenAiSynthesizer {
    /// Create a synthesizer backend
    #[must_use]
    pub fn new(tts: OpenAiTts) -> Self {
        Self {
            tts,
            active: Mutex::new(Arc::new(AtomicBool::new(false))),
        }
    }

    /// Register a fresh stop flag for a new utterance
    fn begin_utterance(&self) -> Arc<AtomicBool> {
        let stop = Arc::new(AtomicBool::new(false));
        if let Ok(mut active) = self.active.lock() {
            *active = Arc::clone(&stop);
        }
        stop
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSynthesizer {
    async fn voices(&self) -> Vec<VoiceInfo> {
        OPENAI_VOICES
            .iter()
            .map(|name| VoiceInfo::new(*name, OPENAI_VOICE_LANG))
            .collect()
    }

    fn cancel(&self) {
        if let Ok(active) = self.active.lock() {
            active.store(true, Ordering::Relaxed);
        }
    }

    async fn speak(&self, text: &str, voice: Option<&VoiceInfo>) -> Result<()> {
        let stop = self.begin_utterance();
        let voice = voice.map_or(DEFAULT_VOICE, |v| v.name.as_str());

        let mp3 = self.tts.synthesize(text, voice).await?;
        if stop.load(Ordering::Relaxed) {
            return Ok(());
        }

        let samples = decode_mp3(&mp3)?;
        tokio::task::spawn_blocking(move || play_blocking(samples, &stop))
            .await
            .map_err(|e| Error::Audio(format!("playback task failed: {e}")))?
    }
}
