//! Utterance endpointing
//!
//! Decides from raw microphone samples when a single utterance has started
//! and ended, or that nobody spoke at all. Energy based: a chunk whose RMS
//! exceeds a threshold counts as speech.

use std::time::Duration;

/// Sample rate for audio capture (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// Minimum audio energy threshold to consider speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum voiced duration for an utterance (0.3 seconds)
const MIN_SPEECH_SAMPLES: usize = 4800;

/// Silence that ends an utterance (0.5 seconds)
const SILENCE_SAMPLES: usize = 8000;

/// Default time to wait for speech to start
pub const DEFAULT_LISTEN_WINDOW: Duration = Duration::from_secs(8);

/// Endpointing state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    /// Waiting for speech to start
    Waiting,
    /// Speech in progress
    Speaking,
    /// Utterance finished
    Complete,
    /// Listen window elapsed without speech
    NoSpeech,
}

impl DetectorState {
    /// Whether the session is over
    #[must_use]
    pub const fn is_final(self) -> bool {
        matches!(self, Self::Complete | Self::NoSpeech)
    }
}

/// Segments one utterance out of an audio stream
#[derive(Debug)]
pub struct UtteranceDetector {
    state: DetectorState,
    speech_buffer: Vec<f32>,
    voiced_samples: usize,
    silence_counter: usize,
    waited_samples: usize,
    window_samples: usize,
}

impl UtteranceDetector {
    /// Create a detector that gives up after `listen_window` without speech
    #[must_use]
    pub fn new(listen_window: Duration) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let window_samples =
            (listen_window.as_millis() * u128::from(SAMPLE_RATE) / 1000) as usize;

        Self {
            state: DetectorState::Waiting,
            speech_buffer: Vec::new(),
            voiced_samples: 0,
            silence_counter: 0,
            waited_samples: 0,
            window_samples,
        }
    }

    /// Feed a chunk of samples and return the resulting state
    pub fn process(&mut self, samples: &[f32]) -> DetectorState {
        let energy = calculate_energy(samples);
        let is_speech = energy > ENERGY_THRESHOLD;

        match self.state {
            DetectorState::Waiting => {
                if is_speech {
                    self.state = DetectorState::Speaking;
                    self.speech_buffer.clear();
                    self.speech_buffer.extend_from_slice(samples);
                    self.voiced_samples = samples.len();
                    self.silence_counter = 0;
                    tracing::trace!(energy, "speech started");
                } else {
                    self.waited_samples += samples.len();
                    if self.waited_samples >= self.window_samples {
                        tracing::debug!(waited = self.waited_samples, "no speech in listen window");
                        self.state = DetectorState::NoSpeech;
                    }
                }
            }
            DetectorState::Speaking => {
                self.speech_buffer.extend_from_slice(samples);

                if is_speech {
                    self.voiced_samples += samples.len();
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += samples.len();
                }

                if self.silence_counter > SILENCE_SAMPLES {
                    if self.voiced_samples >= MIN_SPEECH_SAMPLES {
                        tracing::debug!(samples = self.speech_buffer.len(), "utterance complete");
                        self.state = DetectorState::Complete;
                    } else {
                        // Too short to be an utterance; keep waiting
                        tracing::trace!(voiced = self.voiced_samples, "discarding blip");
                        self.waited_samples += self.speech_buffer.len();
                        self.speech_buffer.clear();
                        self.voiced_samples = 0;
                        self.silence_counter = 0;
                        self.state = if self.waited_samples >= self.window_samples {
                            DetectorState::NoSpeech
                        } else {
                            DetectorState::Waiting
                        };
                    }
                }
            }
            DetectorState::Complete | DetectorState::NoSpeech => {}
        }

        self.state
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> DetectorState {
        self.state
    }

    /// Samples accumulated since speech started
    #[must_use]
    pub fn speech_buffer(&self) -> &[f32] {
        &self.speech_buffer
    }

    /// Take the utterance samples, clearing the buffer
    pub fn take_utterance(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.speech_buffer)
    }

    /// Start a new session
    pub fn reset(&mut self) {
        self.state = DetectorState::Waiting;
        self.speech_buffer.clear();
        self.voiced_samples = 0;
        self.silence_counter = 0;
        self.waited_samples = 0;
    }
}

/// Calculate RMS energy of audio samples
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
