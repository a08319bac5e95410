//! TOML configuration file loading
//!
//! Supports `~/.config/voice-commands/config.toml` as a persistent config source.
//! All scalar fields are optional — the file is a partial overlay on top of defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Speech engine configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Dialogue phrases and timing
    #[serde(default)]
    pub dialogue: DialogueFileConfig,

    /// Scenario catalog, keyed by name
    #[serde(default)]
    pub scenarios: BTreeMap<String, ScenarioFileConfig>,

    /// Chained command flows, keyed by kind
    #[serde(default)]
    pub chains: BTreeMap<String, ChainFileConfig>,

    /// Command table, in evaluation order
    #[serde(default)]
    pub commands: Vec<CommandFileConfig>,
}

/// Speech engine configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoiceFileConfig {
    /// Speech backend ("console" or "openai")
    pub backend: Option<String>,

    /// Recognition and voice locale (e.g. "en-US")
    pub locale: Option<String>,

    /// Index of the voice among the locale's voices
    pub voice_index: Option<usize>,

    /// Voice list polling interval in milliseconds
    pub poll_interval_ms: Option<u64>,

    /// How long a capture session waits for speech to start, in milliseconds
    pub listen_window_ms: Option<u64>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,

    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,

    /// TTS speed multiplier
    pub tts_speed: Option<f32>,

    /// `OpenAI` API key (prefer the `OPENAI_API_KEY` env var)
    pub openai_api_key: Option<String>,
}

/// Dialogue phrases and timing
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DialogueFileConfig {
    pub listening_message: Option<String>,
    pub retry_message: Option<String>,
    pub sequence_delay_ms: Option<u64>,
    pub proceed_suffix: Option<String>,
    pub proceeding_message: Option<String>,
    pub canceled_message: Option<String>,
    pub confirm_words: Option<Vec<String>>,
}

/// A catalog scenario
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioFileConfig {
    /// Message spoken before the scenario runs
    pub feedback: String,

    /// Fixed result text
    pub result: Option<String>,

    /// Program whose stdout is the result text
    pub exec: Option<Vec<String>>,

    /// Program timeout in seconds
    pub timeout_secs: Option<u64>,

    /// Simulated work time for fixed results, in milliseconds
    pub delay_ms: Option<u64>,
}

/// A chained command flow
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainFileConfig {
    /// Program run on confirmation, payload JSON on stdin
    pub exec: Option<Vec<String>>,

    /// Program timeout in seconds
    pub timeout_secs: Option<u64>,

    pub proceed_suffix: Option<String>,
    pub proceeding_message: Option<String>,
    pub canceled_message: Option<String>,
    pub confirm_words: Option<Vec<String>>,
}

/// A command table entry
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandFileConfig {
    /// Command name (unique)
    pub name: String,

    /// Substrings that must all occur in the transcript
    pub tokens: Vec<String>,

    /// Scenario to run
    pub scenario: Option<String>,

    /// Scenarios to run one after another
    pub sequence: Option<Vec<String>>,

    /// Chain kind to start
    pub chain: Option<String>,
}

/// Parse a TOML config document
///
/// # Errors
///
/// Returns error if the document is not valid TOML or does not fit the schema
pub fn parse_config(content: &str) -> Result<ConfigFile> {
    Ok(toml::from_str(content)?)
}

/// Read and parse a config file from an explicit path
///
/// # Errors
///
/// Returns error if the file cannot be read or parsed
pub fn read_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    tracing::info!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Load the TOML config file from the standard path
///
/// Returns `ConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> (ConfigFile, Option<PathBuf>) {
    let Some(path) = config_file_path() else {
        return (ConfigFile::default(), None);
    };

    if !path.exists() {
        return (ConfigFile::default(), None);
    }

    match read_config_file(&path) {
        Ok(config) => (config, Some(path)),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to load config file, using defaults"
            );
            (ConfigFile::default(), None)
        }
    }
}

/// Return the config file path: `~/.config/voice-commands/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "voice-commands")
        .map(|d| d.config_dir().join("config.toml"))
}
