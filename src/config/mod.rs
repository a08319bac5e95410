//! Configuration management
//!
//! Layered: built-in defaults, then the TOML file, then environment overrides.

pub mod file;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::chain::{ChainRegistry, ConfirmFlow, ConfirmMessages, DeferredAction, ExecAction};
use crate::commands::{Action, Binding, CommandTable};
use crate::interpreter::DialogueSettings;
use crate::scenario::{ExecScenario, Scenario, ScenarioCatalog, StaticScenario};
use crate::voice::endpoint::DEFAULT_LISTEN_WINDOW;
use crate::{Error, Result};

pub use file::{ChainFileConfig, CommandFileConfig, ConfigFile, ScenarioFileConfig};

/// Speech backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Type utterances, read spoken text on the terminal
    #[default]
    Console,
    /// Microphone + Whisper, `OpenAI` TTS + speakers
    OpenAi,
}

impl FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "console" => Ok(Self::Console),
            "openai" => Ok(Self::OpenAi),
            other => Err(Error::Config(format!("unknown backend: {other}"))),
        }
    }
}

/// Speech engine configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Speech backend
    pub backend: Backend,

    /// Locale for recognition and voice selection
    pub locale: String,

    /// Index of the voice among the locale's voices
    pub voice_index: usize,

    /// How often the voice list is polled until available
    pub poll_interval: Duration,

    /// How long a capture session waits for speech to start
    pub listen_window: Duration,

    /// STT model for the `openai` backend
    pub stt_model: String,

    /// TTS model for the `openai` backend
    pub tts_model: String,

    /// TTS speed multiplier (0.25 to 4.0)
    pub tts_speed: f32,

    /// `OpenAI` API key
    pub openai_api_key: Option<String>,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Console,
            locale: "en-US".to_string(),
            voice_index: 2,
            poll_interval: Duration::from_millis(50),
            listen_window: DEFAULT_LISTEN_WINDOW,
            stt_model: "whisper-1".to_string(),
            tts_model: "tts-1".to_string(),
            tts_speed: 1.0,
            openai_api_key: None,
        }
    }
}

/// Interpreter configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Speech engine configuration
    pub voice: VoiceConfig,

    /// Dialogue phrases and timing
    pub dialogue: DialogueSettings,

    /// Default phrases for confirmation flows
    pub confirm: ConfirmMessages,

    /// Scenario catalog definitions, keyed by name
    pub scenarios: BTreeMap<String, ScenarioFileConfig>,

    /// Chain flow definitions, keyed by kind
    pub chains: BTreeMap<String, ChainFileConfig>,

    /// Command table definitions, in evaluation order
    pub commands: Vec<CommandFileConfig>,

    /// File the configuration was read from
    pub source: Option<PathBuf>,
}

impl Config {
    /// Load configuration
    ///
    /// An explicit `path` must exist and parse; otherwise the standard path is
    /// tried and defaults are used when it is missing or invalid.
    ///
    /// # Errors
    ///
    /// Returns error if the explicit file cannot be loaded or a value is invalid
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (file, source) = match path {
            Some(path) => (file::read_config_file(path)?, Some(path.to_path_buf())),
            None => file::load_config_file(),
        };

        let mut config = Self::from_file(file)?;
        config.source = source;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Build configuration from a TOML document, without env overrides
    ///
    /// # Errors
    ///
    /// Returns error if the document does not parse or a value is invalid
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Self::from_file(file::parse_config(content)?)
    }

    /// Apply file values on top of defaults
    ///
    /// # Errors
    ///
    /// Returns error if a value is invalid
    pub fn from_file(file: ConfigFile) -> Result<Self> {
        let mut config = Self::default();

        let voice = file.voice;
        if let Some(backend) = voice.backend {
            config.voice.backend = backend.parse()?;
        }
        if let Some(locale) = voice.locale {
            config.voice.locale = locale;
        }
        if let Some(index) = voice.voice_index {
            config.voice.voice_index = index;
        }
        if let Some(ms) = voice.poll_interval_ms {
            config.voice.poll_interval = Duration::from_millis(ms.max(1));
        }
        if let Some(ms) = voice.listen_window_ms {
            config.voice.listen_window = Duration::from_millis(ms);
        }
        if let Some(model) = voice.stt_model {
            config.voice.stt_model = model;
        }
        if let Some(model) = voice.tts_model {
            config.voice.tts_model = model;
        }
        if let Some(speed) = voice.tts_speed {
            if !(0.25..=4.0).contains(&speed) {
                return Err(Error::Config(format!(
                    "voice.tts_speed must be between 0.25 and 4.0, got {speed}"
                )));
            }
            config.voice.tts_speed = speed;
        }
        config.voice.openai_api_key = voice.openai_api_key;

        let dialogue = file.dialogue;
        if let Some(message) = dialogue.listening_message {
            config.dialogue.listening_message = message;
        }
        if let Some(message) = dialogue.retry_message {
            config.dialogue.retry_message = message;
        }
        if let Some(ms) = dialogue.sequence_delay_ms {
            config.dialogue.sequence_delay = Duration::from_millis(ms);
        }
        if let Some(suffix) = dialogue.proceed_suffix {
            config.confirm.suffix = suffix;
        }
        if let Some(message) = dialogue.proceeding_message {
            config.confirm.proceeding = message;
        }
        if let Some(message) = dialogue.canceled_message {
            config.confirm.canceled = message;
        }
        if let Some(words) = dialogue.confirm_words {
            config.confirm.confirm_words = normalize_words(words, "dialogue.confirm_words")?;
        }

        config.scenarios = file.scenarios;
        config.chains = file.chains;
        config.commands = file.commands;

        Ok(config)
    }

    /// Apply environment overrides
    ///
    /// `lookup` maps a variable name to its value.
    ///
    /// # Errors
    ///
    /// Returns error if an override value is invalid
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(backend) = lookup("VOICECMD_BACKEND") {
            self.voice.backend = backend.parse()?;
        }
        if let Some(locale) = lookup("VOICECMD_LOCALE") {
            self.voice.locale = locale;
        }
        if let Some(delay) = lookup("VOICECMD_SEQUENCE_DELAY_MS") {
            let ms: u64 = delay.parse().map_err(|_| {
                Error::Config(format!("VOICECMD_SEQUENCE_DELAY_MS is not a number: {delay}"))
            })?;
            self.dialogue.sequence_delay = Duration::from_millis(ms);
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.voice.openai_api_key = Some(key);
        }
        Ok(())
    }

    /// Build the scenario catalog
    ///
    /// # Errors
    ///
    /// Returns error if a scenario defines neither or both of `result` and `exec`
    pub fn build_catalog(&self) -> Result<ScenarioCatalog> {
        let mut catalog = ScenarioCatalog::new();

        for (name, def) in &self.scenarios {
            let scenario: Arc<dyn Scenario> = match (&def.result, &def.exec) {
                (Some(result), None) => {
                    let mut scenario = StaticScenario::new(name, &def.feedback, result);
                    if let Some(ms) = def.delay_ms {
                        scenario = scenario.with_delay(Duration::from_millis(ms));
                    }
                    Arc::new(scenario)
                }
                (None, Some(argv)) => Arc::new(ExecScenario::new(
                    name,
                    &def.feedback,
                    argv.clone(),
                    def.timeout_secs.map(Duration::from_secs),
                )?),
                _ => {
                    return Err(Error::Config(format!(
                        "scenario {name}: set exactly one of `result` or `exec`"
                    )));
                }
            };
            catalog.insert(scenario);
        }

        Ok(catalog)
    }

    /// Build the chain registry
    ///
    /// Every configured chain and every chain kind a command starts gets a
    /// confirmation flow; kinds without a `[chains.*]` entry use the default
    /// phrases and no deferred action.
    ///
    /// # Errors
    ///
    /// Returns error if a chain definition is invalid
    pub fn build_chains(&self) -> Result<ChainRegistry> {
        let mut registry = ChainRegistry::new();

        for (kind, def) in &self.chains {
            let mut messages = self.confirm.clone();
            if let Some(suffix) = &def.proceed_suffix {
                messages.suffix.clone_from(suffix);
            }
            if let Some(message) = &def.proceeding_message {
                messages.proceeding.clone_from(message);
            }
            if let Some(message) = &def.canceled_message {
                messages.canceled.clone_from(message);
            }
            if let Some(words) = &def.confirm_words {
                messages.confirm_words =
                    normalize_words(words.clone(), &format!("chains.{kind}.confirm_words"))?;
            }

            let mut flow = ConfirmFlow::new(kind.as_str()).with_messages(messages);
            if let Some(argv) = &def.exec {
                let action: Arc<dyn DeferredAction> = Arc::new(ExecAction::new(
                    argv.clone(),
                    def.timeout_secs.map(Duration::from_secs),
                )?);
                flow = flow.with_action(action);
            }
            registry.register(Arc::new(flow));
        }

        for command in &self.commands {
            if let Some(kind) = &command.chain {
                if !registry.contains(kind) {
                    registry.register(Arc::new(
                        ConfirmFlow::new(kind.as_str()).with_messages(self.confirm.clone()),
                    ));
                }
            }
        }

        Ok(registry)
    }

    /// Build the command table against a catalog
    ///
    /// # Errors
    ///
    /// Returns error if a command has no or several actions, an empty token
    /// set, a duplicate name, or refers to an unknown scenario
    pub fn build_table(&self, catalog: &ScenarioCatalog) -> Result<CommandTable> {
        let mut table = CommandTable::new();

        for command in &self.commands {
            let action = match (&command.scenario, &command.sequence, &command.chain) {
                (Some(scenario), None, None) => Action::Scenario(catalog.resolve(scenario)?),
                (None, Some(sequence), None) => {
                    if sequence.is_empty() {
                        return Err(Error::Config(format!(
                            "command {}: sequence is empty",
                            command.name
                        )));
                    }
                    Action::Sequence(
                        sequence
                            .iter()
                            .map(|name| catalog.resolve(name))
                            .collect::<Result<Vec<_>>>()?,
                    )
                }
                (None, None, Some(kind)) => Action::Chain(kind.clone()),
                _ => {
                    return Err(Error::Config(format!(
                        "command {}: set exactly one of `scenario`, `sequence` or `chain`",
                        command.name
                    )));
                }
            };

            table.push(Binding::tokens(&command.name, &command.tokens, action)?)?;
        }

        tracing::debug!(commands = table.len(), "command table built");
        Ok(table)
    }

    /// Definitions no command refers to
    ///
    /// Lists `scenario <name>` for catalog entries no command runs and
    /// `chain <kind>` for chain sections no command starts.
    #[must_use]
    pub fn unused_definitions(&self) -> Vec<String> {
        let used_scenarios: Vec<&str> = self
            .commands
            .iter()
            .flat_map(|c| c.scenario.iter().chain(c.sequence.iter().flatten()))
            .map(String::as_str)
            .collect();
        let used_chains: Vec<&str> = self
            .commands
            .iter()
            .filter_map(|c| c.chain.as_deref())
            .collect();

        let scenarios = self
            .scenarios
            .keys()
            .filter(|name| !used_scenarios.contains(&name.as_str()))
            .map(|name| format!("scenario {name}"));
        let chains = self
            .chains
            .keys()
            .filter(|kind| !used_chains.contains(&kind.as_str()))
            .map(|kind| format!("chain {kind}"));

        scenarios.chain(chains).collect()
    }
}

/// Lower-case a word list and reject empty entries
fn normalize_words(words: Vec<String>, field: &str) -> Result<Vec<String>> {
    if words.is_empty() || words.iter().any(|w| w.trim().is_empty()) {
        return Err(Error::Config(format!("{field} must list non-empty words")));
    }
    Ok(words.into_iter().map(|w| w.to_lowercase()).collect())
}
