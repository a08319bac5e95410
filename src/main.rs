use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use voice_commands::commands::{Action, normalize};
use voice_commands::voice::{
    ConsoleCapture, ConsoleStatus, ConsoleSynthesizer, SpeechCapture, SpeechFeedback,
    SpeechSynthesizer, StatusDisplay, select_voice,
};
use voice_commands::{Backend, Config, Interpreter};

/// Voice Commands - speak a command, hear it carried out
#[derive(Parser)]
#[command(name = "voicecmd", version, about)]
struct Cli {
    /// Config file (defaults to the per-user config path)
    #[arg(short, long, env = "VOICECMD_CONFIG")]
    config: Option<PathBuf>,

    /// Speech backend: console or openai
    #[arg(long)]
    backend: Option<Backend>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Show which command a transcript would trigger
    Match {
        /// Transcript to match
        text: String,
    },
    /// List the speech backend's voices and the one that would be used
    Voices,
    /// Validate the configuration and exit
    Check,
}

/// Speech engines for one backend
struct Engines {
    capture: Arc<dyn SpeechCapture>,
    synth: Arc<dyn SpeechSynthesizer>,
    status: Arc<dyn StatusDisplay>,
    console: Option<Arc<ConsoleCapture>>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,voice_commands=info",
        1 => "info,voice_commands=debug",
        2 => "debug",
        _ => "trace",
    };

    // stdout carries spoken text and status
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(backend) = cli.backend {
        config.voice.backend = backend;
    }
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Some(Command::Match { text }) => cmd_match(&config, &text),
        Some(Command::Voices) => cmd_voices(&config).await,
        Some(Command::Check) => cmd_check(&config),
        None => run_interpreter(config).await,
    }
}

/// Listen and respond until input ends or the process is interrupted
async fn run_interpreter(config: Config) -> anyhow::Result<()> {
    let catalog = config.build_catalog()?;
    let table = config.build_table(&catalog)?;
    let chains = config.build_chains()?;

    let engines = build_engines(&config)?;
    let feedback = SpeechFeedback::new(engines.synth);

    let mut interpreter =
        Interpreter::new(table, chains, engines.capture, feedback.clone(), engines.status)?
            .with_settings(config.dialogue.clone());

    let _voice = feedback.spawn_voice_resolution(
        config.voice.locale.clone(),
        config.voice.voice_index,
        config.voice.poll_interval,
    );

    tracing::info!(
        backend = ?config.voice.backend,
        commands = interpreter.table().len(),
        "voice commands ready"
    );

    loop {
        tokio::select! {
            outcome = interpreter.run_turn() => {
                tracing::debug!(?outcome, state = ?interpreter.state(), "turn complete");
                if engines.console.as_ref().is_some_and(|c| c.is_closed()) {
                    tracing::info!("input closed, shutting down");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, shutting down");
                break;
            }
        }
    }

    Ok(())
}

/// Show which binding a transcript selects
fn cmd_match(config: &Config, text: &str) -> anyhow::Result<()> {
    let catalog = config.build_catalog()?;
    let table = config.build_table(&catalog)?;

    let normalized = normalize(text);
    let binding = table.find(&normalized);

    let action = match binding.action() {
        Action::Scenario(scenario) => format!("scenario {}", scenario.name()),
        Action::Sequence(scenarios) => {
            let names: Vec<_> = scenarios.iter().map(|s| s.name()).collect();
            format!("sequence {}", names.join(" -> "))
        }
        Action::Chain(kind) => format!("chain {kind}"),
        Action::Echo => "echo".to_string(),
    };

    println!("{}: {action}", binding.name());
    Ok(())
}

/// List available voices
async fn cmd_voices(config: &Config) -> anyhow::Result<()> {
    let engines = build_engines(config)?;
    let voices = engines.synth.voices().await;

    for voice in &voices {
        println!("{} ({})", voice.name, voice.lang);
    }

    match select_voice(&voices, &config.voice.locale, config.voice.voice_index) {
        Some(voice) => println!("\nselected: {} ({})", voice.name, voice.lang),
        None => println!(
            "\nno voice at index {} for {}, the default voice will be used",
            config.voice.voice_index, config.voice.locale
        ),
    }

    Ok(())
}

/// Build every component the configuration describes
fn cmd_check(config: &Config) -> anyhow::Result<()> {
    let catalog = config.build_catalog()?;
    let table = config.build_table(&catalog)?;
    let chains = config.build_chains()?;

    match &config.source {
        Some(path) => println!("config: {}", path.display()),
        None => println!("config: built-in defaults"),
    }
    println!(
        "{} scenarios, {} commands, {} chains",
        catalog.len(),
        table.len(),
        chains.kinds().len()
    );
    for binding in table.bindings() {
        println!("  {}", binding.name());
    }

    let unused = config.unused_definitions();
    if !unused.is_empty() {
        println!("unused:");
        for definition in unused {
            tracing::warn!(definition = %definition, "defined but never used by a command");
            println!("  {definition}");
        }
    }

    Ok(())
}

/// Create the speech engines for the configured backend
fn build_engines(config: &Config) -> anyhow::Result<Engines> {
    match config.voice.backend {
        Backend::Console => {
            let console = Arc::new(ConsoleCapture::new());
            let capture: Arc<dyn SpeechCapture> = console.clone();
            Ok(Engines {
                capture,
                synth: Arc::new(ConsoleSynthesizer::default()),
                status: Arc::new(ConsoleStatus::new()),
                console: Some(console),
            })
        }
        Backend::OpenAi => build_openai_engines(config),
    }
}

#[cfg(feature = "audio")]
fn build_openai_engines(config: &Config) -> anyhow::Result<Engines> {
    use voice_commands::voice::LogStatus;
    use voice_commands::voice::audio::{
        OpenAiSynthesizer, OpenAiTts, WhisperCapture, WhisperClient,
    };

    let api_key = config
        .voice
        .openai_api_key
        .clone()
        .ok_or_else(|| anyhow::anyhow!("the openai backend needs OPENAI_API_KEY"))?;

    let stt = WhisperClient::new(
        api_key.clone(),
        config.voice.stt_model.clone(),
        Some(config.voice.locale.as_str()),
    )?;
    let tts = OpenAiTts::new(api_key, config.voice.tts_model.clone(), config.voice.tts_speed)?;

    Ok(Engines {
        capture: Arc::new(WhisperCapture::new(stt, config.voice.listen_window)),
        synth: Arc::new(OpenAiSynthesizer::new(tts)),
        status: Arc::new(LogStatus),
        console: None,
    })
}

#[cfg(not(feature = "audio"))]
fn build_openai_engines(_config: &Config) -> anyhow::Result<Engines> {
    anyhow::bail!("the openai backend requires building with --features audio")
}
