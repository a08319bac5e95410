//! Error types for the voice command interpreter

use thiserror::Error;

/// Result type alias for interpreter operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring or running the interpreter
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (invalid command table, unknown references, bad values)
    #[error("configuration error: {0}")]
    Config(String),

    /// Speech recognition backend error
    #[error("recognition error: {0}")]
    Recognition(String),

    /// Speech synthesis error
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Scenario execution error
    #[error("scenario error: {0}")]
    Scenario(String),

    /// Chained command error
    #[error("chain error: {0}")]
    Chain(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[cfg(feature = "audio")]
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
