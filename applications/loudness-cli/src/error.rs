//! CLI error types

use loudness_control::LoudnessControlError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Stream error: {0}")]
    Stream(#[from] LoudnessControlError),

    #[error("Input ends with {0} bytes that do not form a whole frame")]
    TrailingBytes(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for CliError {
    fn from(err: config::ConfigError) -> Self {
        CliError::Config(err.to_string())
    }
}
