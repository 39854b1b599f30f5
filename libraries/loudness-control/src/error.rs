//! Error types for loudness control

use crate::format::SampleFormat;
use thiserror::Error;

/// Result type for loudness control operations
pub type Result<T> = std::result::Result<T, LoudnessControlError>;

/// Errors that can occur while negotiating or processing a stream
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoudnessControlError {
    /// The negotiated sample format cannot carry a non-unity gain
    #[error("Invalid incoming format: {format} (gain processing requires F32LE or F64LE)")]
    Negotiation { format: SampleFormat },

    /// A buffer arrived before a format was negotiated
    #[error("No format was negotiated")]
    NotNegotiated,

    /// Property lookup by name failed
    #[error("Unknown property: {0}")]
    UnknownProperty(String),
}
