//! Loudness Control CLI
//!
//! Runs the loudness control stage over raw PCM files, standing in for a
//! media pipeline.

pub mod config;
pub mod error;
pub mod runner;

pub use config::{CliConfig, Overrides, StreamSettings, TargetPreset};
pub use error::{CliError, Result};
pub use runner::{apply_stream, ApplySummary};
