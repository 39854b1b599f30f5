//! CLI configuration

use crate::error::{CliError, Result};
use clap::ValueEnum;
use loudness_control::{
    RawParameters, SampleFormat, EBU_R128_BROADCAST_LUFS, EBU_R128_STREAMING_LUFS,
    REPLAYGAIN_REFERENCE_LUFS,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable prefix, e.g. `LOUDNESS_STREAM__FORMAT=F64LE`
pub const ENV_PREFIX: &str = "LOUDNESS";

/// Largest buffer pushed through the stage (64 MiB)
pub const MAX_BUFFER_BYTES: usize = 64 * 1024 * 1024;

/// Well-known target levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TargetPreset {
    /// EBU R 128 broadcast (-23 LUFS)
    Broadcast,
    /// Streaming platforms (-14 LUFS)
    Streaming,
    /// ReplayGain 2.0 reference (-18 LUFS)
    #[value(name = "replaygain")]
    ReplayGain,
}

impl TargetPreset {
    pub fn lufs(self) -> f64 {
        match self {
            Self::Broadcast => EBU_R128_BROADCAST_LUFS,
            Self::Streaming => EBU_R128_STREAMING_LUFS,
            Self::ReplayGain => REPLAYGAIN_REFERENCE_LUFS,
        }
    }
}

/// Command-line values that take precedence over file and environment
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Overrides {
    pub format: Option<SampleFormat>,
    pub channels: Option<u16>,
    pub integrated_loudness_lufs: Option<f64>,
    pub target_level_lufs: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CliConfig {
    #[serde(default)]
    pub loudness: RawParameters,

    #[serde(default)]
    pub stream: StreamSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StreamSettings {
    #[serde(default = "default_format")]
    pub format: SampleFormat,

    #[serde(default = "default_rate")]
    pub rate: u32,

    #[serde(default = "default_channels")]
    pub channels: u16,

    /// Frames per buffer pushed through the stage
    #[serde(default = "default_buffer_frames")]
    pub buffer_frames: usize,
}

impl StreamSettings {
    /// Bytes per pushed buffer, `None` on overflow
    pub fn buffer_bytes(&self) -> Option<usize> {
        self.format
            .width_bytes()
            .checked_mul(usize::from(self.channels))?
            .checked_mul(self.buffer_frames)
    }
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            format: default_format(),
            rate: default_rate(),
            channels: default_channels(),
            buffer_frames: default_buffer_frames(),
        }
    }
}

impl CliConfig {
    /// Load configuration from an optional file and the environment
    ///
    /// Environment variables override the file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(CliError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            settings = settings.add_source(config::File::from(path));
        }

        settings = settings.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = settings.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides
    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(format) = overrides.format {
            self.stream.format = format;
        }
        if let Some(channels) = overrides.channels {
            self.stream.channels = channels;
        }
        if let Some(lufs) = overrides.integrated_loudness_lufs {
            self.loudness.integrated_loudness_lufs = lufs;
        }
        if let Some(lufs) = overrides.target_level_lufs {
            self.loudness.target_level_lufs = lufs;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.stream.rate == 0 {
            return Err(CliError::Config("Sample rate must be positive".to_string()));
        }

        if self.stream.channels == 0 {
            return Err(CliError::Config("Channel count must be positive".to_string()));
        }

        if self.stream.buffer_frames == 0 {
            return Err(CliError::Config("Buffer size must be positive".to_string()));
        }

        match self.stream.buffer_bytes() {
            Some(bytes) if bytes <= MAX_BUFFER_BYTES => {}
            _ => {
                return Err(CliError::Config(format!(
                    "Buffer of {} frames exceeds {} bytes",
                    self.stream.buffer_frames, MAX_BUFFER_BYTES
                )))
            }
        }

        Ok(())
    }
}

// Default values
fn default_format() -> SampleFormat {
    SampleFormat::F32Le
}

fn default_rate() -> u32 {
    48000
}

fn default_channels() -> u16 {
    2
}

fn default_buffer_frames() -> usize {
    1024
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = CliConfig::default();
        assert_eq!(config.loudness.integrated_loudness_lufs, -23.0);
        assert_eq!(config.stream.format, SampleFormat::F32Le);
        assert_eq!(config.stream.buffer_frames, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[loudness]
integrated_loudness_lufs = -12.5

[stream]
format = "F64LE"
channels = 1
"#
        )
        .unwrap();

        let config = CliConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.loudness.integrated_loudness_lufs, -12.5);
        assert_eq!(config.loudness.target_level_lufs, -23.0);
        assert_eq!(config.stream.format, SampleFormat::F64Le);
        assert_eq!(config.stream.channels, 1);
        assert_eq!(config.stream.rate, 48000);
    }

    #[test]
    fn test_missing_file() {
        let result = CliConfig::load(Some(Path::new("/nonexistent/loudness.toml")));
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[stream]
buffer_frames = 64
"#
        )
        .unwrap();

        // Only this test touches buffer_frames, other loads stay unaffected
        std::env::set_var("LOUDNESS_STREAM__BUFFER_FRAMES", "256");
        let result = CliConfig::load(Some(file.path()));
        std::env::remove_var("LOUDNESS_STREAM__BUFFER_FRAMES");

        assert_eq!(result.unwrap().stream.buffer_frames, 256);
    }

    #[test]
    fn test_command_line_overrides() {
        let mut config = CliConfig::default();
        config.apply_overrides(Overrides {
            format: Some(SampleFormat::F64Le),
            target_level_lufs: Some(TargetPreset::Streaming.lufs()),
            ..Overrides::default()
        });

        assert_eq!(config.stream.format, SampleFormat::F64Le);
        assert_eq!(config.stream.channels, 2);
        assert_eq!(config.loudness.integrated_loudness_lufs, -23.0);
        assert_eq!(config.loudness.target_level_lufs, -14.0);
    }

    #[test]
    fn test_presets() {
        assert_eq!(TargetPreset::Broadcast.lufs(), -23.0);
        assert_eq!(TargetPreset::ReplayGain.lufs(), -18.0);
        assert_eq!(
            TargetPreset::from_str("replaygain", false),
            Ok(TargetPreset::ReplayGain)
        );
    }

    #[test]
    fn test_validate_rejects_zero_channels() {
        let mut config = CliConfig::default();
        config.stream.channels = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_buffers() {
        let mut config = CliConfig::default();
        config.stream.buffer_frames = usize::MAX;
        assert_eq!(config.stream.buffer_bytes(), None);
        assert!(matches!(config.validate(), Err(CliError::Config(_))));

        config.stream.buffer_frames = MAX_BUFFER_BYTES / 8 + 1;
        assert!(config.validate().is_err());

        config.stream.buffer_frames = MAX_BUFFER_BYTES / 8;
        assert!(config.validate().is_ok());
    }
}
