//! Sample format model and format negotiation
//!
//! Gain processing is only defined for little-endian IEEE float samples.
//! When the configured gain is exactly unity the stage never touches sample
//! data, so any raw audio format is accepted.

use crate::commit::CommittedState;
use crate::error::{LoudnessControlError, Result};
use crate::gain::DerivedParameters;
use crate::transform::Kernel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Raw PCM sample encodings a pipeline may offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SampleFormat {
    F32Le,
    F64Le,
    F32Be,
    F64Be,
    S8,
    U8,
    S16Le,
    S24Le,
    S32Le,
}

impl SampleFormat {
    /// Every known format, in preference order
    pub const ALL: [Self; 9] = [
        Self::F32Le,
        Self::F64Le,
        Self::F32Be,
        Self::F64Be,
        Self::S8,
        Self::U8,
        Self::S16Le,
        Self::S24Le,
        Self::S32Le,
    ];

    /// Formats the gain kernels can process
    pub const PROCESSABLE: [Self; 2] = [Self::F32Le, Self::F64Le];

    /// Canonical caps-style name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::F32Le => "F32LE",
            Self::F64Le => "F64LE",
            Self::F32Be => "F32BE",
            Self::F64Be => "F64BE",
            Self::S8 => "S8",
            Self::U8 => "U8",
            Self::S16Le => "S16LE",
            Self::S24Le => "S24LE",
            Self::S32Le => "S32LE",
        }
    }

    /// Size of one sample in bytes
    pub fn width_bytes(&self) -> usize {
        match self {
            Self::S8 | Self::U8 => 1,
            Self::S16Le => 2,
            Self::S24Le => 3,
            Self::F32Le | Self::F32Be | Self::S32Le => 4,
            Self::F64Le | Self::F64Be => 8,
        }
    }

    /// Whether samples are IEEE floats
    pub fn is_float(&self) -> bool {
        matches!(self, Self::F32Le | Self::F64Le | Self::F32Be | Self::F64Be)
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SampleFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|format| format.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown sample format: {s}"))
    }
}

impl TryFrom<String> for SampleFormat {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SampleFormat> for String {
    fn from(format: SampleFormat) -> Self {
        format.as_str().to_string()
    }
}

/// Negotiated stream format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioInfo {
    pub format: SampleFormat,
    /// Sample rate in Hz
    pub rate: u32,
    /// Interleaved channel count
    pub channels: u16,
}

impl AudioInfo {
    pub fn new(format: SampleFormat, rate: u32, channels: u16) -> Self {
        Self {
            format,
            rate,
            channels,
        }
    }

    /// Size of one interleaved frame in bytes
    pub fn bytes_per_frame(&self) -> usize {
        self.format.width_bytes() * usize::from(self.channels)
    }
}

/// Set of sample formats a pad can accept
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caps {
    /// Any raw audio
    Any,
    /// Only the listed formats, in preference order
    Formats(Vec<SampleFormat>),
}

impl Caps {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Formats(formats) if formats.is_empty())
    }

    pub fn accepts(&self, format: SampleFormat) -> bool {
        match self {
            Self::Any => true,
            Self::Formats(formats) => formats.contains(&format),
        }
    }

    /// Formats accepted by both sides, ordered by `self`
    pub fn intersect(&self, other: &Caps) -> Caps {
        match (self, other) {
            (Self::Any, other) => other.clone(),
            (this, Self::Any) => this.clone(),
            (Self::Formats(ours), Self::Formats(theirs)) => Self::Formats(
                ours.iter()
                    .copied()
                    .filter(|format| theirs.contains(format))
                    .collect(),
            ),
        }
    }
}

/// Sink template for the current passthrough eligibility
pub fn template_caps(passthrough: bool) -> Caps {
    if passthrough {
        Caps::Any
    } else {
        Caps::Formats(SampleFormat::PROCESSABLE.to_vec())
    }
}

/// Binds a parameter snapshot to a concrete sample format
pub struct FormatNegotiator;

impl FormatNegotiator {
    /// Select the kernel for `format` under `snapshot`
    ///
    /// Non-float formats are only valid when no sample math will happen.
    pub fn negotiate(format: SampleFormat, snapshot: DerivedParameters) -> Result<CommittedState> {
        let kernel = match format {
            SampleFormat::F32Le => Kernel::Float32,
            SampleFormat::F64Le => Kernel::Float64,
            _ if snapshot.passthrough => Kernel::None,
            _ => return Err(LoudnessControlError::Negotiation { format }),
        };

        Ok(CommittedState {
            active: snapshot,
            kernel,
            negotiated: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gain::GainComputer;

    #[test]
    fn test_format_names_roundtrip() {
        for format in SampleFormat::ALL {
            assert_eq!(format.as_str().parse::<SampleFormat>(), Ok(format));
        }
        assert_eq!("f64le".parse::<SampleFormat>(), Ok(SampleFormat::F64Le));
        assert!("F16LE".parse::<SampleFormat>().is_err());
    }

    #[test]
    fn test_bytes_per_frame() {
        assert_eq!(AudioInfo::new(SampleFormat::F32Le, 48000, 2).bytes_per_frame(), 8);
        assert_eq!(AudioInfo::new(SampleFormat::F64Le, 44100, 6).bytes_per_frame(), 48);
        assert_eq!(AudioInfo::new(SampleFormat::S24Le, 96000, 2).bytes_per_frame(), 6);
    }

    #[test]
    fn test_negotiate_float_formats() {
        let snapshot = GainComputer::compute(-12.0, -23.0);

        let state = FormatNegotiator::negotiate(SampleFormat::F32Le, snapshot).unwrap();
        assert_eq!(state.kernel, Kernel::Float32);
        assert!(state.negotiated);
        assert_eq!(state.active, snapshot);

        let state = FormatNegotiator::negotiate(SampleFormat::F64Le, snapshot).unwrap();
        assert_eq!(state.kernel, Kernel::Float64);
    }

    #[test]
    fn test_negotiate_rejects_integer_formats_when_processing() {
        let snapshot = GainComputer::compute(-12.0, -23.0);
        for format in [SampleFormat::S16Le, SampleFormat::U8, SampleFormat::F32Be] {
            assert_eq!(
                FormatNegotiator::negotiate(format, snapshot),
                Err(LoudnessControlError::Negotiation { format })
            );
        }
    }

    #[test]
    fn test_negotiate_accepts_anything_in_passthrough() {
        for format in SampleFormat::ALL {
            let state = FormatNegotiator::negotiate(format, DerivedParameters::NEUTRAL).unwrap();
            assert!(state.negotiated);
        }
        let state =
            FormatNegotiator::negotiate(SampleFormat::S16Le, DerivedParameters::NEUTRAL).unwrap();
        assert_eq!(state.kernel, Kernel::None);
    }

    #[test]
    fn test_template_caps() {
        assert_eq!(template_caps(true), Caps::Any);
        let process = template_caps(false);
        assert!(process.accepts(SampleFormat::F32Le));
        assert!(process.accepts(SampleFormat::F64Le));
        assert!(!process.accepts(SampleFormat::S16Le));
    }

    #[test]
    fn test_caps_intersection_keeps_first_order() {
        let ours = template_caps(false);
        let theirs = Caps::Formats(vec![SampleFormat::S16Le, SampleFormat::F64Le, SampleFormat::F32Le]);
        assert_eq!(
            ours.intersect(&theirs),
            Caps::Formats(vec![SampleFormat::F32Le, SampleFormat::F64Le])
        );
        assert_eq!(Caps::Any.intersect(&theirs), theirs);
        assert!(ours
            .intersect(&Caps::Formats(vec![SampleFormat::S32Le]))
            .is_empty());
    }

    #[test]
    fn test_sample_format_serde() {
        let json = serde_json::to_string(&SampleFormat::F64Le).unwrap();
        assert_eq!(json, "\"F64LE\"");
        let parsed: SampleFormat = serde_json::from_str("\"s16le\"").unwrap();
        assert_eq!(parsed, SampleFormat::S16Le);
    }
}
