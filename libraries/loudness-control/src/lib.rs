//! EBU R 128 loudness control for raw audio streams
//!
//! This crate provides an in-place gain stage that normalizes a stream to a
//! target loudness, given its measured integrated loudness:
//! - Gain derived from loudness and target level (both in LUFS)
//! - Lock-protected parameters, safe to update from any thread
//! - Format negotiation (F32LE / F64LE, anything in passthrough)
//! - Passthrough when gain is unity, gap signaling when muted
//!
//! # Architecture
//!
//! ```text
//! Control thread:
//! ┌───────────────┐     ┌────────────────┐
//! │ ControlHandle │ ──► │ ParameterStore │ ──► reconfigure_sink()
//! └───────────────┘     └────────────────┘
//!                               │ snapshot
//!                               ▼
//! Streaming thread:
//! ┌─────────────┐     ┌────────────────┐     ┌─────────────────┐
//! │ setup /     │ ──► │ CommitProtocol │ ──► │ TransformEngine │
//! │ push        │     └────────────────┘     └─────────────────┘
//! └─────────────┘
//! ```
//!
//! Loudness measurement itself is out of scope; feed the element values
//! computed elsewhere (e.g. an EBU R 128 analyzer or stored tags).

mod commit;
mod element;
mod error;
mod format;
mod gain;
mod host;
mod params;
mod transform;

pub use commit::{CommitProtocol, CommittedState};
pub use element::{ControlHandle, ElementMetadata, LoudnessControl, Property, METADATA};
pub use error::{LoudnessControlError, Result};
pub use format::{template_caps, AudioInfo, Caps, FormatNegotiator, SampleFormat};
pub use gain::{db_to_linear, DerivedParameters, GainComputer, MUTE_GAIN, NEUTRAL_GAIN};
pub use host::{NullHost, PipelineHost, RecordingHost};
pub use params::{ParameterStore, ParameterUpdate, RawParameters, DEFAULT_LEVEL_LUFS};
pub use transform::{Kernel, PcmBuffer, TransformEngine};

/// EBU R128 broadcast reference level (-23 LUFS)
pub const EBU_R128_BROADCAST_LUFS: f64 = -23.0;

/// Common streaming platform reference level (-14 LUFS)
pub const EBU_R128_STREAMING_LUFS: f64 = -14.0;

/// ReplayGain 2.0 reference loudness level (-18 LUFS)
pub const REPLAYGAIN_REFERENCE_LUFS: f64 = -18.0;
