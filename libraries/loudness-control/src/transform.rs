//! Per-buffer gain application
//!
//! # Real-Time Constraints
//! - No allocations
//! - No locks
//! - Work bounded by buffer length

use crate::commit::CommittedState;
use crate::error::{LoudnessControlError, Result};
use crate::gain::{MUTE_GAIN, NEUTRAL_GAIN};

/// Sample-processing kernel selected at negotiation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Kernel {
    /// No sample math (passthrough of a non-float format)
    #[default]
    None,
    /// Little-endian 32-bit IEEE float
    Float32,
    /// Little-endian 64-bit IEEE float
    Float64,
}

impl Kernel {
    /// Multiply every sample in `bytes` by `gain`, in place
    ///
    /// Trailing bytes that do not form a whole sample are left alone; a
    /// negotiated stream never produces them.
    #[inline]
    pub fn apply(self, bytes: &mut [u8], gain: f64) {
        match self {
            Self::None => {}
            Self::Float32 => scale_f32(bytes, gain as f32),
            Self::Float64 => scale_f64(bytes, gain),
        }
    }
}

fn scale_f32(bytes: &mut [u8], gain: f32) {
    for chunk in bytes.chunks_exact_mut(4) {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(chunk);
        let sample = f32::from_le_bytes(raw) * gain;
        chunk.copy_from_slice(&sample.to_le_bytes());
    }
}

fn scale_f64(bytes: &mut [u8], gain: f64) {
    for chunk in bytes.chunks_exact_mut(8) {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(chunk);
        let sample = f64::from_le_bytes(raw) * gain;
        chunk.copy_from_slice(&sample.to_le_bytes());
    }
}

/// Raw PCM buffer handed through the pipeline
///
/// Samples are interleaved; a buffer flagged as a gap carries no
/// meaningful audio and may be skipped by every stage.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PcmBuffer {
    data: Vec<u8>,
    gap: bool,
}

impl PcmBuffer {
    /// Wrap raw little-endian sample bytes
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, gap: false }
    }

    /// A gap buffer of `len` zero bytes
    pub fn gap(len: usize) -> Self {
        Self {
            data: vec![0; len],
            gap: true,
        }
    }

    pub fn from_f32(samples: &[f32]) -> Self {
        Self::new(samples.iter().flat_map(|s| s.to_le_bytes()).collect())
    }

    pub fn from_f64(samples: &[f64]) -> Self {
        Self::new(samples.iter().flat_map(|s| s.to_le_bytes()).collect())
    }

    /// Decode the buffer as F32LE samples
    pub fn f32_samples(&self) -> Vec<f32> {
        self.data
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    /// Decode the buffer as F64LE samples
    pub fn f64_samples(&self) -> Vec<f64> {
        self.data
            .chunks_exact(8)
            .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
            .collect()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_gap(&self) -> bool {
        self.gap
    }

    pub fn set_gap(&mut self, gap: bool) {
        self.gap = gap;
    }
}

/// Applies the committed gain to buffers in place
pub struct TransformEngine;

impl TransformEngine {
    /// Process one buffer under `state`
    ///
    /// Mute zero-fills the buffer and flags it as a gap so downstream stages
    /// can skip it too. The gap flag is never cleared here.
    pub fn process_buffer(state: &CommittedState, buffer: &mut PcmBuffer) -> Result<()> {
        if !state.negotiated {
            return Err(LoudnessControlError::NotNegotiated);
        }

        if buffer.is_gap() {
            return Ok(());
        }

        let gain = state.active.gain;
        if gain == MUTE_GAIN {
            buffer.as_bytes_mut().fill(0);
            buffer.set_gap(true);
        } else if gain != NEUTRAL_GAIN {
            debug_assert!(
                state.kernel != Kernel::None,
                "non-unity gain committed without a float kernel"
            );
            state.kernel.apply(buffer.as_bytes_mut(), gain);
        }

        Ok(())
    }
}
