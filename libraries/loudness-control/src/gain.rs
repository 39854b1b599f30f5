//! Loudness-normalizing gain computation
//!
//! Turns a measured integrated loudness and a target level (both in LUFS)
//! into the linear multiplier applied to every sample.

use serde::{Deserialize, Serialize};

/// Gain that silences the stream. Buffers processed with it become gaps.
pub const MUTE_GAIN: f64 = 0.0;

/// Unity gain. Buffers processed with it are left untouched.
pub const NEUTRAL_GAIN: f64 = 1.0;

/// Parameters derived from the raw loudness configuration
///
/// Immutable once computed; two snapshots compare equal iff the stage would
/// process audio identically under both.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedParameters {
    /// Linear gain multiplier (>= 0)
    pub gain: f64,
    /// Whether buffers can flow through unmodified
    pub passthrough: bool,
}

impl DerivedParameters {
    /// Snapshot for unity gain
    pub const NEUTRAL: Self = Self {
        gain: NEUTRAL_GAIN,
        passthrough: true,
    };

    /// Whether this snapshot silences the stream
    pub fn is_mute(&self) -> bool {
        self.gain == MUTE_GAIN
    }

    /// Gain in dB (negative infinity for mute)
    pub fn gain_db(&self) -> f64 {
        20.0 * self.gain.log10()
    }
}

impl Default for DerivedParameters {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Computes the loudness-normalizing gain
pub struct GainComputer;

impl GainComputer {
    /// Derive gain and passthrough from loudness and target level
    ///
    /// A source measured at -12 LUFS with a target of -23 LUFS needs
    /// -11 dB of gain, i.e. a multiplier of `10^(-11/20)` (about 0.2818).
    /// Equal loudness and target give exactly 1.0 and enable passthrough.
    pub fn compute(loudness_lufs: f64, target_lufs: f64) -> DerivedParameters {
        let gain = db_to_linear(Self::gain_db(loudness_lufs, target_lufs));

        DerivedParameters {
            gain,
            passthrough: gain == NEUTRAL_GAIN,
        }
    }

    /// Gain in dB needed to bring `loudness_lufs` to `target_lufs`
    pub fn gain_db(loudness_lufs: f64, target_lufs: f64) -> f64 {
        target_lufs - loudness_lufs
    }
}

/// Convert dB to a linear amplitude multiplier
pub fn db_to_linear(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_levels_are_passthrough() {
        for level in [-70.0, -23.0, -18.0, -14.0, 0.0, 5.5] {
            let p = GainComputer::compute(level, level);
            assert_eq!(p.gain, 1.0);
            assert!(p.passthrough);
        }
    }

    #[test]
    fn test_attenuation() {
        let p = GainComputer::compute(-12.0, -23.0);
        assert!((p.gain - 0.281_838_3).abs() < 1e-6);
        assert!(p.gain < 1.0);
        assert!(!p.passthrough);
    }

    #[test]
    fn test_boost() {
        // +6.0206 dB doubles amplitude
        let p = GainComputer::compute(-29.0206, -23.0);
        assert!((p.gain - 2.0).abs() < 1e-4);
        assert!(!p.passthrough);
    }

    #[test]
    fn test_gain_db_roundtrip() {
        let p = GainComputer::compute(-16.0, -23.0);
        assert!((p.gain_db() - (-7.0)).abs() < 1e-9);
    }

    #[test]
    fn test_extreme_attenuation_mutes() {
        let p = GainComputer::compute(0.0, -10_000.0);
        assert!(p.is_mute());
        assert!(!p.passthrough);
    }

    #[test]
    fn test_default_is_neutral() {
        assert_eq!(DerivedParameters::default(), DerivedParameters::NEUTRAL);
        assert!(!DerivedParameters::NEUTRAL.is_mute());
    }
}
