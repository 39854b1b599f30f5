//! User-facing loudness parameters and their lock-protected store

use crate::gain::{DerivedParameters, GainComputer};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// EBU R 128 broadcast reference level, the default for both parameters
pub const DEFAULT_LEVEL_LUFS: f64 = -23.0;

/// Raw loudness configuration as set by the user
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawParameters {
    /// Measured integrated loudness of the source [LUFS]
    pub integrated_loudness_lufs: f64,
    /// Desired output loudness [LUFS]
    pub target_level_lufs: f64,
}

impl Default for RawParameters {
    fn default() -> Self {
        Self {
            integrated_loudness_lufs: DEFAULT_LEVEL_LUFS,
            target_level_lufs: DEFAULT_LEVEL_LUFS,
        }
    }
}

impl RawParameters {
    /// Derive gain and passthrough
    pub fn derive(&self) -> DerivedParameters {
        GainComputer::compute(self.integrated_loudness_lufs, self.target_level_lufs)
    }
}

/// Outcome of a parameter write
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterUpdate {
    /// Snapshot in effect after the write
    pub snapshot: DerivedParameters,
    /// Passthrough eligibility flipped; the pipeline must re-query sink caps
    pub reconfigure_sink: bool,
}

#[derive(Debug)]
struct Inner {
    raw: RawParameters,
    derived: DerivedParameters,
    generation: u64,
}

/// Loudness parameters shared between the control and streaming threads
///
/// A single mutex guards both the raw values and the derived snapshot, so
/// a reader never sees gain and passthrough from different writes. The lock
/// is only held to copy values in or out; the gain itself is computed
/// outside the critical section.
#[derive(Debug)]
pub struct ParameterStore {
    inner: Mutex<Inner>,
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new(RawParameters::default())
    }
}

impl ParameterStore {
    /// Create a store seeded with `raw`
    pub fn new(raw: RawParameters) -> Self {
        Self {
            inner: Mutex::new(Inner {
                raw,
                derived: raw.derive(),
                generation: 0,
            }),
        }
    }

    /// Set the measured integrated loudness [LUFS]
    pub fn set_integrated_loudness(&self, lufs: f64) -> ParameterUpdate {
        self.update(|raw| raw.integrated_loudness_lufs = lufs)
    }

    /// Set the target level [LUFS]
    pub fn set_target_level(&self, lufs: f64) -> ParameterUpdate {
        self.update(|raw| raw.target_level_lufs = lufs)
    }

    /// Replace both values in one write
    pub fn set_raw(&self, raw: RawParameters) -> ParameterUpdate {
        self.update(|current| *current = raw)
    }

    /// Latest derived snapshot
    pub fn snapshot(&self) -> DerivedParameters {
        self.inner.lock().derived
    }

    /// Current raw values
    pub fn raw(&self) -> RawParameters {
        self.inner.lock().raw
    }

    fn update(&self, apply: impl FnOnce(&mut RawParameters)) -> ParameterUpdate {
        let (raw, generation) = {
            let mut inner = self.inner.lock();
            apply(&mut inner.raw);
            inner.generation += 1;
            (inner.raw, inner.generation)
        };

        let derived = raw.derive();

        let mut inner = self.inner.lock();
        if inner.generation != generation {
            // A later write raced ahead and owns publishing its own snapshot
            return ParameterUpdate {
                snapshot: inner.derived,
                reconfigure_sink: false,
            };
        }

        let reconfigure_sink = inner.derived.passthrough != derived.passthrough;
        inner.derived = derived;

        ParameterUpdate {
            snapshot: derived,
            reconfigure_sink,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let store = ParameterStore::default();
        let raw = store.raw();
        assert_eq!(raw.integrated_loudness_lufs, -23.0);
        assert_eq!(raw.target_level_lufs, -23.0);
        assert_eq!(store.snapshot(), DerivedParameters::NEUTRAL);
    }

    #[test]
    fn test_setter_recomputes_snapshot() {
        let store = ParameterStore::default();
        let update = store.set_integrated_loudness(-12.0);

        assert!(!update.snapshot.passthrough);
        assert!((update.snapshot.gain - 0.2818).abs() < 1e-4);
        assert_eq!(store.snapshot(), update.snapshot);
    }

    #[test]
    fn test_reconfigure_only_on_passthrough_flip() {
        let store = ParameterStore::default();

        // passthrough -> processing
        assert!(store.set_integrated_loudness(-12.0).reconfigure_sink);
        // processing -> processing
        assert!(!store.set_target_level(-18.0).reconfigure_sink);
        // processing -> passthrough
        assert!(store.set_integrated_loudness(-18.0).reconfigure_sink);
        // passthrough -> passthrough
        assert!(!store.set_raw(RawParameters::default()).reconfigure_sink);
    }

    #[test]
    fn test_raw_parameters_serde_defaults() {
        let raw: RawParameters =
            serde_json::from_str(r#"{"integrated_loudness_lufs": -9.5}"#).unwrap();
        assert_eq!(raw.integrated_loudness_lufs, -9.5);
        assert_eq!(raw.target_level_lufs, DEFAULT_LEVEL_LUFS);
    }
}
