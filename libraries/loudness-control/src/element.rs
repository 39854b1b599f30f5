//! The loudness control stage as seen by a media pipeline
//!
//! One [`LoudnessControl`] exists per stream session. It owns the committed
//! processing state; configuration goes through cloneable [`ControlHandle`]s
//! that may live on any thread.
//!
//! # Example
//!
//! ```
//! use loudness_control::{AudioInfo, LoudnessControl, PcmBuffer, RecordingHost, SampleFormat};
//! use std::sync::Arc;
//!
//! let host = Arc::new(RecordingHost::new());
//! let mut element = LoudnessControl::new(host.clone());
//! element.setup(AudioInfo::new(SampleFormat::F32Le, 48000, 2))?;
//!
//! // Source measured at -17 LUFS, normalize to the -23 LUFS default
//! element.control().set_integrated_loudness(-17.0);
//!
//! let mut buffer = PcmBuffer::from_f32(&[0.5, -0.5]);
//! element.push(&mut buffer)?;
//! assert!(buffer.f32_samples()[0] < 0.5);
//! # Ok::<(), loudness_control::LoudnessControlError>(())
//! ```

use crate::commit::{CommitProtocol, CommittedState};
use crate::error::{LoudnessControlError, Result};
use crate::format::{template_caps, AudioInfo, Caps};
use crate::gain::DerivedParameters;
use crate::host::PipelineHost;
use crate::params::{ParameterStore, ParameterUpdate, RawParameters, DEFAULT_LEVEL_LUFS};
use crate::transform::{PcmBuffer, TransformEngine};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error};

/// Static description of the stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementMetadata {
    pub long_name: &'static str,
    pub klass: &'static str,
    pub description: &'static str,
}

/// Element metadata as registered with a pipeline
pub const METADATA: ElementMetadata = ElementMetadata {
    long_name: "EBUR128Control",
    klass: "Filter/Effect/Audio",
    description: "Control EBU R 128 loudness characteristics of audio/raw streams",
};

/// Configurable properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    IntegratedLoudness,
    TargetLevel,
}

impl Property {
    pub const ALL: [Self; 2] = [Self::IntegratedLoudness, Self::TargetLevel];

    pub fn name(&self) -> &'static str {
        match self {
            Self::IntegratedLoudness => "integrated_loudness_lufs",
            Self::TargetLevel => "target_level_lufs",
        }
    }

    pub fn nick(&self) -> &'static str {
        match self {
            Self::IntegratedLoudness => "integrated loudness",
            Self::TargetLevel => "target level",
        }
    }

    pub fn blurb(&self) -> &'static str {
        match self {
            Self::IntegratedLoudness => "EBU R 128 Integrated Loudness [LUFS]",
            Self::TargetLevel => "EBU R 128 Target Level [LUFS]",
        }
    }

    pub fn default_value(&self) -> f64 {
        DEFAULT_LEVEL_LUFS
    }

    /// Accepted range (unconstrained)
    pub fn range(&self) -> (f64, f64) {
        (f64::MIN, f64::MAX)
    }
}

impl FromStr for Property {
    type Err = LoudnessControlError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|property| property.name() == s)
            .ok_or_else(|| LoudnessControlError::UnknownProperty(s.to_string()))
    }
}

/// Thread-safe configuration handle
///
/// Writes take effect from the next buffer the stage processes.
#[derive(Clone)]
pub struct ControlHandle {
    params: Arc<ParameterStore>,
    host: Arc<dyn PipelineHost>,
}

impl ControlHandle {
    pub fn set_integrated_loudness(&self, lufs: f64) -> DerivedParameters {
        debug!(lufs, "Set integrated loudness");
        self.finish(self.params.set_integrated_loudness(lufs))
    }

    pub fn set_target_level(&self, lufs: f64) -> DerivedParameters {
        debug!(lufs, "Set target level");
        self.finish(self.params.set_target_level(lufs))
    }

    /// Replace both parameters at once
    pub fn set_parameters(&self, raw: RawParameters) -> DerivedParameters {
        self.finish(self.params.set_raw(raw))
    }

    pub fn integrated_loudness(&self) -> f64 {
        self.params.raw().integrated_loudness_lufs
    }

    pub fn target_level(&self) -> f64 {
        self.params.raw().target_level_lufs
    }

    pub fn parameters(&self) -> RawParameters {
        self.params.raw()
    }

    /// Latest derived snapshot (not necessarily committed yet)
    pub fn snapshot(&self) -> DerivedParameters {
        self.params.snapshot()
    }

    /// Set a property by name
    pub fn set_property(&self, name: &str, value: f64) -> Result<DerivedParameters> {
        Ok(match name.parse::<Property>()? {
            Property::IntegratedLoudness => self.set_integrated_loudness(value),
            Property::TargetLevel => self.set_target_level(value),
        })
    }

    /// Read a property by name
    pub fn property(&self, name: &str) -> Result<f64> {
        Ok(match name.parse::<Property>()? {
            Property::IntegratedLoudness => self.integrated_loudness(),
            Property::TargetLevel => self.target_level(),
        })
    }

    // Runs after the store lock is released
    fn finish(&self, update: ParameterUpdate) -> DerivedParameters {
        if update.reconfigure_sink {
            debug!(
                passthrough = update.snapshot.passthrough,
                "Passthrough eligibility changed, reconfiguring sink"
            );
            self.host.reconfigure_sink();
        }
        update.snapshot
    }
}

/// EBU R 128 loudness control stage
pub struct LoudnessControl {
    params: Arc<ParameterStore>,
    host: Arc<dyn PipelineHost>,
    committed: CommittedState,
    info: Option<AudioInfo>,
}

impl LoudnessControl {
    /// Create a stage with default parameters (unity gain)
    pub fn new(host: Arc<dyn PipelineHost>) -> Self {
        Self::with_parameters(RawParameters::default(), host)
    }

    pub fn with_parameters(raw: RawParameters, host: Arc<dyn PipelineHost>) -> Self {
        Self {
            params: Arc::new(ParameterStore::new(raw)),
            host,
            committed: CommittedState::default(),
            info: None,
        }
    }

    pub fn metadata() -> ElementMetadata {
        METADATA
    }

    /// Handle for configuring the stage from other threads
    pub fn control(&self) -> ControlHandle {
        ControlHandle {
            params: Arc::clone(&self.params),
            host: Arc::clone(&self.host),
        }
    }

    /// State the next buffer would be processed under, without recommitting
    pub fn committed(&self) -> &CommittedState {
        &self.committed
    }

    /// Whether buffers currently bypass the transform
    pub fn is_passthrough(&self) -> bool {
        self.committed.is_passthrough()
    }

    /// Formats the sink pad can accept right now
    ///
    /// Starts from the template for the latest passthrough eligibility,
    /// narrowed by what downstream allows and then by the query filter.
    pub fn sink_caps(&self, downstream: Option<&Caps>, filter: Option<&Caps>) -> Caps {
        let template = template_caps(self.params.snapshot().passthrough);

        let caps = match downstream {
            Some(downstream) => template.intersect(downstream),
            None => template,
        };

        match filter {
            Some(filter) => caps.intersect(filter),
            None => caps,
        }
    }

    /// Stream format changed
    pub fn setup(&mut self, info: AudioInfo) -> Result<()> {
        debug!(format = %info.format, rate = info.rate, channels = info.channels, "Setup");
        let raw = self.params.raw();
        debug!(
            integrated_loudness_lufs = raw.integrated_loudness_lufs,
            target_level_lufs = raw.target_level_lufs,
            "Configure"
        );

        self.info = Some(info);
        let latest = self.params.snapshot();
        let result = CommitProtocol::commit(latest, info.format, &*self.host);
        self.settle(latest, result)
    }

    /// Pick up parameter changes before the next buffer
    ///
    /// Fails with [`LoudnessControlError::Negotiation`] when the new
    /// parameters cannot be applied to the negotiated format. The stage then
    /// rejects buffers until the parameters change again or a new format is
    /// set up.
    pub fn before_transform(&mut self) -> Result<()> {
        let Some(info) = self.info else {
            return Ok(());
        };

        let latest = self.params.snapshot();
        let result = CommitProtocol::maybe_commit(self.committed, latest, info.format, &*self.host);
        self.settle(latest, result)
    }

    // Store the outcome of a commit, reporting failures to the host
    fn settle(&mut self, latest: DerivedParameters, result: Result<CommittedState>) -> Result<()> {
        match result {
            Ok(state) => {
                self.committed = state;
                Ok(())
            }
            Err(err) => {
                self.committed = CommittedState::unnegotiated(latest);
                self.host.post_error(&err);
                Err(err)
            }
        }
    }

    /// Apply the committed gain to `buffer` in place
    pub fn transform_ip(&mut self, buffer: &mut PcmBuffer) -> Result<()> {
        TransformEngine::process_buffer(&self.committed, buffer).map_err(|err| {
            error!(%err, "Transform failed");
            self.host.post_error(&err);
            err
        })
    }

    /// Drive one buffer the way a base transform would
    ///
    /// Commits pending parameters, then transforms unless in passthrough.
    pub fn push(&mut self, buffer: &mut PcmBuffer) -> Result<()> {
        self.before_transform()?;

        if self.committed.negotiated && self.committed.is_passthrough() {
            return Ok(());
        }

        self.transform_ip(buffer)
    }
}
