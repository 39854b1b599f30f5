//! Committing parameter snapshots to the streaming thread
//!
//! The control thread only ever touches the [`ParameterStore`](crate::ParameterStore).
//! Right before each buffer, the streaming thread compares the latest
//! snapshot with the one it is running under and, if they differ, compiles
//! a new [`CommittedState`] for the negotiated format.

use crate::error::Result;
use crate::format::{FormatNegotiator, SampleFormat};
use crate::gain::DerivedParameters;
use crate::host::PipelineHost;
use crate::transform::Kernel;
use tracing::{debug, error};

/// Parameters actually in effect for buffer processing
///
/// Only negotiation builds a negotiated state, so the kernel always matches
/// the snapshot: a non-unity gain never pairs with [`Kernel::None`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommittedState {
    pub(crate) active: DerivedParameters,
    pub(crate) kernel: Kernel,
    pub(crate) negotiated: bool,
}

impl Default for CommittedState {
    fn default() -> Self {
        Self::unnegotiated(DerivedParameters::NEUTRAL)
    }
}

impl CommittedState {
    /// State that rejects every buffer
    pub fn unnegotiated(active: DerivedParameters) -> Self {
        Self {
            active,
            kernel: Kernel::None,
            negotiated: false,
        }
    }

    /// Snapshot the kernel was bound to
    pub fn active(&self) -> DerivedParameters {
        self.active
    }

    /// Kernel for the negotiated sample format
    pub fn kernel(&self) -> Kernel {
        self.kernel
    }

    /// Whether a usable format is in effect
    pub fn is_negotiated(&self) -> bool {
        self.negotiated
    }

    /// Whether buffers bypass the transform entirely
    pub fn is_passthrough(&self) -> bool {
        self.active.passthrough
    }
}

/// Synchronization point between control-side snapshots and processing
pub struct CommitProtocol;

impl CommitProtocol {
    /// Bind `latest` to `format` unconditionally
    ///
    /// Always tells the host which passthrough mode to use. A format the
    /// snapshot cannot process fails with
    /// [`Negotiation`](crate::LoudnessControlError::Negotiation); the caller
    /// must then run under [`CommittedState::unnegotiated`] and report the
    /// error to the pipeline.
    pub fn commit(
        latest: DerivedParameters,
        format: SampleFormat,
        host: &dyn PipelineHost,
    ) -> Result<CommittedState> {
        debug!(
            gain = latest.gain,
            gain_db = latest.gain_db(),
            passthrough = latest.passthrough,
            %format,
            "Committing loudness parameters"
        );

        host.set_passthrough(latest.passthrough);

        FormatNegotiator::negotiate(format, latest).map_err(|err| {
            error!(%err, "Cannot process negotiated format");
            err
        })
    }

    /// Recommit only when `latest` differs from what is in effect
    pub fn maybe_commit(
        current: CommittedState,
        latest: DerivedParameters,
        format: SampleFormat,
        host: &dyn PipelineHost,
    ) -> Result<CommittedState> {
        if latest == current.active {
            return Ok(current);
        }

        Self::commit(latest, format, host)
    }
}
