//! Pipeline-facing signals
//!
//! The stage never owns scheduling or buffer lifetime. Whatever drives it
//! implements [`PipelineHost`] to hear about passthrough switches, sink
//! renegotiation requests and fatal errors.

use crate::error::LoudnessControlError;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Callbacks from the stage into the surrounding pipeline
///
/// `reconfigure_sink` may be called from any control thread; the other
/// callbacks come from the streaming thread.
pub trait PipelineHost: Send + Sync {
    /// Passthrough eligibility changed; re-query the sink caps
    fn reconfigure_sink(&self);

    /// Switch buffer handling: `true` lets buffers flow through untouched,
    /// `false` requires writable buffers that are transformed in place
    fn set_passthrough(&self, passthrough: bool);

    /// Report a fatal error for the current stream segment
    fn post_error(&self, error: &LoudnessControlError);
}

/// Host that ignores every signal
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHost;

impl PipelineHost for NullHost {
    fn reconfigure_sink(&self) {}

    fn set_passthrough(&self, _passthrough: bool) {}

    fn post_error(&self, _error: &LoudnessControlError) {}
}

/// Host that records what it was told
#[derive(Debug)]
pub struct RecordingHost {
    reconfigure_requests: AtomicUsize,
    passthrough_switches: AtomicUsize,
    passthrough: AtomicBool,
    errors: AtomicUsize,
}

impl Default for RecordingHost {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingHost {
    /// Starts in passthrough, like a freshly created stage
    pub fn new() -> Self {
        Self {
            reconfigure_requests: AtomicUsize::new(0),
            passthrough_switches: AtomicUsize::new(0),
            passthrough: AtomicBool::new(true),
            errors: AtomicUsize::new(0),
        }
    }

    pub fn reconfigure_requests(&self) -> usize {
        self.reconfigure_requests.load(Ordering::Acquire)
    }

    /// Number of `set_passthrough` calls
    pub fn passthrough_switches(&self) -> usize {
        self.passthrough_switches.load(Ordering::Acquire)
    }

    /// Last passthrough mode requested
    pub fn is_passthrough(&self) -> bool {
        self.passthrough.load(Ordering::Acquire)
    }

    pub fn errors(&self) -> usize {
        self.errors.load(Ordering::Acquire)
    }
}

impl PipelineHost for RecordingHost {
    fn reconfigure_sink(&self) {
        self.reconfigure_requests.fetch_add(1, Ordering::AcqRel);
    }

    fn set_passthrough(&self, passthrough: bool) {
        self.passthrough.store(passthrough, Ordering::Release);
        self.passthrough_switches.fetch_add(1, Ordering::AcqRel);
    }

    fn post_error(&self, _error: &LoudnessControlError) {
        self.errors.fetch_add(1, Ordering::AcqRel);
    }
}
