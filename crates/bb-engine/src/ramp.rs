//! Seam to the external ramp (slew) generator.

use bb_ir::{Q16, Shape};

/// Identifies the interpreter run that is waiting on a ramp.
///
/// The epoch changes whenever the instance is reloaded or restarted, so a
/// completion that arrives after that is recognised as stale and dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResumeToken {
    pub instance: u8,
    pub epoch: u32,
}

/// A ramp generator driving one output per interpreter instance.
pub trait RampService {
    /// Move `instance`'s output toward `target` over `duration_ms`.
    ///
    /// `resume` is `Some` only when `duration_ms > 0`; the service must hand
    /// the token back (via `Registry::resume`) once the ramp completes.
    fn begin_ramp(
        &mut self,
        instance: u8,
        target: Q16,
        duration_ms: Q16,
        shape: Shape,
        resume: Option<ResumeToken>,
    );
}

impl<R: RampService + ?Sized> RampService for &mut R {
    fn begin_ramp(
        &mut self,
        instance: u8,
        target: Q16,
        duration_ms: Q16,
        shape: Shape,
        resume: Option<ResumeToken>,
    ) {
        (**self).begin_ramp(instance, target, duration_ms, shape, resume)
    }
}
