//! Seams between the controller and the outside world.
//!
//! The controller never awaits anything itself: submitters and pollers start
//! their work and report back later through [`crate::Msg`], tagged with the
//! generation they were started for.

use crate::{Generation, JobRequest, TransportCheckError};

/// Starts exactly one remote job per call. Never starts polling.
pub trait JobSubmitter {
    fn submit(&mut self, generation: Generation, request: JobRequest);
}

/// Owns the recurring status check.
pub trait StatusPoller {
    /// Exclusive right to stop one running poller.
    type Handle;

    fn start(&mut self, generation: Generation) -> Self::Handle;

    /// Takes the handle by value; cancelling twice is impossible through the
    /// controller, and implementations treat it as a no-op anyway.
    fn cancel(&mut self, handle: Self::Handle);
}

/// Consumer-facing callbacks, implemented by the presentation layer.
pub trait ResultSink {
    fn on_log_update(&mut self, lines: &[String]);

    fn on_success(&mut self, total_items: u64, artifact_handle: &str);

    fn on_failure(&mut self, message: &str);

    /// Diagnostic channel for failed status checks. Polling carries on.
    fn on_transport_error(&mut self, _error: &TransportCheckError) {}
}

impl<S: ResultSink + ?Sized> ResultSink for Box<S> {
    fn on_log_update(&mut self, lines: &[String]) {
        (**self).on_log_update(lines);
    }

    fn on_success(&mut self, total_items: u64, artifact_handle: &str) {
        (**self).on_success(total_items, artifact_handle);
    }

    fn on_failure(&mut self, message: &str) {
        (**self).on_failure(message);
    }

    fn on_transport_error(&mut self, error: &TransportCheckError) {
        (**self).on_transport_error(error);
    }
}
