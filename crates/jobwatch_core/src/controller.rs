use std::num::NonZeroU32;

use jobwatch_logging::{watch_debug, watch_info, watch_warn, LIFECYCLE_TARGET};
use thiserror::Error;

use crate::{
    Generation, JobRequest, JobSubmitter, LifecycleState, LifecycleView, Msg, ResultSink,
    StatusPoller, StatusSnapshot, SubmissionError, TerminalResult, TransportCheckError,
};

/// Failure message for a finished job that reported no result payload.
pub const NO_RESULT_MESSAGE: &str = "no result";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControllerSettings {
    /// Consecutive failed checks tolerated before the job is declared
    /// unreachable. `None` keeps polling forever.
    pub max_consecutive_check_failures: Option<NonZeroU32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("controller has been disposed")]
    Disposed,
}

/// Drives one job at a time from submission to a terminal result.
///
/// Every asynchronous answer comes back tagged with the [`Generation`] it was
/// issued for; answers for any generation but the current one are dropped.
pub struct LifecycleController<J, P, S>
where
    P: StatusPoller,
{
    submitter: J,
    poller: P,
    sink: S,
    settings: ControllerSettings,
    state: LifecycleState<P::Handle>,
    generation: Generation,
    log_lines: Vec<String>,
    consecutive_check_failures: u32,
    disposed: bool,
}

impl<J, P, S> LifecycleController<J, P, S>
where
    J: JobSubmitter,
    P: StatusPoller,
    S: ResultSink,
{
    pub fn new(submitter: J, poller: P, sink: S, settings: ControllerSettings) -> Self {
        Self {
            submitter,
            poller,
            sink,
            settings,
            state: LifecycleState::Idle,
            generation: Generation::default(),
            log_lines: Vec::new(),
            consecutive_check_failures: 0,
            disposed: false,
        }
    }

    /// Single entry point for everything that can happen to the controller.
    pub fn update(&mut self, msg: Msg) -> Result<(), ControllerError> {
        match msg {
            Msg::Start(request) => self.start(request).map(|_| ()),
            Msg::SubmissionResolved { generation, result } => {
                self.on_submission(generation, result);
                Ok(())
            }
            Msg::SnapshotReceived {
                generation,
                snapshot,
            } => {
                self.on_snapshot(generation, snapshot);
                Ok(())
            }
            Msg::CheckFailed { generation, error } => {
                self.on_check_failed(generation, error);
                Ok(())
            }
            Msg::Dispose => {
                self.dispose();
                Ok(())
            }
        }
    }

    /// Begins a new run. An active run is torn down before anything else happens.
    pub fn start(&mut self, request: JobRequest) -> Result<Generation, ControllerError> {
        if self.disposed {
            return Err(ControllerError::Disposed);
        }

        if self.state.is_active() {
            watch_info!(
                target: LIFECYCLE_TARGET,
                "Superseding run {} ({:?})",
                self.generation,
                self.state.phase()
            );
        }
        self.release_poll_handle();

        self.generation = self.generation.next();
        let generation = self.generation;
        self.state = LifecycleState::Submitting { generation };
        self.log_lines.clear();
        self.consecutive_check_failures = 0;

        watch_info!(
            target: LIFECYCLE_TARGET,
            "Submitting run {} query_len={} page_limit={}",
            generation,
            request.query().len(),
            request.page_limit()
        );
        self.submitter.submit(generation, request);
        Ok(generation)
    }

    pub fn on_submission(&mut self, generation: Generation, result: Result<(), SubmissionError>) {
        if !self.is_current(generation) {
            return;
        }
        if !matches!(self.state, LifecycleState::Submitting { .. }) {
            watch_debug!(
                target: LIFECYCLE_TARGET,
                "Ignoring submission result for {} in phase {:?}",
                generation,
                self.state.phase()
            );
            return;
        }

        match result {
            Ok(()) => {
                watch_info!(target: LIFECYCLE_TARGET, "Run {} accepted, polling", generation);
                let handle = self.poller.start(generation);
                self.state = LifecycleState::Running(handle);
            }
            Err(err) => {
                watch_warn!(target: LIFECYCLE_TARGET, "Run {} rejected: {}", generation, err);
                let message = err.to_string();
                self.state = LifecycleState::Terminated(TerminalResult::failure(message.clone()));
                self.sink.on_failure(&message);
            }
        }
    }

    pub fn on_snapshot(&mut self, generation: Generation, snapshot: StatusSnapshot) {
        if !self.is_current(generation) || !self.is_running() {
            return;
        }
        self.consecutive_check_failures = 0;

        let StatusSnapshot {
            running,
            log_lines,
            result,
        } = snapshot;
        let changed = log_lines != self.log_lines;
        self.log_lines = log_lines;

        if running {
            self.sink.on_log_update(&self.log_lines);
            return;
        }

        // Final lines usually carry the summary; deliver them before the verdict.
        if changed && !self.log_lines.is_empty() {
            self.sink.on_log_update(&self.log_lines);
        }
        let result = result.unwrap_or_else(|| TerminalResult::failure(NO_RESULT_MESSAGE));
        self.terminate(result);
    }

    pub fn on_check_failed(&mut self, generation: Generation, error: TransportCheckError) {
        if !self.is_current(generation) || !self.is_running() {
            return;
        }
        self.consecutive_check_failures += 1;
        watch_warn!(
            target: LIFECYCLE_TARGET,
            "Status check for {} failed ({} in a row): {}",
            generation,
            self.consecutive_check_failures,
            error
        );
        self.sink.on_transport_error(&error);

        if let Some(limit) = self.settings.max_consecutive_check_failures {
            if self.consecutive_check_failures >= limit.get() {
                let message = format!(
                    "job status unreachable after {} consecutive failed checks",
                    limit
                );
                self.terminate(TerminalResult::failure(message));
            }
        }
    }

    /// Stops any active poller. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.release_poll_handle();
        if let LifecycleState::Submitting { .. } = self.state {
            self.state = LifecycleState::Idle;
        }
        self.disposed = true;
        watch_debug!(target: LIFECYCLE_TARGET, "Controller disposed at {}", self.generation);
    }

    pub fn state(&self) -> &LifecycleState<P::Handle> {
        &self.state
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn log_lines(&self) -> &[String] {
        &self.log_lines
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn view(&self) -> LifecycleView {
        LifecycleView {
            phase: self.state.phase(),
            generation: self.generation,
            log_lines: self.log_lines.clone(),
            outcome: self.state.outcome().cloned(),
            consecutive_check_failures: self.consecutive_check_failures,
            disposed: self.disposed,
        }
    }

    pub fn submitter(&self) -> &J {
        &self.submitter
    }

    pub fn poller(&self) -> &P {
        &self.poller
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn is_current(&self, generation: Generation) -> bool {
        if self.disposed || generation != self.generation {
            watch_debug!(
                target: LIFECYCLE_TARGET,
                "Discarding message for stale run {} (current {}, disposed={})",
                generation,
                self.generation,
                self.disposed
            );
            return false;
        }
        true
    }

    fn is_running(&self) -> bool {
        matches!(self.state, LifecycleState::Running(_))
    }

    /// Cancels the poll handle if there is one. Leaves `Idle` behind in that case.
    fn release_poll_handle(&mut self) {
        match std::mem::replace(&mut self.state, LifecycleState::Idle) {
            LifecycleState::Running(handle) => self.poller.cancel(handle),
            other => self.state = other,
        }
    }

    fn terminate(&mut self, result: TerminalResult) {
        self.release_poll_handle();
        watch_info!(
            target: LIFECYCLE_TARGET,
            "Run {} finished: {:?}",
            self.generation,
            result
        );
        self.state = LifecycleState::Terminated(result.clone());
        match result {
            TerminalResult::Success {
                total_items,
                artifact_handle,
            } => self.sink.on_success(total_items, &artifact_handle),
            TerminalResult::Failure { message } => self.sink.on_failure(&message),
        }
    }
}

// Dropping the controller counts as disposal: no timer outlives its owner.
impl<J, P, S> Drop for LifecycleController<J, P, S>
where
    P: StatusPoller,
{
    fn drop(&mut self) {
        if let LifecycleState::Running(handle) =
            std::mem::replace(&mut self.state, LifecycleState::Idle)
        {
            self.poller.cancel(handle);
        }
    }
}
