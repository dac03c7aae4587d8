use std::sync::Arc;
use std::time::Duration;

use jobwatch_core::{Generation, Msg, StatusPoller};
use jobwatch_logging::{watch_debug, watch_trace, LIFECYCLE_TARGET};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::client::JobService;

/// Floor applied to the configured cadence; `tokio::time::interval` rejects zero.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Recurring status checker: one tokio task per started generation.
pub struct IntervalPoller {
    service: Arc<dyn JobService>,
    runtime: tokio::runtime::Handle,
    msg_tx: UnboundedSender<Msg>,
    interval: Duration,
}

impl IntervalPoller {
    pub fn new(
        service: Arc<dyn JobService>,
        runtime: tokio::runtime::Handle,
        msg_tx: UnboundedSender<Msg>,
        interval: Duration,
    ) -> Self {
        Self {
            service,
            runtime,
            msg_tx,
            interval: interval.max(MIN_POLL_INTERVAL),
        }
    }
}

impl StatusPoller for IntervalPoller {
    type Handle = PollHandle;

    fn start(&mut self, generation: Generation) -> PollHandle {
        let token = CancellationToken::new();
        let task = self.runtime.spawn(poll_loop(
            self.service.clone(),
            self.interval,
            generation,
            token.clone(),
            self.msg_tx.clone(),
        ));
        PollHandle {
            generation,
            token,
            task,
        }
    }

    fn cancel(&mut self, handle: PollHandle) {
        handle.cancel();
    }
}

/// Right to stop one poll task. Dropping it stops the task as well.
#[derive(Debug)]
pub struct PollHandle {
    generation: Generation,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Idempotent.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            watch_debug!(target: LIFECYCLE_TARGET, "Cancelling poller {}", self.generation);
        }
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn poll_loop(
    service: Arc<dyn JobService>,
    period: Duration,
    generation: Generation,
    token: CancellationToken,
    msg_tx: UnboundedSender<Msg>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_check_done: Option<Instant> = None;

    loop {
        let deadline = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            deadline = ticker.tick() => deadline,
        };

        // `Skip` still hands out the first tick that came due during a slow
        // check, late. Such a tick is dropped, not run.
        if last_check_done.is_some_and(|done| deadline < done) {
            watch_trace!(
                target: LIFECYCLE_TARGET,
                "Poller {} dropping a tick that came due during a slow check",
                generation
            );
            continue;
        }

        watch_trace!(target: LIFECYCLE_TARGET, "Status check for {}", generation);
        // Not raced against cancellation: a late answer is dropped by generation.
        let msg = match service.fetch_status().await {
            Ok(snapshot) => Msg::SnapshotReceived {
                generation,
                snapshot,
            },
            Err(error) => Msg::CheckFailed { generation, error },
        };
        last_check_done = Some(Instant::now());
        if msg_tx.send(msg).is_err() {
            break;
        }
    }

    watch_debug!(target: LIFECYCLE_TARGET, "Poller {} stopped", generation);
}
