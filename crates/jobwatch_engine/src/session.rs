use std::sync::Arc;
use std::time::Duration;

use jobwatch_core::{ControllerSettings, JobRequest, LifecycleController, Msg, ResultSink};
use jobwatch_logging::{watch_debug, watch_warn, LIFECYCLE_TARGET};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::client::JobService;
use crate::poller::IntervalPoller;
use crate::submitter::SpawningSubmitter;

enum SessionCommand {
    Start(JobRequest),
    Dispose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("job session has shut down")]
pub struct SessionClosed;

#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    /// Must be non-zero.
    pub poll_interval: Duration,
    pub controller: ControllerSettings,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            controller: ControllerSettings::default(),
        }
    }
}

/// Command surface of a running session. Cheap to clone.
///
/// The session shuts down on [`SessionHandle::dispose`] or once every handle is dropped.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    cmd_tx: mpsc::UnboundedSender<SessionCommand>,
}

impl std::fmt::Debug for SessionCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionCommand::Start(request) => f.debug_tuple("Start").field(request).finish(),
            SessionCommand::Dispose => f.write_str("Dispose"),
        }
    }
}

impl SessionHandle {
    /// Starts a new run, superseding whatever is active.
    pub fn start(&self, request: JobRequest) -> Result<(), SessionClosed> {
        self.cmd_tx
            .send(SessionCommand::Start(request))
            .map_err(|_| SessionClosed)
    }

    /// Idempotent; a closed session is already disposed.
    pub fn dispose(&self) {
        let _ = self.cmd_tx.send(SessionCommand::Dispose);
    }

    pub fn is_closed(&self) -> bool {
        self.cmd_tx.is_closed()
    }
}

/// Spawns the task owning the lifecycle controller. Must be called inside a tokio runtime.
///
/// Commands, submission results and poll results are all drained by that one
/// task, so the controller never sees concurrent calls.
pub fn spawn_session<S>(
    service: Arc<dyn JobService>,
    settings: SessionSettings,
    sink: S,
) -> (SessionHandle, JoinHandle<()>)
where
    S: ResultSink + Send + 'static,
{
    let runtime = tokio::runtime::Handle::current();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (msg_tx, msg_rx) = mpsc::unbounded_channel();

    let submitter = SpawningSubmitter::new(service.clone(), runtime.clone(), msg_tx.clone());
    let poller = IntervalPoller::new(service, runtime.clone(), msg_tx, settings.poll_interval);
    let controller = LifecycleController::new(submitter, poller, sink, settings.controller);

    let task = runtime.spawn(run_session(controller, cmd_rx, msg_rx));
    (SessionHandle { cmd_tx }, task)
}

async fn run_session<S>(
    mut controller: LifecycleController<SpawningSubmitter, IntervalPoller, S>,
    mut cmd_rx: mpsc::UnboundedReceiver<SessionCommand>,
    mut msg_rx: mpsc::UnboundedReceiver<Msg>,
) where
    S: ResultSink,
{
    loop {
        let msg = tokio::select! {
            biased;
            cmd = cmd_rx.recv() => match cmd {
                Some(SessionCommand::Start(request)) => Msg::Start(request),
                Some(SessionCommand::Dispose) | None => Msg::Dispose,
            },
            Some(msg) = msg_rx.recv() => msg,
        };

        let disposing = matches!(msg, Msg::Dispose);
        if let Err(err) = controller.update(msg) {
            watch_warn!(target: LIFECYCLE_TARGET, "Session command refused: {}", err);
        }
        if disposing {
            break;
        }
    }
    watch_debug!(
        target: LIFECYCLE_TARGET,
        "Session stopped at run {}",
        controller.generation()
    );
}
