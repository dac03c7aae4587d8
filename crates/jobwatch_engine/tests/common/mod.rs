#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, Once};
use std::time::Duration;

use jobwatch_core::{
    JobRequest, ResultSink, StatusSnapshot, SubmissionError, TransportCheckError,
};
use jobwatch_engine::{ArtifactError, JobService};
use tokio::sync::mpsc;
use tokio::time::Instant;

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(jobwatch_logging::initialize_for_tests);
}

/// In-memory job service replaying a fixed script of status replies.
pub struct ScriptedService {
    start_result: Result<(), SubmissionError>,
    statuses: Mutex<VecDeque<Result<StatusSnapshot, TransportCheckError>>>,
    delays: Mutex<VecDeque<Duration>>,
    start_calls: AtomicUsize,
    status_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    call_times: Mutex<Vec<Instant>>,
}

impl ScriptedService {
    pub fn new(statuses: Vec<Result<StatusSnapshot, TransportCheckError>>) -> Self {
        Self {
            start_result: Ok(()),
            statuses: Mutex::new(statuses.into()),
            delays: Mutex::new(VecDeque::new()),
            start_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            call_times: Mutex::new(Vec::new()),
        }
    }

    /// Reports `running: true` with no lines forever.
    pub fn running_forever() -> Self {
        Self::new(Vec::new())
    }

    pub fn rejecting(error: SubmissionError) -> Self {
        Self {
            start_result: Err(error),
            ..Self::running_forever()
        }
    }

    /// Per-call delays for status checks, consumed in order.
    pub fn with_delays(self, delays: Vec<Duration>) -> Self {
        *self.delays.lock().unwrap() = delays.into();
        self
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.call_times.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl JobService for ScriptedService {
    async fn start_job(&self, _request: &JobRequest) -> Result<(), SubmissionError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        self.start_result.clone()
    }

    async fn fetch_status(&self) -> Result<StatusSnapshot, TransportCheckError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.call_times.lock().unwrap().push(Instant::now());
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

        let delay = self.delays.lock().unwrap().pop_front();
        if let Some(delay) = delay.filter(|d| !d.is_zero()) {
            tokio::time::sleep(delay).await;
        }

        let reply = {
            let mut statuses = self.statuses.lock().unwrap();
            if statuses.len() > 1 {
                statuses.pop_front()
            } else {
                statuses.front().cloned()
            }
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        reply.unwrap_or_else(|| Ok(StatusSnapshot::in_progress(Vec::<String>::new())))
    }

    async fn fetch_artifact(&self, handle: &str) -> Result<Vec<u8>, ArtifactError> {
        Ok(format!("artifact:{handle}").into_bytes())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Logs(Vec<String>),
    Success(u64, String),
    Failure(String),
    CheckFailed(TransportCheckError),
}

pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SinkEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SinkEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ResultSink for ChannelSink {
    fn on_log_update(&mut self, lines: &[String]) {
        let _ = self.tx.send(SinkEvent::Logs(lines.to_vec()));
    }

    fn on_success(&mut self, total_items: u64, artifact_handle: &str) {
        let _ = self
            .tx
            .send(SinkEvent::Success(total_items, artifact_handle.to_string()));
    }

    fn on_failure(&mut self, message: &str) {
        let _ = self.tx.send(SinkEvent::Failure(message.to_string()));
    }

    fn on_transport_error(&mut self, error: &TransportCheckError) {
        let _ = self.tx.send(SinkEvent::CheckFailed(error.clone()));
    }
}

pub async fn next_event(rx: &mut mpsc::UnboundedReceiver<SinkEvent>) -> SinkEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("sink event within timeout")
        .expect("sink channel open")
}
