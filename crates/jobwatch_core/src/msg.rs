use crate::{Generation, JobRequest, StatusSnapshot, SubmissionError, TransportCheckError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User asked for a new run, superseding any active one.
    Start(JobRequest),
    /// Remote acceptance call finished.
    SubmissionResolved {
        generation: Generation,
        result: Result<(), SubmissionError>,
    },
    /// A status check returned a snapshot.
    SnapshotReceived {
        generation: Generation,
        snapshot: StatusSnapshot,
    },
    /// A status check failed at the transport level.
    CheckFailed {
        generation: Generation,
        error: TransportCheckError,
    },
    /// Owner is going away; stop everything.
    Dispose,
}
