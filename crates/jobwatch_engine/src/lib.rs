//! Jobwatch engine: HTTP job service client, pollers and the session driver.
mod client;
mod filename;
mod persist;
mod poller;
mod session;
mod submitter;
mod wire;

pub use client::{ArtifactError, JobService, ReqwestJobService, ServiceError, ServiceSettings};
pub use filename::safe_artifact_filename;
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use poller::{IntervalPoller, PollHandle, MIN_POLL_INTERVAL};
pub use session::{spawn_session, SessionClosed, SessionHandle, SessionSettings};
pub use submitter::SpawningSubmitter;
