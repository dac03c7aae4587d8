//! Jobwatch core: job lifecycle state machine and view-model helpers.
//!
//! Nothing in here performs IO. Submitters and pollers are reached through the
//! traits in [`ports`]; their answers come back as [`Msg`] values.
mod controller;
mod msg;
pub mod ports;
mod state;
mod types;
mod view_model;

pub use controller::{ControllerError, ControllerSettings, LifecycleController, NO_RESULT_MESSAGE};
pub use msg::Msg;
pub use ports::{JobSubmitter, ResultSink, StatusPoller};
pub use state::{LifecycleState, Phase};
pub use types::{
    Generation, JobRequest, StatusSnapshot, SubmissionError, TerminalResult, TransportCheckError,
    DEFAULT_PAGE_LIMIT, PAGE_LIMIT_RANGE,
};
pub use view_model::LifecycleView;
