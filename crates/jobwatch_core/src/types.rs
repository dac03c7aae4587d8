use std::fmt;
use std::ops::RangeInclusive;

use thiserror::Error;

/// Page limits the scraping service accepts.
pub const PAGE_LIMIT_RANGE: RangeInclusive<u32> = 1..=50;

/// Page limit used when the caller does not choose one.
pub const DEFAULT_PAGE_LIMIT: u32 = 50;

/// Tag distinguishing one lifecycle run from every run before it.
///
/// `Generation::default()` is the "nothing started yet" value; every call to
/// `start` moves the controller to the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Parameters of one job submission. Immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct JobRequest {
    query: String,
    page_limit: u32,
    credential_blob: Option<String>,
}

impl JobRequest {
    /// Range checks on `page_limit` belong to the caller.
    pub fn new(query: impl Into<String>, page_limit: u32) -> Self {
        Self {
            query: query.into(),
            page_limit,
            credential_blob: None,
        }
    }

    pub fn with_credentials(mut self, blob: impl Into<String>) -> Self {
        self.credential_blob = Some(blob.into());
        self
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn page_limit(&self) -> u32 {
        self.page_limit
    }

    pub fn credential_blob(&self) -> Option<&str> {
        self.credential_blob.as_deref()
    }
}

// Cookie blobs end up in log lines through `{:?}`; keep them out.
impl fmt::Debug for JobRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobRequest")
            .field("query", &self.query)
            .field("page_limit", &self.page_limit)
            .field(
                "credential_blob",
                &self.credential_blob.as_ref().map(|blob| format!("<{} bytes>", blob.len())),
            )
            .finish()
    }
}

/// Final payload that ends a lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalResult {
    Success {
        total_items: u64,
        artifact_handle: String,
    },
    Failure {
        message: String,
    },
}

impl TerminalResult {
    pub fn success(total_items: u64, artifact_handle: impl Into<String>) -> Self {
        TerminalResult::Success {
            total_items,
            artifact_handle: artifact_handle.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        TerminalResult::Failure {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TerminalResult::Success { .. })
    }
}

/// One server-reported view of the job. `log_lines` is the full cumulative list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusSnapshot {
    pub running: bool,
    pub log_lines: Vec<String>,
    pub result: Option<TerminalResult>,
}

impl StatusSnapshot {
    pub fn in_progress<I, L>(log_lines: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        Self {
            running: true,
            log_lines: log_lines.into_iter().map(Into::into).collect(),
            result: None,
        }
    }

    pub fn finished<I, L>(log_lines: I, result: Option<TerminalResult>) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        Self {
            running: false,
            log_lines: log_lines.into_iter().map(Into::into).collect(),
            result,
        }
    }
}

/// Why a submission never turned into a running job. Fatal to that run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("network error: {0}")]
    Network(String),
    /// Displays the server's detail verbatim so it can be shown as-is.
    #[error("{0}")]
    ServerRejected(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// A single failed status check. Never fatal on its own.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportCheckError {
    #[error("network error: {0}")]
    Network(String),
    #[error("http status {0}")]
    HttpStatus(u16),
    #[error("malformed status: {0}")]
    Malformed(String),
}
