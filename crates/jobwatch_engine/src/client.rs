use std::time::Duration;

use futures_util::StreamExt;
use jobwatch_core::{JobRequest, StatusSnapshot, SubmissionError, TransportCheckError};
use jobwatch_logging::{watch_debug, watch_info};
use thiserror::Error;
use url::Url;

use crate::wire::{self, StartJobBody, StatusReply};

const START_PATH: &str = "scrape_start";
const STATUS_PATH: &str = "scrape_status";
const DOWNLOAD_PATH: &str = "download/";

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_artifact_bytes: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_artifact_bytes: 64 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("invalid base url {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("http client setup failed: {0}")]
    Client(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArtifactError {
    #[error("invalid artifact handle {0:?}")]
    InvalidHandle(String),
    #[error("http status {0}")]
    HttpStatus(u16),
    #[error("timeout")]
    Timeout,
    #[error("artifact too large (max {max_bytes}, actual {actual:?})")]
    TooLarge { max_bytes: u64, actual: Option<u64> },
    #[error("network error: {0}")]
    Network(String),
}

/// Boundary calls to the remote job-execution service.
#[async_trait::async_trait]
pub trait JobService: Send + Sync {
    async fn start_job(&self, request: &JobRequest) -> Result<(), SubmissionError>;

    async fn fetch_status(&self) -> Result<StatusSnapshot, TransportCheckError>;

    async fn fetch_artifact(&self, handle: &str) -> Result<Vec<u8>, ArtifactError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestJobService {
    settings: ServiceSettings,
    base: Url,
    client: reqwest::Client,
}

impl ReqwestJobService {
    pub fn new(settings: ServiceSettings) -> Result<Self, ServiceError> {
        let mut base = Url::parse(&settings.base_url).map_err(|err| ServiceError::InvalidBaseUrl {
            url: settings.base_url.clone(),
            reason: err.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(ServiceError::InvalidBaseUrl {
                url: settings.base_url.clone(),
                reason: "not a hierarchical url".to_string(),
            });
        }
        // Endpoints are joined relative to the base, which needs a trailing slash.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ServiceError::Client(err.to_string()))?;

        Ok(Self {
            settings,
            base,
            client,
        })
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    fn endpoint(&self, path: &str) -> Url {
        // Relative joins onto a hierarchical base cannot fail for these constant paths.
        self.base.join(path).unwrap_or_else(|_| self.base.clone())
    }

    fn artifact_url(&self, handle: &str) -> Result<Url, ArtifactError> {
        let trimmed = handle.trim();
        if trimmed.is_empty()
            || trimmed == "."
            || trimmed == ".."
            || trimmed.contains(['/', '\\'])
        {
            return Err(ArtifactError::InvalidHandle(handle.to_string()));
        }
        let mut url = self.endpoint(DOWNLOAD_PATH);
        url.path_segments_mut()
            .map_err(|_| ArtifactError::InvalidHandle(handle.to_string()))?
            .pop_if_empty()
            .push(trimmed);
        Ok(url)
    }
}

#[async_trait::async_trait]
impl JobService for ReqwestJobService {
    async fn start_job(&self, request: &JobRequest) -> Result<(), SubmissionError> {
        let url = self.endpoint(START_PATH);
        watch_info!("POST {} page_limit={}", url, request.page_limit());

        let response = self
            .client
            .post(url)
            .json(&StartJobBody::from(request))
            .send()
            .await
            .map_err(|err| SubmissionError::Network(describe_reqwest_error(&err)))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| SubmissionError::Network(describe_reqwest_error(&err)))?;
        wire::start_outcome(status, &body)
    }

    async fn fetch_status(&self) -> Result<StatusSnapshot, TransportCheckError> {
        let response = self
            .client
            .get(self.endpoint(STATUS_PATH))
            .send()
            .await
            .map_err(|err| TransportCheckError::Network(describe_reqwest_error(&err)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportCheckError::HttpStatus(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| TransportCheckError::Network(describe_reqwest_error(&err)))?;
        let reply: StatusReply = serde_json::from_slice(&body)
            .map_err(|err| TransportCheckError::Malformed(err.to_string()))?;
        Ok(reply.into())
    }

    async fn fetch_artifact(&self, handle: &str) -> Result<Vec<u8>, ArtifactError> {
        let url = self.artifact_url(handle)?;
        watch_info!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_artifact_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ArtifactError::HttpStatus(status.as_u16()));
        }

        let max_bytes = self.settings.max_artifact_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(ArtifactError::TooLarge {
                    max_bytes,
                    actual: Some(content_len),
                });
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_artifact_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(ArtifactError::TooLarge {
                    max_bytes,
                    actual: Some(next_len),
                });
            }
            bytes.extend_from_slice(&chunk);
        }
        watch_debug!("Artifact {} downloaded ({} bytes)", handle, bytes.len());
        Ok(bytes)
    }
}

fn describe_reqwest_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("timeout: {err}")
    } else {
        err.to_string()
    }
}

fn map_artifact_error(err: reqwest::Error) -> ArtifactError {
    if err.is_timeout() {
        return ArtifactError::Timeout;
    }
    ArtifactError::Network(err.to_string())
}
