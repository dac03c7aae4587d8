//! Optional RON config file, overridden by command-line flags.

use std::fs;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;

use jobwatch_core::ControllerSettings;
use jobwatch_engine::{ServiceSettings, SessionSettings};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::GlobalArgs;

pub const DEFAULT_CONFIG_FILENAME: &str = "jobwatch.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub output_dir: PathBuf,
    pub poll_interval_ms: u64,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_artifact_bytes: u64,
    /// `None` or `Some(0)` keeps polling through any number of failed checks.
    pub max_check_failures: Option<u32>,
    pub log_to_file: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        let service = ServiceSettings::default();
        Self {
            base_url: service.base_url,
            output_dir: PathBuf::from("output"),
            poll_interval_ms: 1_000,
            connect_timeout_secs: service.connect_timeout.as_secs(),
            request_timeout_secs: service.request_timeout.as_secs(),
            max_artifact_bytes: service.max_artifact_bytes,
            max_check_failures: None,
            log_to_file: false,
        }
    }
}

impl AppConfig {
    /// `explicit`, else `./jobwatch.ron` if it exists, else nothing.
    pub fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
        match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILENAME);
                fallback.is_file().then_some(fallback)
            }
        }
    }

    /// Loads the file picked by [`AppConfig::resolve_path`], or the defaults.
    ///
    /// A missing default file is not an error; a missing explicit one is.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match Self::resolve_path(explicit) {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&content).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn from_ron(content: &str) -> Result<Self, String> {
        ron::from_str(content).map_err(|err| err.to_string())
    }

    pub fn to_ron(&self) -> Result<String, String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::new())
            .map_err(|err| err.to_string())
    }

    /// Flags given on the command line win over the file.
    pub fn apply_overrides(&mut self, args: &GlobalArgs) {
        if let Some(base_url) = &args.base_url {
            self.base_url = base_url.clone();
        }
        if let Some(output_dir) = &args.output_dir {
            self.output_dir = output_dir.clone();
        }
        if let Some(limit) = args.max_check_failures {
            self.max_check_failures = Some(limit);
        }
        if let Some(interval) = args.poll_interval {
            let interval: Duration = interval.into();
            self.poll_interval_ms = interval.as_millis().try_into().unwrap_or(u64::MAX);
        }
        if args.log_file {
            self.log_to_file = true;
        }
    }

    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            base_url: self.base_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_artifact_bytes: self.max_artifact_bytes,
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            controller: ControllerSettings {
                max_consecutive_check_failures: self
                    .max_check_failures
                    .and_then(NonZeroU32::new),
            },
        }
    }
}
