use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use jobwatch_core::{JobRequest, DEFAULT_PAGE_LIMIT, PAGE_LIMIT_RANGE};
use url::Url;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "jobwatch",
    version,
    about = "Submit a scraping job and follow it to completion"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Flags that override the config file for every subcommand.
#[derive(Debug, Args, Clone, Default)]
pub struct GlobalArgs {
    /// Base URL of the scraping service
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// RON config file (defaults to ./jobwatch.ron when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory downloaded artifacts are written to
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Give up after this many failed status checks in a row (0 = never)
    #[arg(long, global = true)]
    pub max_check_failures: Option<u32>,

    /// Time between status checks, e.g. "1s" or "500ms"
    #[arg(long, global = true)]
    pub poll_interval: Option<humantime::Duration>,

    /// Also write logs to ./jobwatch.log
    #[arg(long, global = true)]
    pub log_file: bool,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Start a job and poll it until it finishes
    Run(RunArgs),
    /// Fetch an artifact produced by an earlier run
    Download {
        /// Artifact handle reported by the service
        handle: String,
    },
}

#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// Search URL handed to the scraper
    #[arg(long, value_parser = parse_query)]
    pub query: String,

    /// Number of result pages to scrape (1-50)
    #[arg(long, default_value_t = DEFAULT_PAGE_LIMIT, value_parser = parse_pages)]
    pub pages: u32,

    /// Cookie export (Netscape format) forwarded to the service
    #[arg(long)]
    pub cookies: Option<PathBuf>,

    /// Do not download the artifact after a successful run
    #[arg(long)]
    pub no_download: bool,
}

impl RunArgs {
    /// Builds the request, reading the cookie file if one was given.
    pub fn to_request(&self) -> Result<JobRequest> {
        let request = JobRequest::new(self.query.clone(), self.pages);
        match &self.cookies {
            Some(path) => {
                let blob = fs::read_to_string(path)
                    .with_context(|| format!("reading cookie file {}", path.display()))?;
                Ok(request.with_credentials(blob))
            }
            None => Ok(request),
        }
    }
}

/// Accepts only absolute http(s) URLs with a host.
pub fn parse_query(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).map_err(|err| format!("invalid URL: {err}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err("URL has no host".to_string());
    }
    Ok(trimmed.to_string())
}

pub fn parse_pages(raw: &str) -> Result<u32, String> {
    let pages: u32 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{raw}' is not a page count"))?;
    if !PAGE_LIMIT_RANGE.contains(&pages) {
        return Err(format!(
            "page count must be between {} and {}",
            PAGE_LIMIT_RANGE.start(),
            PAGE_LIMIT_RANGE.end()
        ));
    }
    Ok(pages)
}
