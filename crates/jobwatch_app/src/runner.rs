use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use jobwatch_core::JobRequest;
use jobwatch_engine::{
    safe_artifact_filename, spawn_session, AtomicFileWriter, JobService, SessionSettings,
};
use jobwatch_logging::{watch_info, watch_warn};

use crate::sink::{RunOutcome, TerminalSink};

/// Runs one job to completion, printing progress to `out`.
///
/// `interrupt` resolving first disposes the session and returns an error.
pub async fn run_job<W, F>(
    service: Arc<dyn JobService>,
    settings: SessionSettings,
    request: JobRequest,
    out: W,
    interrupt: F,
) -> Result<RunOutcome>
where
    W: Write + Send + 'static,
    F: Future<Output = ()>,
{
    let (sink, mut outcome_rx) = TerminalSink::new(out);
    let (session, task) = spawn_session(service, settings, sink);
    session.start(request).context("starting job session")?;

    let outcome = tokio::select! {
        outcome = outcome_rx.recv() => outcome,
        () = interrupt => {
            watch_warn!("Interrupted, abandoning the running job");
            session.dispose();
            task.await.context("job session task")?;
            bail!("interrupted");
        }
    };

    session.dispose();
    task.await.context("job session task")?;
    outcome.context("job session ended without an outcome")
}

/// Downloads `handle` into `output_dir` under a sanitized name.
pub async fn download_artifact(
    service: &dyn JobService,
    output_dir: &Path,
    handle: &str,
) -> Result<PathBuf> {
    let bytes = service
        .fetch_artifact(handle)
        .await
        .with_context(|| format!("downloading artifact {handle:?}"))?;

    let writer = AtomicFileWriter::new(output_dir.to_path_buf());
    let path = writer
        .write(&safe_artifact_filename(handle), &bytes)
        .with_context(|| format!("saving artifact into {}", output_dir.display()))?;
    watch_info!("Saved {} bytes to {:?}", bytes.len(), path);
    Ok(path)
}
