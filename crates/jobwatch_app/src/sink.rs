use std::io::Write;

use jobwatch_core::{ResultSink, TransportCheckError};
use jobwatch_logging::{watch_debug, watch_warn};
use tokio::sync::mpsc;

/// How a run ended, as seen by the terminal front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Succeeded {
        total_items: u64,
        artifact_handle: String,
    },
    Failed {
        message: String,
    },
}

/// Lines to print for a new server log list.
#[derive(Debug, PartialEq, Eq)]
pub enum LineDelta<'a> {
    /// The new list continues what was printed; only the tail is new.
    Append(&'a [String]),
    /// Nothing printed so far carries over into the new list.
    Reprint(&'a [String]),
}

/// The server keeps a bounded window of recent lines, so old lines fall off
/// the front. The longest tail of `printed` that starts `current` is the overlap.
pub fn line_delta<'a>(printed: &[String], current: &'a [String]) -> LineDelta<'a> {
    if printed.is_empty() || current.is_empty() {
        return LineDelta::Append(current);
    }
    (0..printed.len())
        .map(|start| &printed[start..])
        .find(|tail| current.starts_with(tail))
        .map(|tail| LineDelta::Append(&current[tail.len()..]))
        .unwrap_or(LineDelta::Reprint(current))
}

/// Writes job progress to a terminal and forwards the outcome over a channel.
pub struct TerminalSink<W> {
    out: W,
    printed: Vec<String>,
    check_failures: u32,
    outcome_tx: mpsc::UnboundedSender<RunOutcome>,
}

impl<W: Write> TerminalSink<W> {
    pub fn new(out: W) -> (Self, mpsc::UnboundedReceiver<RunOutcome>) {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        (
            Self {
                out,
                printed: Vec::new(),
                check_failures: 0,
                outcome_tx,
            },
            outcome_rx,
        )
    }

    /// Failed status checks seen during the run, for diagnostics.
    pub fn check_failures(&self) -> u32 {
        self.check_failures
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_lines<'a>(&mut self, lines: impl IntoIterator<Item = &'a String>) {
        for line in lines {
            if let Err(err) = writeln!(self.out, "{line}") {
                watch_warn!("Failed to write job output: {}", err);
                return;
            }
        }
        let _ = self.out.flush();
    }

    fn report(&mut self, outcome: RunOutcome) {
        // Nobody listening means the front end already gave up on this run.
        let _ = self.outcome_tx.send(outcome);
    }
}

impl<W: Write> ResultSink for TerminalSink<W> {
    fn on_log_update(&mut self, lines: &[String]) {
        match line_delta(&self.printed, lines) {
            LineDelta::Append(new_lines) => self.write_lines(new_lines),
            LineDelta::Reprint(all) => {
                self.write_lines(&["--- log restarted ---".to_string()]);
                self.write_lines(all);
            }
        }
        self.printed = lines.to_vec();
    }

    fn on_success(&mut self, total_items: u64, artifact_handle: &str) {
        self.write_lines(&[format!(
            "Finished: {total_items} items in {artifact_handle}"
        )]);
        self.report(RunOutcome::Succeeded {
            total_items,
            artifact_handle: artifact_handle.to_string(),
        });
    }

    fn on_failure(&mut self, message: &str) {
        self.write_lines(&[format!("Failed: {message}")]);
        self.report(RunOutcome::Failed {
            message: message.to_string(),
        });
    }

    fn on_transport_error(&mut self, error: &TransportCheckError) {
        // Kept off the job output; the controller already logs each failure.
        self.check_failures += 1;
        watch_debug!("Terminal sink saw failed status check: {}", error);
    }
}
