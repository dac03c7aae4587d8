//! JSON shapes spoken by the scraping service, and their mapping onto core types.
//!
//! Field names follow the service (`search_url`, `logs`, `total_jobs`, `file`,
//! `detail`); the camelCase names of the abstract contract are accepted as aliases.

use jobwatch_core::{JobRequest, StatusSnapshot, SubmissionError, TerminalResult};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
pub(crate) struct StartJobBody<'a> {
    search_url: &'a str,
    max_pages: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    cookie_text: Option<&'a str>,
}

impl<'a> From<&'a JobRequest> for StartJobBody<'a> {
    fn from(request: &'a JobRequest) -> Self {
        Self {
            search_url: request.query(),
            max_pages: request.page_limit(),
            cookie_text: request.credential_blob(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct StartJobReply {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    accepted: Option<bool>,
    #[serde(default, alias = "errorDetail", alias = "error_detail")]
    detail: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusReply {
    running: bool,
    #[serde(default, alias = "logLines", alias = "log_lines")]
    logs: Vec<String>,
    #[serde(default)]
    result: Option<ResultReply>,
}

#[derive(Debug, Deserialize)]
struct ResultReply {
    status: String,
    #[serde(default, alias = "totalItems", alias = "total_items")]
    total_jobs: Option<u64>,
    #[serde(default, alias = "artifactHandle", alias = "artifact_handle")]
    file: Option<String>,
    #[serde(default, alias = "errorDetail", alias = "error_detail")]
    detail: Option<Value>,
}

impl From<StatusReply> for StatusSnapshot {
    fn from(reply: StatusReply) -> Self {
        StatusSnapshot {
            running: reply.running,
            log_lines: reply.logs,
            result: reply.result.map(ResultReply::into_terminal),
        }
    }
}

impl ResultReply {
    fn into_terminal(self) -> TerminalResult {
        match self.status.as_str() {
            "ok" => match self.file.filter(|file| !file.trim().is_empty()) {
                Some(file) => TerminalResult::success(self.total_jobs.unwrap_or(0), file),
                None => TerminalResult::failure("result missing artifact handle"),
            },
            "error" => TerminalResult::failure(
                detail_text(self.detail.as_ref()).unwrap_or_else(|| "job failed".to_string()),
            ),
            other => TerminalResult::failure(format!("unexpected result status: {other}")),
        }
    }
}

/// Classifies the reply to a start request.
pub(crate) fn start_outcome(status: StatusCode, body: &[u8]) -> Result<(), SubmissionError> {
    if !status.is_success() {
        let detail = serde_json::from_slice::<StartJobReply>(body)
            .ok()
            .and_then(|reply| detail_text(reply.detail.as_ref()))
            .unwrap_or_else(|| status.to_string());
        return Err(SubmissionError::ServerRejected(detail));
    }

    let reply: StartJobReply = serde_json::from_slice(body)
        .map_err(|err| SubmissionError::MalformedResponse(err.to_string()))?;
    let accepted = match (reply.accepted, reply.status.as_deref()) {
        (Some(accepted), _) => accepted,
        (None, Some(status)) => {
            status.eq_ignore_ascii_case("started") || status.eq_ignore_ascii_case("ok")
        }
        (None, None) => {
            return Err(SubmissionError::MalformedResponse(
                "reply has neither `accepted` nor `status`".to_string(),
            ))
        }
    };

    if accepted {
        Ok(())
    } else {
        Err(SubmissionError::ServerRejected(
            detail_text(reply.detail.as_ref()).unwrap_or_else(|| "job rejected".to_string()),
        ))
    }
}

// Validation errors arrive as structured `detail` arrays; keep them readable.
fn detail_text(detail: Option<&Value>) -> Option<String> {
    match detail? {
        Value::Null => None,
        Value::String(text) if text.trim().is_empty() => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(json: &str) -> StatusSnapshot {
        serde_json::from_str::<StatusReply>(json)
            .expect("valid status")
            .into()
    }

    #[test]
    fn running_status_keeps_log_order() {
        let snapshot = status(r#"{"running": true, "logs": ["Starting scrape...", "PAGE 1"], "result": null}"#);
        assert_eq!(snapshot, StatusSnapshot::in_progress(["Starting scrape...", "PAGE 1"]));
    }

    #[test]
    fn ok_result_maps_to_success() {
        let snapshot = status(
            r#"{"running": false, "logs": [], "result": {"status": "ok", "total_jobs": 42, "file": "f.csv"}}"#,
        );
        assert_eq!(snapshot.result, Some(TerminalResult::success(42, "f.csv")));
        assert!(!snapshot.running);
    }

    #[test]
    fn camel_case_aliases_are_accepted() {
        let snapshot = status(
            r#"{"running": false, "logLines": ["x"], "result": {"status": "ok", "totalItems": 7, "artifactHandle": "a.csv"}}"#,
        );
        assert_eq!(snapshot.log_lines, vec!["x".to_string()]);
        assert_eq!(snapshot.result, Some(TerminalResult::success(7, "a.csv")));
    }

    #[test]
    fn error_result_carries_detail() {
        let snapshot = status(
            r#"{"running": false, "logs": ["ERROR: boom"], "result": {"status": "error", "detail": "boom"}}"#,
        );
        assert_eq!(snapshot.result, Some(TerminalResult::failure("boom")));
    }

    #[test]
    fn odd_results_become_failures() {
        let missing_file = status(r#"{"running": false, "result": {"status": "ok", "total_jobs": 1}}"#);
        assert_eq!(
            missing_file.result,
            Some(TerminalResult::failure("result missing artifact handle"))
        );

        let unknown = status(r#"{"running": false, "result": {"status": "paused"}}"#);
        assert_eq!(
            unknown.result,
            Some(TerminalResult::failure("unexpected result status: paused"))
        );

        let bare_error = status(r#"{"running": false, "result": {"status": "error"}}"#);
        assert_eq!(bare_error.result, Some(TerminalResult::failure("job failed")));
    }

    #[test]
    fn start_reply_variants() {
        assert_eq!(start_outcome(StatusCode::OK, br#"{"status": "started"}"#), Ok(()));
        assert_eq!(start_outcome(StatusCode::OK, br#"{"accepted": true}"#), Ok(()));
        assert_eq!(
            start_outcome(
                StatusCode::OK,
                br#"{"accepted": false, "errorDetail": "rate limited"}"#
            ),
            Err(SubmissionError::ServerRejected("rate limited".to_string()))
        );
        assert_eq!(
            start_outcome(StatusCode::CONFLICT, br#"{"detail": "A scrape is already running"}"#),
            Err(SubmissionError::ServerRejected(
                "A scrape is already running".to_string()
            ))
        );
        assert!(matches!(
            start_outcome(StatusCode::OK, b"<html>"),
            Err(SubmissionError::MalformedResponse(_))
        ));
        assert!(matches!(
            start_outcome(StatusCode::OK, b"{}"),
            Err(SubmissionError::MalformedResponse(_))
        ));
    }

    #[test]
    fn rejection_without_body_uses_status_text() {
        assert_eq!(
            start_outcome(StatusCode::SERVICE_UNAVAILABLE, b""),
            Err(SubmissionError::ServerRejected(
                "503 Service Unavailable".to_string()
            ))
        );
    }

    #[test]
    fn start_body_skips_missing_cookies() {
        let request = JobRequest::new("https://example.com/search", 3);
        let body = serde_json::to_value(StartJobBody::from(&request)).expect("serialize");
        assert_eq!(
            body,
            serde_json::json!({"search_url": "https://example.com/search", "max_pages": 3})
        );

        let request = request.with_credentials("cookie");
        let body = serde_json::to_value(StartJobBody::from(&request)).expect("serialize");
        assert_eq!(body["cookie_text"], "cookie");
    }
}
