//! Operation model for backend background jobs
//!
//! The dashboard backend runs long jobs (saving a date range of demands to the
//! database, for instance) in the background and hands out an identifier. The
//! status endpoint for that identifier answers with a JSON body such as:
//!
//! ```json
//! { "status": "running", "message": "Saving demands", "progress": "40/100",
//!   "details": { "processed": 40, "saved": 38, "errors": 2, "duration": 12.5 } }
//! ```
//!
//! [`OperationStatus`] is the parsed form of that body. Synthetic statuses are
//! produced by the poller itself when it cannot ask about the job or gives up
//! waiting; [`StatusOrigin`] tells the two apart.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a backend background job
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationHandle(String);

impl OperationHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for OperationHandle {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for OperationHandle {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// State of a job at one poll instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl OperationState {
    /// Parse a state string as sent by the backend (case-insensitive)
    ///
    /// Returns `None` for values outside the four known states.
    pub fn from_wire(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Parse a state string, mapping unrecognized values to `Running`
    pub fn parse_lenient(value: &str) -> Self {
        Self::from_wire(value).unwrap_or(Self::Running)
    }

    /// Completed and failed end polling
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a status snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusOrigin {
    /// Parsed from a status endpoint response
    Backend,
    /// Produced by the poller because the status request itself failed
    Transport,
    /// Produced by the poller because the attempt limit was reached
    AttemptsExhausted,
}

/// Structured counters reported by the backend once a job is under way
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<u64>,
    /// Elapsed time in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

/// Snapshot of a job's state at one poll instant
///
/// Deserializes from the status endpoint body (`status`, `details`) and from
/// its own serialized form (`reported_state`, `detail`, `origin`), so printed
/// JSON can be read back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StatusBody")]
pub struct OperationStatus {
    pub state: OperationState,
    /// State string exactly as reported; differs from `state` for unknown values
    pub reported_state: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<OperationDetail>,
    pub origin: StatusOrigin,
}

/// Raw status body; `state` is ignored and re-derived from the reported text
#[derive(Deserialize)]
struct StatusBody {
    #[serde(alias = "reported_state")]
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    progress: Option<serde_json::Value>,
    #[serde(default, alias = "detail")]
    details: Option<OperationDetail>,
    #[serde(default)]
    origin: Option<StatusOrigin>,
}

impl From<StatusBody> for OperationStatus {
    fn from(body: StatusBody) -> Self {
        let progress = body.progress.and_then(|value| match value {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s),
            other => Some(other.to_string()),
        });

        Self {
            state: OperationState::parse_lenient(&body.status),
            reported_state: body.status,
            message: body.message.unwrap_or_default(),
            progress,
            detail: body.details,
            origin: body.origin.unwrap_or(StatusOrigin::Backend),
        }
    }
}

impl OperationStatus {
    /// Build a backend status from a state string and message
    pub fn new(reported_state: impl Into<String>, message: impl Into<String>) -> Self {
        let reported_state = reported_state.into();
        Self {
            state: OperationState::parse_lenient(&reported_state),
            reported_state,
            message: message.into(),
            progress: None,
            detail: None,
            origin: StatusOrigin::Backend,
        }
    }

    pub fn with_progress(mut self, progress: impl Into<String>) -> Self {
        self.progress = Some(progress.into());
        self
    }

    pub fn with_detail(mut self, detail: OperationDetail) -> Self {
        self.detail = Some(detail);
        self
    }

    /// Synthetic failure for a status request that could not be completed
    pub fn transport_failure(error: &dyn fmt::Display) -> Self {
        Self {
            state: OperationState::Failed,
            reported_state: OperationState::Failed.as_str().to_string(),
            message: format!("Transport error while checking status: {}", error),
            progress: None,
            detail: None,
            origin: StatusOrigin::Transport,
        }
    }

    /// Synthetic failure after `attempts` polls without a terminal state
    ///
    /// Progress and counters of the last backend snapshot are carried over.
    pub fn attempts_exhausted(attempts: u32, last: &OperationStatus) -> Self {
        Self {
            state: OperationState::Failed,
            reported_state: OperationState::Failed.as_str().to_string(),
            message: format!(
                "Timed out: no terminal state after {} status checks (last state: {})",
                attempts, last.reported_state
            ),
            progress: last.progress.clone(),
            detail: last.detail.clone(),
            origin: StatusOrigin::AttemptsExhausted,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// False when the backend sent a state outside the known set
    pub fn is_recognized_state(&self) -> bool {
        OperationState::from_wire(&self.reported_state).is_some()
    }

    /// True for statuses produced by the poller rather than the backend
    pub fn is_synthetic(&self) -> bool {
        self.origin != StatusOrigin::Backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_state_parsing() {
        assert_eq!(OperationState::from_wire("pending"), Some(OperationState::Pending));
        assert_eq!(OperationState::from_wire("RUNNING"), Some(OperationState::Running));
        assert_eq!(
            OperationState::from_wire(" Completed "),
            Some(OperationState::Completed)
        );
        assert_eq!(OperationState::from_wire("failed"), Some(OperationState::Failed));
        assert_eq!(OperationState::from_wire("fetching"), None);
        assert_eq!(OperationState::parse_lenient("queued"), OperationState::Running);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!OperationState::Pending.is_terminal());
        assert!(!OperationState::Running.is_terminal());
        assert!(OperationState::Completed.is_terminal());
        assert!(OperationState::Failed.is_terminal());
    }

    #[test]
    fn test_parse_full_body() {
        let status: OperationStatus = serde_json::from_value(json!({
            "status": "running",
            "message": "Saving demands",
            "progress": "40/100",
            "details": {"processed": 40, "saved": 38, "errors": 2, "duration": 12.5}
        }))
        .unwrap();

        assert_eq!(status.state, OperationState::Running);
        assert_eq!(status.message, "Saving demands");
        assert_eq!(status.progress.as_deref(), Some("40/100"));
        assert_eq!(
            status.detail,
            Some(OperationDetail {
                processed: Some(40),
                saved: Some(38),
                errors: Some(2),
                duration: Some(12.5),
            })
        );
        assert_eq!(status.origin, StatusOrigin::Backend);
        assert!(status.is_recognized_state());
    }

    #[test]
    fn test_parse_minimal_body() {
        let status: OperationStatus =
            serde_json::from_value(json!({"status": "pending", "message": null})).unwrap();

        assert_eq!(status.state, OperationState::Pending);
        assert_eq!(status.message, "");
        assert!(status.progress.is_none());
        assert!(status.detail.is_none());
    }

    #[test]
    fn test_numeric_progress_is_rendered_as_text() {
        let status: OperationStatus =
            serde_json::from_value(json!({"status": "running", "progress": 75})).unwrap();
        assert_eq!(status.progress.as_deref(), Some("75"));
    }

    #[test]
    fn test_unknown_state_is_running_but_remembered() {
        let status: OperationStatus =
            serde_json::from_value(json!({"status": "fetching", "extra": true})).unwrap();

        assert_eq!(status.state, OperationState::Running);
        assert_eq!(status.reported_state, "fetching");
        assert!(!status.is_recognized_state());
        assert!(!status.is_terminal());
    }

    #[test]
    fn test_missing_status_field_is_rejected() {
        let result = serde_json::from_value::<OperationStatus>(json!({"message": "hi"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_transport_failure_status() {
        let status = OperationStatus::transport_failure(&"connection refused");
        assert_eq!(status.state, OperationState::Failed);
        assert_eq!(status.origin, StatusOrigin::Transport);
        assert!(status.message.contains("Transport error"));
        assert!(status.message.contains("connection refused"));
        assert!(status.is_synthetic());
    }

    #[test]
    fn test_attempts_exhausted_keeps_last_progress() {
        let last = OperationStatus::new("running", "Saving")
            .with_progress("10/50")
            .with_detail(OperationDetail {
                processed: Some(10),
                ..Default::default()
            });
        let status = OperationStatus::attempts_exhausted(3, &last);

        assert_eq!(status.state, OperationState::Failed);
        assert_eq!(status.origin, StatusOrigin::AttemptsExhausted);
        assert!(status.message.contains("3 status checks"));
        assert_eq!(status.progress.as_deref(), Some("10/50"));
        assert_eq!(status.detail.and_then(|d| d.processed), Some(10));
    }

    #[test]
    fn test_serialize_output_shape() {
        let status = OperationStatus::new("completed", "Done");
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(
            value,
            json!({
                "state": "completed",
                "reported_state": "completed",
                "message": "Done",
                "origin": "backend"
            })
        );
    }

    #[test]
    fn test_printed_status_reads_back() {
        let backend = OperationStatus::new("fetching", "Reading demands")
            .with_progress("3/9")
            .with_detail(OperationDetail {
                saved: Some(3),
                ..Default::default()
            });
        let exhausted = OperationStatus::attempts_exhausted(4, &backend);
        let transport = OperationStatus::transport_failure(&"connection reset");

        for status in [backend, exhausted, transport] {
            let printed = serde_json::to_value(&status).unwrap();
            let read_back: OperationStatus = serde_json::from_value(printed).unwrap();
            assert_eq!(read_back, status);
        }
    }

    #[test]
    fn test_handle_display() {
        let handle = OperationHandle::new("job-42");
        assert_eq!(handle.to_string(), "job-42");
        assert_eq!(handle.as_str(), "job-42");
        assert_eq!(OperationHandle::from("job-42"), handle);
    }
}
