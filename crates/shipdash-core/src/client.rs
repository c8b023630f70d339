//! HTTP client for the dashboard backend
//!
//! Endpoints used:
//!
//! | Method | Path                              | Purpose                       |
//! |--------|-----------------------------------|-------------------------------|
//! | GET    | `/api/health`                     | liveness check                |
//! | POST   | `/api/save-to-db`                 | start a save-to-database job  |
//! | GET    | `/api/save-to-db/status/{job_id}` | status of a background job    |

use crate::error::{CoreError, Result};
use crate::operation::{OperationHandle, OperationStatus};
use crate::poller::StatusFetcher;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

/// User agent string for shipdash HTTP requests
const USER_AGENT: &str = concat!("shipdash/", env!("CARGO_PKG_VERSION"));

const HEALTH_PATH: &str = "/api/health";
const SAVE_PATH: &str = "/api/save-to-db";

/// Date range and filters for a save-to-database job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

impl SaveRequest {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            project: None,
            channel: None,
        }
    }

    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.start_date > self.end_date {
            return Err(CoreError::Validation(format!(
                "start date {} is after end date {}",
                self.start_date, self.end_date
            )));
        }
        Ok(())
    }
}

/// Body of the health endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

/// Client for the dashboard backend
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    api_token: Option<String>,
    http: reqwest::Client,
}

impl BackendClient {
    /// Create a client for the backend at `base_url`
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: None,
            http,
        })
    }

    /// Send `Authorization: Bearer <token>` with every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check that the backend is up
    pub async fn health(&self) -> Result<HealthStatus> {
        let response = self.request(reqwest::Method::GET, HEALTH_PATH).send().await?;
        Self::decode(response).await
    }

    /// Start a save-to-database job and return its handle
    pub async fn submit_save(&self, request: &SaveRequest) -> Result<OperationHandle> {
        request.validate()?;
        debug!(
            start_date = %request.start_date,
            end_date = %request.end_date,
            "Submitting save-to-db job"
        );

        let response = self
            .request(reqwest::Method::POST, SAVE_PATH)
            .json(request)
            .send()
            .await?;
        let body: Value = Self::decode(response).await?;

        extract_job_id(&body).ok_or_else(|| {
            CoreError::Decode(format!("no job id in submission response: {}", body))
        })
    }

    /// Fetch the current status of a job
    pub async fn get_status(&self, handle: &OperationHandle) -> Result<OperationStatus> {
        let path = format!(
            "{}/status/{}",
            SAVE_PATH,
            urlencoding::encode(handle.as_str())
        );
        let response = self.request(reqwest::Method::GET, &path).send().await?;
        Self::decode(response).await
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        trace!("Backend request: {} {}", method, url);
        let builder = self.http.request(method, url);
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Err(CoreError::Http {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).trim().to_string(),
            });
        }

        serde_json::from_slice(&bytes).map_err(|e| CoreError::Decode(e.to_string()))
    }
}

#[async_trait]
impl StatusFetcher for BackendClient {
    async fn fetch_status(&self, handle: &OperationHandle) -> Result<OperationStatus> {
        self.get_status(handle).await
    }
}

/// Job id from a submission response (`job_id`, `task_id` or `id`; string or number)
fn extract_job_id(body: &Value) -> Option<OperationHandle> {
    ["job_id", "task_id", "id"]
        .iter()
        .filter_map(|key| body.get(*key))
        .find_map(|value| match value {
            Value::String(s) if !s.is_empty() => Some(OperationHandle::new(s.as_str())),
            Value::Number(n) => Some(OperationHandle::new(n.to_string())),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_save_request_serialization() {
        let request = SaveRequest::new(date("2024-03-01"), date("2024-03-31")).project("Retail");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({"start_date": "2024-03-01", "end_date": "2024-03-31", "project": "Retail"})
        );
    }

    #[test]
    fn test_save_request_validation() {
        assert!(SaveRequest::new(date("2024-03-01"), date("2024-03-01")).validate().is_ok());

        let err = SaveRequest::new(date("2024-03-02"), date("2024-03-01"))
            .validate()
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_extract_job_id_variants() {
        assert_eq!(
            extract_job_id(&json!({"job_id": "abc"})),
            Some(OperationHandle::new("abc"))
        );
        assert_eq!(
            extract_job_id(&json!({"task_id": 17})),
            Some(OperationHandle::new("17"))
        );
        assert_eq!(
            extract_job_id(&json!({"id": "x", "status": "started"})),
            Some(OperationHandle::new("x"))
        );
        assert_eq!(extract_job_id(&json!({"job_id": ""})), None);
        assert_eq!(extract_job_id(&json!({"status": "started"})), None);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = BackendClient::new("http://localhost:8000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_health_status_is_ok() {
        assert!(HealthStatus { status: "ok".to_string() }.is_ok());
        assert!(HealthStatus { status: "OK".to_string() }.is_ok());
        assert!(!HealthStatus { status: "degraded".to_string() }.is_ok());
    }
}
