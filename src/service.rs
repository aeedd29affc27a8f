//! Client for the remote IDCTS analysis service.
//!
//! The workflow only needs two calls, captured by [`AnalysisService`] so the
//! controller can be driven by something other than HTTP in tests.
//! [`HttpAnalysisService`] is the reqwest implementation and also exposes the
//! service's read-only endpoints (`/health`, `/history`, `/stats`).

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::future::Future;
use tracing::debug;
use url::Url;

use crate::config::ServiceConfig;
use crate::error::AnalysisError;
use crate::evidence::RawFile;
use crate::merge::join_base;
use crate::model::{FileAnalysisResult, HealthStatus, HistoryRecord, PrimaryAnalysisResult};

pub const ANALYZE_PATH: &str = "/analyze";
pub const ANALYZE_HAR_PATH: &str = "/analyze-har";
pub const HEALTH_PATH: &str = "/health";
pub const HISTORY_PATH: &str = "/history";
pub const STATS_PATH: &str = "/stats";

/// Multipart field name the service expects the HAR file under.
pub const HAR_FIELD_NAME: &str = "file";

/// Content type sent for a traffic log without a usable one of its own.
pub const TRAFFIC_LOG_FALLBACK_MIME: &str = "application/json";

/// The two calls the workflow makes. Each is attempted exactly once.
pub trait AnalysisService: Send + Sync + 'static {
    fn analyze_url(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<PrimaryAnalysisResult, AnalysisError>> + Send;

    fn analyze_traffic_log(
        &self,
        file: &RawFile,
    ) -> impl Future<Output = Result<FileAnalysisResult, AnalysisError>> + Send;
}

/// FastAPI-style error body: `{"detail": "..."}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

pub struct HttpAnalysisService {
    client: Client,
    base_address: String,
}

impl HttpAnalysisService {
    pub fn new(config: &ServiceConfig) -> Result<Self, AnalysisError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self::with_client(client, &config.base_address))
    }

    pub fn with_client(client: Client, base_address: &str) -> Self {
        Self {
            client,
            base_address: base_address.trim().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_address(&self) -> &str {
        &self.base_address
    }

    fn endpoint(&self, path: &str) -> Result<Url, AnalysisError> {
        let joined = join_base(&self.base_address, path);
        Url::parse(&joined).map_err(|e| AnalysisError::InvalidEndpoint {
            url: joined.clone(),
            error: e.to_string(),
        })
    }

    /// `GET /health`
    pub async fn health(&self) -> Result<HealthStatus, AnalysisError> {
        let url = self.endpoint(HEALTH_PATH)?;
        let response = self.client.get(url).send().await?;
        decode(response).await
    }

    /// `GET /history?limit=N`, most recent first.
    pub async fn history(&self, limit: usize) -> Result<Vec<HistoryRecord>, AnalysisError> {
        let mut url = self.endpoint(HISTORY_PATH)?;
        url.query_pairs_mut().append_pair("limit", &limit.to_string());
        let response = self.client.get(url).send().await?;
        decode(response).await
    }

    /// `GET /stats`; the schema is owned by the service.
    pub async fn stats(&self) -> Result<serde_json::Value, AnalysisError> {
        let url = self.endpoint(STATS_PATH)?;
        let response = self.client.get(url).send().await?;
        decode(response).await
    }
}

impl AnalysisService for HttpAnalysisService {
    async fn analyze_url(&self, url: &str) -> Result<PrimaryAnalysisResult, AnalysisError> {
        let endpoint = self.endpoint(ANALYZE_PATH)?;
        debug!("POST {} for {}", endpoint, url);

        let response = self
            .client
            .post(endpoint)
            .json(&serde_json::json!({ "url": url }))
            .send()
            .await?;

        decode(response).await
    }

    async fn analyze_traffic_log(&self, file: &RawFile) -> Result<FileAnalysisResult, AnalysisError> {
        let endpoint = self.endpoint(ANALYZE_HAR_PATH)?;
        debug!("POST {} with {} ({} bytes)", endpoint, file.name, file.bytes.len());

        let form = Form::new().part(HAR_FIELD_NAME, traffic_log_part(file)?);

        let response = self.client.post(endpoint).multipart(form).send().await?;

        decode(response).await
    }
}

/// Multipart part for a traffic log. A blank or unparseable content type is
/// replaced by [`TRAFFIC_LOG_FALLBACK_MIME`].
fn traffic_log_part(file: &RawFile) -> Result<Part, AnalysisError> {
    let part = || Part::bytes(file.bytes.clone()).file_name(file.name.clone());
    let declared = file
        .content_type
        .as_deref()
        .map(str::trim)
        .filter(|ct| !ct.is_empty());

    if let Some(content_type) = declared {
        match part().mime_str(content_type) {
            Ok(part) => return Ok(part),
            Err(e) => debug!(
                "Ignoring content type '{}' of {}: {}",
                content_type, file.name, e
            ),
        }
    }
    Ok(part().mime_str(TRAFFIC_LOG_FALLBACK_MIME)?)
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, AnalysisError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(AnalysisError::Status {
            status,
            detail: error_detail(&body),
        });
    }

    Ok(serde_json::from_str(&body)?)
}

/// Pull a human-readable message out of an error body, if there is one.
fn error_detail(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s),
        // Validation errors come back as a list of {loc, msg, type}.
        serde_json::Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join("; "))
            }
        }
        _ => None,
    }
}
