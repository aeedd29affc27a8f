//! Payloads returned by the IDCTS analysis service.
//!
//! The service's response schema is authoritative. Only the fields the portal
//! reads are typed; everything else is kept in `extra` and re-emitted verbatim
//! when a result is serialized.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Result of `POST /analyze` for a target URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrimaryAnalysisResult {
    #[serde(default)]
    pub case_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_recommendation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_cdn: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domain_list: Vec<String>,
    /// Relative path of the evidence package, e.g. `/download/IDCTS-....zip`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Classification data, WHOIS info, takedown priority and anything else.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Result of `POST /analyze-har` for one traffic-log file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileAnalysisResult {
    #[serde(default)]
    pub total_requests: u64,
    /// Distinct domains observed in the capture.
    #[serde(default)]
    pub domains: Vec<String>,
    /// The analysed site serves the content itself instead of embedding it.
    #[serde(default)]
    pub is_streaming_provider: bool,
    #[serde(default)]
    pub confidence: String,
    #[serde(default)]
    pub summary: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `GET /health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// One row of `GET /history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub case_id: String,
    pub target_url: String,
    #[serde(default)]
    pub detected_cdn: Option<String>,
    #[serde(default)]
    pub domain_count: usize,
    #[serde(default)]
    pub risk_score: Option<u32>,
    #[serde(default)]
    pub risk_level: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
