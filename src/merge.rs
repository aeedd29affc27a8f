//! Combining the primary URL analysis with a traffic-log analysis.
//!
//! Merging is pure: inputs are shared by `Arc` and never mutated, so a late
//! traffic-log result is applied by merging again and replacing the published
//! record rather than patching it.

use serde::Serialize;
use std::sync::Arc;

use crate::model::{FileAnalysisResult, PrimaryAnalysisResult};

/// Name of the field the traffic-log analysis is attached under.
pub const FILE_ANALYSIS_FIELD: &str = "har_analysis";

/// The primary result plus, when available, one traffic-log analysis.
///
/// Serializes as the primary payload with an extra `har_analysis` field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedResult {
    #[serde(flatten)]
    primary: Arc<PrimaryAnalysisResult>,
    #[serde(rename = "har_analysis", skip_serializing_if = "Option::is_none")]
    file_analysis: Option<Arc<FileAnalysisResult>>,
}

impl CombinedResult {
    pub fn primary(&self) -> &PrimaryAnalysisResult {
        &self.primary
    }

    pub fn file_analysis(&self) -> Option<&FileAnalysisResult> {
        self.file_analysis.as_deref()
    }

    pub fn case_id(&self) -> &str {
        &self.primary.case_id
    }

    pub fn risk_score(&self) -> Option<u32> {
        self.primary.risk_score
    }

    /// Absolute link to the evidence package, if the service produced one.
    pub fn download_link(&self, base_address: &str) -> Option<String> {
        self.primary
            .download_url
            .as_deref()
            .map(|path| join_base(base_address, path))
    }
}

/// Anything a merge can start from: a fresh primary result or an earlier merge.
pub trait MergeBase {
    fn primary_arc(&self) -> &Arc<PrimaryAnalysisResult>;
}

impl MergeBase for Arc<PrimaryAnalysisResult> {
    fn primary_arc(&self) -> &Arc<PrimaryAnalysisResult> {
        self
    }
}

impl MergeBase for CombinedResult {
    fn primary_arc(&self) -> &Arc<PrimaryAnalysisResult> {
        &self.primary
    }
}

/// Attach `file_analysis` to `base`, replacing whatever was attached before.
pub fn merge<B: MergeBase + ?Sized>(
    base: &B,
    file_analysis: Option<&Arc<FileAnalysisResult>>,
) -> CombinedResult {
    CombinedResult {
        primary: Arc::clone(base.primary_arc()),
        file_analysis: file_analysis.cloned(),
    }
}

/// Re-merge an already published result. No-op when nothing was published.
pub fn merge_existing(
    existing: Option<&CombinedResult>,
    file_analysis: Option<&Arc<FileAnalysisResult>>,
) -> Option<CombinedResult> {
    existing.map(|combined| merge(combined, file_analysis))
}

/// Append a service-relative path to the base address.
///
/// The base may carry its own path prefix (e.g. behind a reverse proxy), so
/// this concatenates instead of using URL resolution, which would drop it.
pub fn join_base(base_address: &str, path: &str) -> String {
    let base = base_address.trim_end_matches('/');
    if path.is_empty() {
        return base.to_string();
    }
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primary() -> Arc<PrimaryAnalysisResult> {
        Arc::new(PrimaryAnalysisResult {
            case_id: "C-1".to_string(),
            risk_score: Some(85),
            download_url: Some("/x.zip".to_string()),
            ..Default::default()
        })
    }

    fn har(streaming: bool) -> Arc<FileAnalysisResult> {
        Arc::new(FileAnalysisResult {
            total_requests: 412,
            domains: vec!["cdn77.org".to_string(), "example.com".to_string()],
            is_streaming_provider: streaming,
            confidence: "HIGH".to_string(),
            summary: "Video segments served directly".to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_merge_without_file_analysis() {
        let combined = merge(&primary(), None);
        assert_eq!(combined.risk_score(), Some(85));
        assert!(combined.file_analysis().is_none());

        let json = serde_json::to_value(&combined).unwrap();
        assert!(json.get(FILE_ANALYSIS_FIELD).is_none());
        assert_eq!(json["case_id"], "C-1");
    }

    #[test]
    fn test_merge_attaches_file_analysis() {
        let file = har(true);
        let combined = merge(&primary(), Some(&file));

        let json = serde_json::to_value(&combined).unwrap();
        assert_eq!(json[FILE_ANALYSIS_FIELD]["is_streaming_provider"], true);
        assert_eq!(json["risk_score"], 85);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let p = primary();
        let f = har(true);
        let once = merge(&p, Some(&f));
        let twice = merge(&once, Some(&f));
        assert_eq!(once, twice);
        assert_eq!(merge(&p, Some(&f)), once);
    }

    #[test]
    fn test_merge_does_not_touch_inputs() {
        let p = primary();
        let before = (*p).clone();
        let _ = merge(&p, Some(&har(false)));
        assert_eq!(*p, before);
    }

    #[test]
    fn test_remerge_replaces_and_clears() {
        let with_file = merge(&primary(), Some(&har(true)));
        let cleared = merge(&with_file, None);
        assert!(cleared.file_analysis().is_none());

        let replaced = merge(&with_file, Some(&har(false)));
        assert_eq!(replaced.file_analysis().map(|f| f.is_streaming_provider), Some(false));
    }

    #[test]
    fn test_merge_existing_without_primary_is_noop() {
        assert!(merge_existing(None, Some(&har(true))).is_none());
    }

    #[test]
    fn test_download_link() {
        let combined = merge(&primary(), None);
        assert_eq!(
            combined.download_link("http://localhost:8000/").as_deref(),
            Some("http://localhost:8000/x.zip")
        );
        assert_eq!(
            join_base("https://portal.example.org/api", "download/a.zip"),
            "https://portal.example.org/api/download/a.zip"
        );
    }
}
