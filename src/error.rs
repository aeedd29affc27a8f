//! Error types for the analysis workflow.
//!
//! Validation and transport failures both end up as the single user-facing
//! `error_message` on [`crate::state::WorkflowState`]; traffic-log analysis
//! failures never reach the workflow and are only logged.

use reqwest::StatusCode;
use thiserror::Error;

/// Message shown when the service failed without explaining why.
pub const GENERIC_FAILURE_MESSAGE: &str = "Analysis failed. Please try again later.";

/// Message shown when the user submits a blank URL.
pub const EMPTY_URL_MESSAGE: &str = "Please enter a URL to analyze.";

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("URL is empty")]
    EmptyUrl,

    #[error("Request to analysis service failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Analysis service returned HTTP {status}")]
    Status {
        status: StatusCode,
        /// `detail` field of the service's error body, when it sent one.
        detail: Option<String>,
    },

    #[error("Failed to decode analysis service response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid endpoint URL '{url}': {error}")]
    InvalidEndpoint { url: String, error: String },
}

impl AnalysisError {
    /// The text placed in `error_message` when this error ends a run.
    pub fn user_message(&self) -> String {
        match self {
            AnalysisError::EmptyUrl => EMPTY_URL_MESSAGE.to_string(),
            AnalysisError::Status { detail: Some(detail), .. } if !detail.trim().is_empty() => {
                detail.clone()
            }
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AnalysisError::EmptyUrl)
    }
}
