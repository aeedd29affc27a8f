//! Client-side workflow coordinator for the IDCTS content-analysis portal.
//!
//! A user hands over a target URL and optionally HAR captures or screenshots.
//! [`AnalysisController`] runs the URL analysis against the remote service,
//! analyses every HAR file on the side, merges whatever has arrived into one
//! [`CombinedResult`] and publishes a [`WorkflowState`] with advisory progress.

pub mod config;
pub mod controller;
pub mod error;
pub mod evidence;
pub mod logging;
pub mod merge;
pub mod model;
pub mod progress;
pub mod service;
pub mod state;

pub use config::{ConfigError, PortalConfig};
pub use controller::AnalysisController;
pub use error::AnalysisError;
pub use evidence::{EvidenceFile, EvidenceKind, FileEvidenceManager, RawFile};
pub use merge::{merge, CombinedResult};
pub use model::{FileAnalysisResult, PrimaryAnalysisResult};
pub use progress::{ProgressCheckpoint, ProgressSimulator};
pub use service::{AnalysisService, HttpAnalysisService};
pub use state::{Phase, WorkflowState};
