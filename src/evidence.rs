//! User-supplied evidence files: traffic logs (HAR) and screenshots.
//!
//! [`FileEvidenceManager`] is pure bookkeeping. Accepting a traffic log hands
//! back an [`AnalysisJob`]; the controller runs the job and reports the outcome
//! through [`FileEvidenceManager::attach`], which refuses results for files that
//! are no longer tracked.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::model::FileAnalysisResult;

/// File name suffix of a captured network-traffic log.
pub const TRAFFIC_LOG_EXTENSION: &str = ".har";

/// Content-type prefix accepted as a screenshot.
pub const IMAGE_CONTENT_TYPE_PREFIX: &str = "image/";

/// A file as handed over by the user, before classification.
#[derive(Clone, PartialEq, Eq)]
pub struct RawFile {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl RawFile {
    pub fn new(name: impl Into<String>, content_type: Option<&str>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.map(str::to_string),
            bytes,
        }
    }
}

impl fmt::Debug for RawFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawFile")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvidenceKind {
    TrafficLog,
    Image,
}

impl EvidenceKind {
    /// Classify by name suffix first, then by content type.
    pub fn classify(name: &str, content_type: Option<&str>) -> Option<Self> {
        if has_suffix_ignore_ascii_case(name, TRAFFIC_LOG_EXTENSION) {
            return Some(EvidenceKind::TrafficLog);
        }
        match content_type {
            Some(ct) if has_prefix_ignore_ascii_case(ct.trim_start(), IMAGE_CONTENT_TYPE_PREFIX) => {
                Some(EvidenceKind::Image)
            }
            _ => None,
        }
    }
}

fn has_suffix_ignore_ascii_case(name: &str, suffix: &str) -> bool {
    name.len() >= suffix.len()
        && name.is_char_boundary(name.len() - suffix.len())
        && name[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

fn has_prefix_ignore_ascii_case(value: &str, prefix: &str) -> bool {
    value.len() >= prefix.len()
        && value.is_char_boundary(prefix.len())
        && value[..prefix.len()].eq_ignore_ascii_case(prefix)
}

/// Session-unique identity of a tracked file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EvidenceId(u64);

#[derive(Debug, Clone, Serialize)]
pub struct EvidenceFile {
    pub id: EvidenceId,
    pub name: String,
    pub size_bytes: u64,
    pub kind: EvidenceKind,
    pub accepted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derived_analysis: Option<Arc<FileAnalysisResult>>,
}

impl EvidenceFile {
    pub fn is_analyzed(&self) -> bool {
        self.derived_analysis.is_some()
    }
}

/// A traffic-log upload waiting to be sent to the analysis service.
#[derive(Debug, Clone)]
pub struct AnalysisJob {
    pub id: EvidenceId,
    pub file: RawFile,
}

#[derive(Debug, Default)]
pub struct FileEvidenceManager {
    files: Vec<EvidenceFile>,
    next_id: u64,
}

impl FileEvidenceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append every eligible file, in order. Returns the accepted entries and one
    /// analysis job per accepted traffic log.
    pub fn accept(&mut self, files: Vec<RawFile>) -> (Vec<EvidenceFile>, Vec<AnalysisJob>) {
        let mut accepted = Vec::new();
        let mut jobs = Vec::new();

        for raw in files {
            let Some(kind) = EvidenceKind::classify(&raw.name, raw.content_type.as_deref()) else {
                continue;
            };

            let id = EvidenceId(self.next_id);
            self.next_id += 1;

            let entry = EvidenceFile {
                id,
                name: raw.name.clone(),
                size_bytes: raw.bytes.len() as u64,
                kind,
                accepted_at: Utc::now(),
                derived_analysis: None,
            };
            self.files.push(entry.clone());
            accepted.push(entry);

            if kind == EvidenceKind::TrafficLog {
                jobs.push(AnalysisJob { id, file: raw });
            }
        }

        (accepted, jobs)
    }

    /// Attach a finished analysis. Returns false if the file is gone.
    pub fn attach(&mut self, id: EvidenceId, analysis: Arc<FileAnalysisResult>) -> bool {
        match self.files.iter_mut().find(|f| f.id == id) {
            Some(file) => {
                file.derived_analysis = Some(analysis);
                true
            }
            None => false,
        }
    }

    /// Remove the file at `index`. Out-of-range indexes are ignored.
    pub fn remove(&mut self, index: usize) -> Option<EvidenceFile> {
        if index < self.files.len() {
            Some(self.files.remove(index))
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    /// The analysis that goes into the merged result: the one belonging to the
    /// most recently accepted analysed file, whatever order the calls finished in.
    pub fn contributing_analysis(&self) -> Option<&Arc<FileAnalysisResult>> {
        self.files
            .iter()
            .rev()
            .find_map(|f| f.derived_analysis.as_ref())
    }

    pub fn files(&self) -> &[EvidenceFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
