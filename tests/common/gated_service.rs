//! In-memory analysis service whose calls stay pending until the test resolves
//! them, so every completion order can be exercised deterministically.

use idcts_portal::{AnalysisError, AnalysisService, FileAnalysisResult, PrimaryAnalysisResult, RawFile};
use parking_lot::Mutex;
use reqwest::StatusCode;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::oneshot;

pub type PrimaryOutcome = Result<PrimaryAnalysisResult, AnalysisError>;
pub type FileOutcome = Result<FileAnalysisResult, AnalysisError>;

#[derive(Default)]
struct Pending {
    primary: VecDeque<(String, oneshot::Sender<PrimaryOutcome>)>,
    files: Vec<(String, oneshot::Sender<FileOutcome>)>,
    primary_calls: usize,
    file_calls: usize,
}

/// Test-side handle to the calls a [`GatedService`] has received.
#[derive(Clone, Default)]
pub struct Gates {
    pending: Arc<Mutex<Pending>>,
}

pub struct GatedService {
    gates: Gates,
}

impl GatedService {
    pub fn new() -> (Self, Gates) {
        let gates = Gates::default();
        (
            Self {
                gates: gates.clone(),
            },
            gates,
        )
    }
}

impl AnalysisService for GatedService {
    fn analyze_url(&self, url: &str) -> impl Future<Output = PrimaryOutcome> + Send {
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.gates.pending.lock();
            pending.primary_calls += 1;
            pending.primary.push_back((url.to_string(), tx));
        }
        async move { rx.await.unwrap_or_else(|_| Err(abandoned())) }
    }

    fn analyze_traffic_log(&self, file: &RawFile) -> impl Future<Output = FileOutcome> + Send {
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.gates.pending.lock();
            pending.file_calls += 1;
            pending.files.push((file.name.clone(), tx));
        }
        async move { rx.await.unwrap_or_else(|_| Err(abandoned())) }
    }
}

fn abandoned() -> AnalysisError {
    AnalysisError::Status {
        status: StatusCode::SERVICE_UNAVAILABLE,
        detail: None,
    }
}

impl Gates {
    pub fn primary_calls(&self) -> usize {
        self.pending.lock().primary_calls
    }

    pub fn file_calls(&self) -> usize {
        self.pending.lock().file_calls
    }

    /// URLs of primary calls not resolved yet, oldest first.
    pub fn pending_urls(&self) -> Vec<String> {
        self.pending.lock().primary.iter().map(|(url, _)| url.clone()).collect()
    }

    /// Resolve the oldest pending primary call.
    pub fn resolve_primary(&self, outcome: PrimaryOutcome) {
        let (_, tx) = self
            .pending
            .lock()
            .primary
            .pop_front()
            .expect("no pending primary call");
        let _ = tx.send(outcome);
    }

    /// Resolve the pending traffic-log call for `name`.
    pub fn resolve_file(&self, name: &str, outcome: FileOutcome) {
        let tx = {
            let mut pending = self.pending.lock();
            let index = pending
                .files
                .iter()
                .position(|(file, _)| file == name)
                .unwrap_or_else(|| panic!("no pending traffic log call for {}", name));
            pending.files.remove(index).1
        };
        let _ = tx.send(outcome);
    }
}

pub fn primary(case_id: &str, risk_score: u32) -> PrimaryAnalysisResult {
    PrimaryAnalysisResult {
        case_id: case_id.to_string(),
        risk_score: Some(risk_score),
        download_url: Some(format!("/download/{}.zip", case_id)),
        ..Default::default()
    }
}

pub fn har_result(streaming: bool, total_requests: u64) -> FileAnalysisResult {
    FileAnalysisResult {
        total_requests,
        is_streaming_provider: streaming,
        confidence: "HIGH".to_string(),
        ..Default::default()
    }
}

pub fn har_file(name: &str) -> RawFile {
    RawFile::new(name, Some("application/json"), br#"{"log":{"entries":[]}}"#.to_vec())
}

pub fn screenshot(name: &str) -> RawFile {
    RawFile::new(name, Some("image/png"), vec![0x89, 0x50, 0x4e, 0x47])
}

pub fn server_error() -> AnalysisError {
    AnalysisError::Status {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        detail: None,
    }
}
