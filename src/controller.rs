//! The analysis workflow state machine.
//!
//! Three things complete asynchronously during a run: the primary URL analysis,
//! any number of traffic-log analyses, and the advisory progress ticks. They all
//! land in [`Session`] through the same mutex and each one checks that what it is
//! about to update is still live (same run, file still tracked) before touching
//! it. The lock is never held across an `.await`.
//!
//! Calling [`AnalysisController::start`] while a run is in flight supersedes that
//! run: its progress stops immediately and its result is dropped when it arrives.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, PortalConfig};
use crate::error::AnalysisError;
use crate::evidence::{EvidenceFile, EvidenceId, FileEvidenceManager, RawFile};
use crate::merge::{merge, merge_existing};
use crate::model::{FileAnalysisResult, PrimaryAnalysisResult};
use crate::progress::{ProgressCheckpoint, ProgressHandle, ProgressSimulator};
use crate::service::{AnalysisService, HttpAnalysisService};
use crate::state::{Phase, WorkflowState};

/// Monotonic run counter; bumped by every `start` and `reset`.
type RunId = u64;

struct Session {
    state: WorkflowState,
    run: RunId,
    progress: Option<ProgressHandle>,
    evidence: FileEvidenceManager,
}

impl Session {
    fn stop_progress(&mut self) {
        if let Some(mut handle) = self.progress.take() {
            handle.cancel();
        }
    }

    fn is_current(&self, run: RunId) -> bool {
        self.run == run && self.state.is_running()
    }

    /// Re-merge the published result against the current evidence set.
    fn refresh_result(&mut self) -> bool {
        if self.state.phase() != Phase::Succeeded {
            return false;
        }
        match merge_existing(self.state.result(), self.evidence.contributing_analysis()) {
            Some(merged) if Some(&merged) != self.state.result() => self.state.replace_result(merged),
            _ => false,
        }
    }
}

struct Shared<S> {
    service: S,
    base_address: String,
    simulator: ProgressSimulator,
    display_delay: Duration,
    session: Mutex<Session>,
    state_tx: watch::Sender<WorkflowState>,
}

impl<S: AnalysisService> Shared<S> {
    fn publish(&self, session: &Session) {
        self.state_tx.send_replace(session.state.clone());
    }

    fn apply_checkpoint(&self, run: RunId, checkpoint: ProgressCheckpoint) {
        let mut session = self.session.lock();
        if session.run != run {
            return;
        }
        if session.state.advance(&checkpoint) {
            debug!("Progress {}% - {}", checkpoint.percent, checkpoint.label);
            self.publish(&session);
        }
    }

    async fn complete_run(&self, run: RunId, outcome: Result<PrimaryAnalysisResult, AnalysisError>) {
        let primary = {
            let mut session = self.session.lock();
            if !session.is_current(run) {
                debug!("Discarding primary result of superseded run {}", run);
                return;
            }

            // Stopping the ticks and leaving the tick-accepting state happen
            // under the same lock, so no checkpoint can land afterwards.
            session.stop_progress();
            match outcome {
                Ok(primary) => {
                    session.state.finish_progress();
                    self.publish(&session);
                    Arc::new(primary)
                }
                Err(err) => {
                    warn!("Analysis run {} failed: {}", run, err);
                    session.state.fail(err.user_message());
                    self.publish(&session);
                    return;
                }
            }
        };

        if !self.display_delay.is_zero() {
            tokio::time::sleep(self.display_delay).await;
        }

        let mut session = self.session.lock();
        if !session.is_current(run) {
            debug!("Run {} was reset before its result was shown", run);
            return;
        }
        let combined = merge(&primary, session.evidence.contributing_analysis());
        info!(
            "Analysis run {} succeeded: case {} (risk score {:?}, traffic log attached: {})",
            run,
            combined.case_id(),
            combined.risk_score(),
            combined.file_analysis().is_some()
        );
        session.state.succeed(combined);
        self.publish(&session);
    }

    fn complete_file(
        &self,
        id: EvidenceId,
        name: &str,
        outcome: Result<FileAnalysisResult, AnalysisError>,
    ) {
        let analysis = match outcome {
            Ok(analysis) => Arc::new(analysis),
            Err(err) => {
                // Never surfaced: the file simply stays unanalysed.
                warn!("Traffic log analysis failed for {}: {}", name, err);
                return;
            }
        };

        let mut session = self.session.lock();
        if !session.evidence.attach(id, analysis) {
            debug!("Discarding traffic log analysis for {}: file no longer tracked", name);
            return;
        }
        info!("Traffic log {} analysed", name);
        if session.refresh_result() {
            debug!("Published result re-merged with traffic log {}", name);
            self.publish(&session);
        }
    }
}

/// Drives one analysis session. Cheap to clone; clones share the session.
///
/// Every method that starts remote work spawns onto the current tokio runtime.
pub struct AnalysisController<S> {
    shared: Arc<Shared<S>>,
}

impl<S> Clone for AnalysisController<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl AnalysisController<HttpAnalysisService> {
    /// Controller talking to the HTTP service described by `config`.
    pub fn from_config(config: &PortalConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let service = HttpAnalysisService::new(&config.service)?;
        Ok(Self::new(service, config)?)
    }
}

impl<S: AnalysisService> AnalysisController<S> {
    pub fn new(service: S, config: &PortalConfig) -> Result<Self, ConfigError> {
        let simulator = ProgressSimulator::new(config.workflow.progress_interval())?;
        Ok(Self::with_simulator(
            service,
            &config.service.base_address,
            simulator,
            config.workflow.display_delay(),
        ))
    }

    pub fn with_simulator(
        service: S,
        base_address: &str,
        simulator: ProgressSimulator,
        display_delay: Duration,
    ) -> Self {
        let initial = WorkflowState::idle();
        let (state_tx, _) = watch::channel(initial.clone());
        Self {
            shared: Arc::new(Shared {
                service,
                base_address: base_address.trim().to_string(),
                simulator,
                display_delay,
                session: Mutex::new(Session {
                    state: initial,
                    run: 0,
                    progress: None,
                    evidence: FileEvidenceManager::new(),
                }),
                state_tx,
            }),
        }
    }

    /// Begin analysing `url`. The state is `Running` (or `Failed`, for a blank
    /// URL) by the time this returns.
    pub fn start(&self, url: &str) {
        let target = url.trim().to_string();
        let shared = &self.shared;

        let mut session = shared.session.lock();
        session.run += 1;
        let run = session.run;
        session.stop_progress();

        if target.is_empty() {
            warn!("Rejected analysis request with an empty URL");
            session.state.fail(AnalysisError::EmptyUrl.user_message());
            shared.publish(&session);
            return;
        }

        info!("Starting analysis run {} for {}", run, target);
        session.state.begin_run();
        let weak = Arc::downgrade(shared);
        session.progress = Some(shared.simulator.start(move |checkpoint| {
            if let Some(shared) = weak.upgrade() {
                shared.apply_checkpoint(run, checkpoint);
            }
        }));
        shared.publish(&session);
        drop(session);

        let shared = Arc::clone(shared);
        tokio::spawn(async move {
            let outcome = shared.service.analyze_url(&target).await;
            shared.complete_run(run, outcome).await;
        });
    }

    /// Back to `Idle`: clears the result, error, progress and every evidence
    /// file. Anything still in flight is discarded when it comes back.
    pub fn reset(&self) {
        let mut session = self.shared.session.lock();
        session.run += 1;
        session.stop_progress();
        session.evidence.clear();
        session.state.reset();
        info!("Workflow reset");
        self.shared.publish(&session);
    }

    /// Track eligible files and start analysing each traffic log right away.
    pub fn accept_files(&self, files: Vec<RawFile>) -> Vec<EvidenceFile> {
        let submitted = files.len();
        let (accepted, jobs) = self.shared.session.lock().evidence.accept(files);
        if accepted.len() < submitted {
            debug!("Ignored {} unsupported file(s)", submitted - accepted.len());
        }

        for job in jobs {
            let shared = Arc::clone(&self.shared);
            tokio::spawn(async move {
                let outcome = shared.service.analyze_traffic_log(&job.file).await;
                shared.complete_file(job.id, &job.file.name, outcome);
            });
        }

        accepted
    }

    /// Drop the file at `index` along with its contribution to the result.
    pub fn remove_file(&self, index: usize) -> Option<EvidenceFile> {
        let mut session = self.shared.session.lock();
        let removed = session.evidence.remove(index)?;
        debug!("Removed evidence file {}", removed.name);
        if removed.is_analyzed() && session.refresh_result() {
            self.shared.publish(&session);
        }
        Some(removed)
    }

    pub fn state(&self) -> WorkflowState {
        self.shared.session.lock().state.clone()
    }

    /// Every published state, starting from the current one.
    pub fn subscribe(&self) -> watch::Receiver<WorkflowState> {
        self.shared.state_tx.subscribe()
    }

    pub fn evidence_files(&self) -> Vec<EvidenceFile> {
        self.shared.session.lock().evidence.files().to_vec()
    }

    /// Evidence-package link for the current result.
    pub fn download_link(&self) -> Option<String> {
        let session = self.shared.session.lock();
        session
            .state
            .result()
            .and_then(|result| result.download_link(&self.shared.base_address))
    }

    pub fn base_address(&self) -> &str {
        &self.shared.base_address
    }
}
