//! The observable workflow state and the only transitions allowed on it.

use serde::Serialize;

use crate::merge::CombinedResult;
use crate::progress::{ProgressCheckpoint, COMPLETE_LABEL, COMPLETE_PERCENT, INITIAL_LABEL};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Running,
    Succeeded,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Succeeded | Phase::Failed)
    }
}

/// `error_message` is set only in `Failed`, `result` only in `Succeeded`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowState {
    phase: Phase,
    progress_percent: u8,
    progress_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<CombinedResult>,
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self::idle()
    }
}

impl WorkflowState {
    pub fn idle() -> Self {
        Self {
            phase: Phase::Idle,
            progress_percent: 0,
            progress_label: String::new(),
            error_message: None,
            result: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress_percent
    }

    pub fn progress_label(&self) -> &str {
        &self.progress_label
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn result(&self) -> Option<&CombinedResult> {
        self.result.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    /// Enter `Running` from any phase with progress back at zero.
    pub(crate) fn begin_run(&mut self) {
        self.phase = Phase::Running;
        self.progress_percent = 0;
        self.progress_label = INITIAL_LABEL.to_string();
        self.error_message = None;
        self.result = None;
    }

    /// Apply an advisory checkpoint. Ignored outside `Running`, for anything
    /// that would move progress backwards, and for the terminal percentage.
    pub(crate) fn advance(&mut self, checkpoint: &ProgressCheckpoint) -> bool {
        if self.phase != Phase::Running
            || checkpoint.percent >= COMPLETE_PERCENT
            || checkpoint.percent <= self.progress_percent
        {
            return false;
        }
        self.progress_percent = checkpoint.percent;
        self.progress_label = checkpoint.label.clone();
        true
    }

    /// The real request resolved; show 100% while the result is held back.
    pub(crate) fn finish_progress(&mut self) {
        self.progress_percent = COMPLETE_PERCENT;
        self.progress_label = COMPLETE_LABEL.to_string();
    }

    pub(crate) fn succeed(&mut self, result: CombinedResult) {
        self.finish_progress();
        self.phase = Phase::Succeeded;
        self.error_message = None;
        self.result = Some(result);
    }

    pub(crate) fn fail(&mut self, message: String) {
        self.phase = Phase::Failed;
        self.error_message = Some(message);
        self.result = None;
    }

    /// Swap in a re-merged result. Only meaningful once `Succeeded`.
    pub(crate) fn replace_result(&mut self, result: CombinedResult) -> bool {
        if self.phase != Phase::Succeeded {
            return false;
        }
        self.result = Some(result);
        true
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::idle();
    }
}
