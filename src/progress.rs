//! Advisory progress while the primary analysis is in flight.
//!
//! The simulator is purely time-driven: it walks a fixed list of checkpoints,
//! one per interval, and knows nothing about the request it decorates. It never
//! publishes 100; only the controller does that once the real result exists.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::{ConfigError, MIN_PROGRESS_INTERVAL_MS};

pub const INITIAL_LABEL: &str = "Preparing analysis";
pub const COMPLETE_LABEL: &str = "Analysis complete";
pub const COMPLETE_PERCENT: u8 = 100;

/// Fewer checkpoints than this make the advisory signal too coarse.
pub const MIN_CHECKPOINTS: usize = 7;

/// One step of the advisory progress signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressCheckpoint {
    pub percent: u8,
    pub label: String,
}

impl ProgressCheckpoint {
    pub fn new(percent: u8, label: impl Into<String>) -> Self {
        Self {
            percent,
            label: label.into(),
        }
    }
}

/// Mirrors the stages the analysis service runs through for one URL.
pub fn default_checkpoints() -> Vec<ProgressCheckpoint> {
    vec![
        ProgressCheckpoint::new(10, "Fetching target page"),
        ProgressCheckpoint::new(25, "Extracting embedded resources"),
        ProgressCheckpoint::new(40, "Classifying CDN providers"),
        ProgressCheckpoint::new(55, "Looking up WHOIS records"),
        ProgressCheckpoint::new(68, "Classifying content"),
        ProgressCheckpoint::new(80, "Calculating risk score"),
        ProgressCheckpoint::new(90, "Ranking takedown targets"),
        ProgressCheckpoint::new(95, "Generating evidence package"),
    ]
}

#[derive(Debug, Clone)]
pub struct ProgressSimulator {
    checkpoints: Arc<[ProgressCheckpoint]>,
    interval: Duration,
}

impl ProgressSimulator {
    pub fn new(interval: Duration) -> Result<Self, ConfigError> {
        Self::with_checkpoints(interval, default_checkpoints())
    }

    pub fn with_checkpoints(
        interval: Duration,
        checkpoints: Vec<ProgressCheckpoint>,
    ) -> Result<Self, ConfigError> {
        if interval < Duration::from_millis(MIN_PROGRESS_INTERVAL_MS) {
            return Err(ConfigError::IntervalTooShort(interval.as_millis() as u64));
        }
        validate_checkpoints(&checkpoints)?;
        Ok(Self {
            checkpoints: checkpoints.into(),
            interval,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn checkpoints(&self) -> &[ProgressCheckpoint] {
        &self.checkpoints
    }

    /// Start ticking on the current tokio runtime.
    ///
    /// `publish` is called once per interval with the next checkpoint until the
    /// list runs out or the returned handle is cancelled.
    pub fn start<F>(&self, publish: F) -> ProgressHandle
    where
        F: Fn(ProgressCheckpoint) + Send + Sync + 'static,
    {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let checkpoints = Arc::clone(&self.checkpoints);
        let interval = self.interval;

        let task = tokio::spawn(async move {
            for checkpoint in checkpoints.iter() {
                tokio::time::sleep(interval).await;
                if flag.load(Ordering::SeqCst) {
                    return;
                }
                publish(checkpoint.clone());
            }
            debug!("Progress checkpoints exhausted");
        });

        ProgressHandle {
            cancelled,
            task: Some(task),
        }
    }
}

fn validate_checkpoints(checkpoints: &[ProgressCheckpoint]) -> Result<(), ConfigError> {
    if checkpoints.len() < MIN_CHECKPOINTS {
        return Err(ConfigError::InvalidCheckpoints(format!(
            "need at least {} checkpoints, got {}",
            MIN_CHECKPOINTS,
            checkpoints.len()
        )));
    }
    for pair in checkpoints.windows(2) {
        if pair[1].percent <= pair[0].percent {
            return Err(ConfigError::InvalidCheckpoints(format!(
                "percent values must strictly increase ({} then {})",
                pair[0].percent, pair[1].percent
            )));
        }
    }
    if let Some(last) = checkpoints.last() {
        if last.percent >= COMPLETE_PERCENT {
            return Err(ConfigError::InvalidCheckpoints(format!(
                "checkpoints must stay below {}, got {}",
                COMPLETE_PERCENT, last.percent
            )));
        }
    }
    Ok(())
}

/// Stops a running simulator. Cancelling twice, or after exhaustion, is fine.
#[derive(Debug)]
pub struct ProgressHandle {
    cancelled: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl ProgressHandle {
    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Drop for ProgressHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
