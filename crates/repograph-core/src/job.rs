//! Analysis job records and their lifecycle.
//!
//! Jobs progress linearly: Pending → Running → Completed | Failed. Terminal
//! states are absorbing. Every change is published through a watch channel,
//! so subscribers observe transitions in order.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;

use crate::docs::DocType;
use crate::knowledge::{Language, SkippedFile};
use crate::repository::RepositoryId;

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Waiting for a worker slot
    #[default]
    Pending,
    /// Executing the pipeline
    Running,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
}

impl JobState {
    /// Whether `self → next` is a legal transition.
    pub fn can_transition_to(&self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Pending, JobState::Running)
                | (JobState::Pending, JobState::Failed)
                | (JobState::Running, JobState::Completed)
                | (JobState::Running, JobState::Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of analysis.
///
/// Only full scans are produced; the other names are reserved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    #[default]
    FullScan,
    Incremental,
    GitUpdate,
}

/// Pipeline stage a job failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    Fetch,
    Extraction,
    GraphWrite,
    Synthesis,
    Timeout,
    Cancelled,
}

impl JobStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::Fetch => "fetch",
            JobStage::Extraction => "extraction",
            JobStage::GraphWrite => "graph write",
            JobStage::Synthesis => "synthesis",
            JobStage::Timeout => "timeout",
            JobStage::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for JobStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal error of a failed job.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{stage} failed: {cause}")]
pub struct JobError {
    pub stage: JobStage,
    pub cause: String,
}

impl JobError {
    pub fn new(stage: JobStage, cause: impl std::fmt::Display) -> Self {
        Self {
            stage,
            cause: cause.to_string(),
        }
    }
}

/// Result payload of a completed job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub modules: usize,
    pub classes: usize,
    pub functions: usize,
    pub apis: usize,
    pub features: usize,
    pub calls: usize,
    /// Files that produced a module
    pub parsed_files: usize,
    /// Files left out on parse errors, with reasons
    pub skipped_files: Vec<SkippedFile>,
    /// Files no parser handles
    pub unsupported_files: usize,
    /// Dominant language
    pub language: Option<Language>,
    /// Graph generation written by the job
    pub generation: u64,
    /// Confidence per synthesized document
    pub confidences: BTreeMap<DocType, u8>,
}

/// One analysis run of one repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisJob {
    /// Unique identifier for this job
    pub id: String,
    pub repository: RepositoryId,
    pub job_type: JobType,
    pub state: JobState,
    /// 0..=100, never decreases
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub outcome: Option<JobOutcome>,
    pub error: Option<JobError>,
}

impl AnalysisJob {
    /// Creates a pending job.
    pub fn new(repository: RepositoryId, job_type: JobType) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            repository,
            job_type,
            state: JobState::Pending,
            progress: 0,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            outcome: None,
            error: None,
        }
    }

    /// Move to `next` if legal, stamping the matching timestamp.
    ///
    /// Returns false and leaves the job untouched otherwise.
    pub fn transition(&mut self, next: JobState) -> bool {
        if !self.state.can_transition_to(next) {
            return false;
        }
        let now = Utc::now();
        match next {
            JobState::Running => self.started_at = Some(now),
            JobState::Completed | JobState::Failed => self.completed_at = Some(now),
            JobState::Pending => {}
        }
        self.state = next;
        true
    }

    /// Raise progress to `value`; lower values are ignored.
    pub fn advance(&mut self, value: u8) -> bool {
        let value = value.min(100);
        if value <= self.progress {
            return false;
        }
        self.progress = value;
        true
    }

    /// Converts the job to a status update.
    pub fn status(&self) -> JobStatus {
        JobStatus {
            job_id: self.id.clone(),
            repository: self.repository.clone(),
            state: self.state,
            progress: self.progress,
            error: self.error.clone(),
        }
    }
}

/// Lightweight state update for subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    pub job_id: String,
    pub repository: RepositoryId,
    pub state: JobState,
    pub progress: u8,
    pub error: Option<JobError>,
}

/// Shared handle to a live job.
///
/// The handle is the single writer of the job record; readers clone the
/// current value or subscribe to changes.
#[derive(Debug)]
pub struct JobHandle {
    tx: watch::Sender<AnalysisJob>,
    cancelled: AtomicBool,
}

impl JobHandle {
    pub fn new(job: AnalysisJob) -> Self {
        let (tx, _rx) = watch::channel(job);
        Self {
            tx,
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> String {
        self.tx.borrow().id.clone()
    }

    /// Current record.
    pub fn snapshot(&self) -> AnalysisJob {
        self.tx.borrow().clone()
    }

    pub fn state(&self) -> JobState {
        self.tx.borrow().state
    }

    pub fn subscribe(&self) -> watch::Receiver<AnalysisJob> {
        self.tx.subscribe()
    }

    /// Pending → Running.
    pub fn start(&self) -> bool {
        self.tx.send_if_modified(|job| job.transition(JobState::Running))
    }

    /// Publish a progress value, keeping the maximum seen.
    pub fn progress(&self, value: u8) {
        self.tx.send_if_modified(|job| !job.state.is_terminal() && job.advance(value));
    }

    /// Running → Completed with the outcome; progress goes to 100.
    pub fn complete(&self, outcome: JobOutcome) -> bool {
        self.tx.send_if_modified(|job| {
            if !job.transition(JobState::Completed) {
                return false;
            }
            job.advance(100);
            job.outcome = Some(outcome);
            true
        })
    }

    /// → Failed with the error. Progress is kept as reached.
    pub fn fail(&self, error: JobError) -> bool {
        self.tx.send_if_modified(|job| {
            if !job.transition(JobState::Failed) {
                return false;
            }
            job.error = Some(error);
            true
        })
    }

    /// Request cooperative cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Wait until the job reaches a terminal state.
    pub async fn wait(&self) -> AnalysisJob {
        let mut rx = self.subscribe();
        let result = rx.wait_for(|job| job.state.is_terminal()).await.map(|job| job.clone());
        match result {
            Ok(job) => job,
            // The sender lives in `self`, so the channel cannot close here.
            Err(_) => self.snapshot(),
        }
    }
}
