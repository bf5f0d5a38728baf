use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use crate::shared::error::JobFailure;

use super::job_observer::JobObserver;

/// Identifier handed back by `submit`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a job is in its lifecycle.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobStatus {
    Probing,
    Chunking,
    Recognizing { completed: usize, total: usize },
    Assembling,
    Done,
    Failed { failure: JobFailure },
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed { .. })
    }

    /// Short stage label used in logs and timing summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Probing => "probing",
            Self::Chunking => "chunking",
            Self::Recognizing { .. } => "recognizing",
            Self::Assembling => "assembling",
            Self::Done => "done",
            Self::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recognizing { completed, total } => {
                write!(f, "recognizing ({completed}/{total})")
            }
            Self::Failed { failure } => write!(f, "failed ({:?})", failure.category),
            other => f.write_str(other.label()),
        }
    }
}

/// Per-job status record. The pipeline is its only writer; everyone else
/// reads snapshot copies.
pub struct JobState {
    id: JobId,
    status: Mutex<JobStatus>,
    observer: Arc<dyn JobObserver>,
}

impl JobState {
    pub fn new(id: JobId, observer: Arc<dyn JobObserver>) -> Self {
        Self {
            id,
            status: Mutex::new(JobStatus::Probing),
            observer,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn snapshot(&self) -> JobStatus {
        self.status.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Move to `next` and notify the observer. A finished job keeps its
    /// terminal status; later transitions are ignored.
    pub fn transition(&self, next: JobStatus) {
        {
            let mut current = self.status.lock().unwrap_or_else(|e| e.into_inner());
            if current.is_terminal() {
                log::warn!("Job {} is already {current}; ignoring {next}", self.id);
                return;
            }
            *current = next.clone();
        }
        self.observer.on_status(self.id, &next);
    }

    pub fn record_timing(&self, stage: &str, elapsed: Duration) {
        self.observer.on_stage_timing(self.id, stage, elapsed);
    }
}
