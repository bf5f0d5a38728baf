use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::shared::cancel::CancelToken;
use crate::shared::config::JobOptions;
use crate::shared::error::{JobFailure, TranscriptionError};
use crate::transcript::domain::job_result::JobResult;

use super::job_observer::JobObserver;
use super::job_pipeline::JobPipeline;
use super::job_status::{JobId, JobState, JobStatus};

/// How a job ended.
#[derive(Debug)]
pub enum JobOutcome {
    Done(JobResult),
    Failed(JobFailure),
}

/// Accepts jobs and runs each on its own thread. All jobs share the
/// pipeline, and through it the recognition pool.
pub struct JobRunner {
    pipeline: Arc<JobPipeline>,
    observer: Arc<dyn JobObserver>,
}

impl JobRunner {
    pub fn new(pipeline: JobPipeline, observer: Arc<dyn JobObserver>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            observer,
        }
    }

    /// Start a job for the video at `source`. The job takes ownership of the
    /// file and deletes it when it ends.
    pub fn submit(&self, source: &Path, options: JobOptions) -> Result<JobHandle, TranscriptionError> {
        let id = JobId::new();
        let state = Arc::new(JobState::new(id, Arc::clone(&self.observer)));
        let cancel = CancelToken::new();

        let thread = {
            let pipeline = Arc::clone(&self.pipeline);
            let state = Arc::clone(&state);
            let cancel = cancel.clone();
            let source: PathBuf = source.to_path_buf();
            std::thread::Builder::new()
                .name(format!("job-{id}"))
                .spawn(move || run_guarded(&pipeline, &state, &source, &options, &cancel))
                .map_err(|e| TranscriptionError::Invariant(format!("failed to start job thread: {e}")))?
        };

        log::info!("Submitted job {id} for {}", source.display());
        Ok(JobHandle {
            id,
            state,
            cancel,
            thread,
        })
    }
}

/// Runs the pipeline, turning a panic into an internal failure. The job's
/// files are already gone by then since the workspace unwinds with it.
fn run_guarded(
    pipeline: &JobPipeline,
    state: &JobState,
    source: &Path,
    options: &JobOptions,
    cancel: &CancelToken,
) -> JobOutcome {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        pipeline.run(state, source, options, cancel)
    }));
    match result {
        Ok(Ok(result)) => JobOutcome::Done(result),
        Ok(Err(failure)) => JobOutcome::Failed(failure),
        Err(_) => {
            let failure = JobFailure::from(&TranscriptionError::Invariant(
                "job thread panicked".into(),
            ));
            state.transition(JobStatus::Failed {
                failure: failure.clone(),
            });
            JobOutcome::Failed(failure)
        }
    }
}

/// Owner's view of a submitted job.
pub struct JobHandle {
    id: JobId,
    state: Arc<JobState>,
    cancel: CancelToken,
    thread: JoinHandle<JobOutcome>,
}

impl JobHandle {
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Snapshot of the current status.
    pub fn status(&self) -> JobStatus {
        self.state.snapshot()
    }

    /// Ask the job to stop. Running engine calls are told to abort; once they
    /// return and the job's files are removed, it ends in `Failed` with the
    /// cancelled category.
    pub fn cancel(&self) {
        log::info!("Cancelling job {}", self.id);
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Block until the job ends.
    pub fn wait(self) -> JobOutcome {
        self.thread.join().unwrap_or_else(|_| {
            JobOutcome::Failed(JobFailure::from(&TranscriptionError::Invariant(
                "job thread panicked".into(),
            )))
        })
    }
}
