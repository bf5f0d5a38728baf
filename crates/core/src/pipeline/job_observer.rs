use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::job_status::{JobId, JobStatus};

/// Receives job lifecycle events from the pipeline.
///
/// Decouples orchestration from how progress reaches people: log output,
/// a chat notification, or a CLI progress line each plug in here.
pub trait JobObserver: Send + Sync {
    /// Called on every status transition, in order, from the job's thread.
    fn on_status(&self, job: JobId, status: &JobStatus);

    /// Record how long a stage took. Default: no-op.
    fn on_stage_timing(&self, _job: JobId, _stage: &str, _elapsed: Duration) {}
}

/// Any `Fn(JobId, &JobStatus)` closure is a progress callback.
impl<F> JobObserver for F
where
    F: Fn(JobId, &JobStatus) + Send + Sync,
{
    fn on_status(&self, job: JobId, status: &JobStatus) {
        self(job, status)
    }
}

/// Observer that discards all events.
pub struct NullJobObserver;

impl JobObserver for NullJobObserver {
    fn on_status(&self, _job: JobId, _status: &JobStatus) {}
}

/// Forwards every event to each member in turn.
#[derive(Default)]
pub struct ObserverSet {
    members: Vec<Arc<dyn JobObserver>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn JobObserver>) -> Self {
        self.members.push(observer);
        self
    }
}

impl JobObserver for ObserverSet {
    fn on_status(&self, job: JobId, status: &JobStatus) {
        for member in &self.members {
            member.on_status(job, status);
        }
    }

    fn on_stage_timing(&self, job: JobId, stage: &str, elapsed: Duration) {
        for member in &self.members {
            member.on_stage_timing(job, stage, elapsed);
        }
    }
}

#[derive(Debug)]
struct Timeline {
    started: Instant,
    finished: Option<Duration>,
    stages: Vec<(String, Duration)>,
    chunks: usize,
    last_status: JobStatus,
}

/// Logs transitions through `log` and keeps per-job stage timings for an
/// end-of-job summary.
///
/// Recognition progress is throttled to every `throttle_chunks` chunks so
/// long recordings do not flood the log.
pub struct LoggingJobObserver {
    throttle_chunks: usize,
    timelines: Mutex<HashMap<JobId, Timeline>>,
}

impl LoggingJobObserver {
    pub fn new(throttle_chunks: usize) -> Self {
        Self {
            throttle_chunks: throttle_chunks.max(1),
            timelines: Mutex::new(HashMap::new()),
        }
    }

    /// Formatted summary for `job`, or `None` until it reaches a terminal status.
    pub fn summary_string(&self, job: JobId) -> Option<String> {
        let timelines = self.timelines.lock().unwrap_or_else(|e| e.into_inner());
        let timeline = timelines.get(&job)?;
        let total = timeline.finished?;

        let mut lines = vec![format!(
            "Job {job} {} ({} chunks, {:.1}s total):",
            timeline.last_status,
            timeline.chunks,
            total.as_secs_f64()
        )];
        let total_ms = total.as_secs_f64() * 1000.0;
        for (stage, elapsed) in &timeline.stages {
            let ms = elapsed.as_secs_f64() * 1000.0;
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!("  {stage:12}: {ms:9.0}ms  ({pct:4.1}%)"));
        }
        Some(lines.join("\n"))
    }

    /// Recorded stage timings for `job`, in the order they finished.
    pub fn timings_for(&self, job: JobId) -> Vec<(String, Duration)> {
        let timelines = self.timelines.lock().unwrap_or_else(|e| e.into_inner());
        timelines
            .get(&job)
            .map(|t| t.stages.clone())
            .unwrap_or_default()
    }

    /// Forget a finished job's timeline.
    pub fn forget(&self, job: JobId) {
        self.timelines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&job);
    }
}

impl Default for LoggingJobObserver {
    fn default() -> Self {
        Self::new(5)
    }
}

impl JobObserver for LoggingJobObserver {
    fn on_status(&self, job: JobId, status: &JobStatus) {
        let mut timelines = self.timelines.lock().unwrap_or_else(|e| e.into_inner());
        let timeline = timelines.entry(job).or_insert_with(|| Timeline {
            started: Instant::now(),
            finished: None,
            stages: Vec::new(),
            chunks: 0,
            last_status: status.clone(),
        });
        timeline.last_status = status.clone();

        match status {
            JobStatus::Recognizing { completed, total } => {
                timeline.chunks = *total;
                if *completed == 0 {
                    log::info!("Job {job}: recognizing {total} chunks");
                } else if completed % self.throttle_chunks == 0 || completed == total {
                    let pct = *completed as f64 / (*total).max(1) as f64 * 100.0;
                    log::info!("Job {job}: {completed}/{total} chunks recognized ({pct:.0}%)");
                }
            }
            JobStatus::Done => {
                timeline.finished = Some(timeline.started.elapsed());
                log::info!("Job {job}: done");
            }
            JobStatus::Failed { failure } => {
                timeline.finished = Some(timeline.started.elapsed());
                log::error!("Job {job} failed: {}", failure.detail);
            }
            other => log::info!("Job {job}: {other}"),
        }
    }

    fn on_stage_timing(&self, job: JobId, stage: &str, elapsed: Duration) {
        log::debug!("Job {job}: {stage} took {:.1}s", elapsed.as_secs_f64());
        let mut timelines = self.timelines.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(timeline) = timelines.get_mut(&job) {
            timeline.stages.push((stage.to_string(), elapsed));
        }
    }
}
