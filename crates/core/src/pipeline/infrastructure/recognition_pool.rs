use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{RecvTimeoutError, Sender};

use crate::audio::domain::recognized_segment::RecognizedSegment;
use crate::audio::infrastructure::wav_chunker::ChunkSequence;
use crate::pipeline::recognition_adapter::RecognitionAdapter;
use crate::pipeline::retry::RetryPolicy;
use crate::shared::cancel::CancelToken;
use crate::shared::error::TranscriptionError;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// How often the owner re-checks cancellation while waiting on workers.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Fixed set of recognition threads shared by every job.
///
/// Each engine call runs on a worker and holds it until the call returns,
/// so the number of engine calls in flight never exceeds the worker count
/// regardless of how many jobs or chunks are submitted. Excess chunks wait
/// in the queue.
pub struct RecognitionPool {
    task_tx: Option<Sender<Task>>,
    workers: Vec<JoinHandle<()>>,
}

impl RecognitionPool {
    pub fn new(size: usize) -> io::Result<Self> {
        let size = size.max(1);
        let (task_tx, task_rx) = crossbeam_channel::unbounded::<Task>();
        let mut workers = Vec::with_capacity(size);
        for i in 0..size {
            let task_rx = task_rx.clone();
            let handle = std::thread::Builder::new()
                .name(format!("recognition-{i}"))
                .spawn(move || {
                    for task in task_rx {
                        if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
                            log::error!("Recognition task panicked");
                        }
                    }
                })?;
            workers.push(handle);
        }
        log::debug!("Started recognition pool with {size} workers");
        Ok(Self {
            task_tx: Some(task_tx),
            workers,
        })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Recognize every chunk of `chunks` and return one segment per chunk,
    /// in chunk index order.
    ///
    /// Returns only after every engine call it started has returned. Each
    /// chunk file is written right before an attempt and deleted right
    /// after. `on_progress(completed, total)` runs on the calling thread
    /// each time a chunk resolves, in completion order.
    ///
    /// A chunk-local recognition failure is retried per `policy`. The retry
    /// waits out its backoff in the queue, not on a worker. Once the
    /// attempts are spent the chunk becomes an incomplete segment. The first
    /// other error stops chunks that have not started yet and is returned
    /// once the running ones finish; an owner cancellation wins over any
    /// other error.
    pub fn recognize_all(
        &self,
        chunks: Arc<ChunkSequence>,
        adapter: Arc<RecognitionAdapter>,
        policy: RetryPolicy,
        cancel: &CancelToken,
        mut on_progress: impl FnMut(usize, usize),
    ) -> Result<Vec<RecognizedSegment>, TranscriptionError> {
        let task_tx = self
            .task_tx
            .as_ref()
            .ok_or_else(|| TranscriptionError::Invariant("recognition pool is shut down".into()))?;
        let total = chunks.len();
        let max_attempts = policy.max_attempts();
        let (result_tx, result_rx) = crossbeam_channel::unbounded::<AttemptResult>();
        let batch = Batch {
            chunks,
            adapter,
            cancel: cancel.clone(),
            aborted: Arc::new(AtomicBool::new(false)),
            result_tx,
        };

        for index in 0..total {
            batch.submit(task_tx, index, 1)?;
        }
        let mut in_flight = total;
        let mut waiting: Vec<PendingRetry> = Vec::new();
        let mut slots: Vec<Option<RecognizedSegment>> = vec![None; total];
        let mut first_error: Option<TranscriptionError> = None;
        let mut completed = 0;

        loop {
            if cancel.is_cancelled() || batch.is_aborted() {
                waiting.clear();
            }
            let now = Instant::now();
            let (due, later): (Vec<PendingRetry>, Vec<PendingRetry>) =
                waiting.into_iter().partition(|r| r.due <= now);
            waiting = later;
            for retry in due {
                batch.submit(task_tx, retry.index, retry.attempt)?;
                in_flight += 1;
            }
            if in_flight == 0 && waiting.is_empty() {
                break;
            }

            let wait = waiting
                .iter()
                .map(|r| r.due.saturating_duration_since(now))
                .min()
                .map_or(POLL_INTERVAL, |d| d.min(POLL_INTERVAL));
            let AttemptResult {
                index,
                attempt,
                result,
            } = match result_rx.recv_timeout(wait) {
                Ok(message) => message,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            };
            in_flight -= 1;

            match result {
                Ok(segment) => {
                    slots[index] = Some(segment);
                    completed += 1;
                    on_progress(completed, total);
                }
                Err(TranscriptionError::Cancelled) => {}
                Err(e) if e.is_retryable() => {
                    let next = attempt + 1;
                    match policy.delay_before(next) {
                        Some(delay) if !cancel.is_cancelled() => {
                            log::warn!(
                                "Chunk {index} attempt {attempt}/{max_attempts} failed: {e}; retrying in {delay:?}"
                            );
                            waiting.push(PendingRetry {
                                index,
                                attempt: next,
                                due: Instant::now() + delay,
                            });
                        }
                        Some(_) => {}
                        None => {
                            log::warn!("Chunk {index} gave up after {attempt} attempts: {e}");
                            slots[index] = Some(RecognizedSegment::incomplete(index, e.to_string()));
                            completed += 1;
                            on_progress(completed, total);
                        }
                    }
                }
                Err(e) => {
                    batch.abort();
                    log::error!("Chunk {index} failed: {e}");
                    first_error.get_or_insert(e);
                }
            }
        }

        cancel.check()?;
        if let Some(e) = first_error {
            return Err(e);
        }
        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| {
                    TranscriptionError::Invariant(format!("chunk {index} produced no result"))
                })
            })
            .collect()
    }
}

impl Drop for RecognitionPool {
    fn drop(&mut self) {
        self.task_tx.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

struct AttemptResult {
    index: usize,
    attempt: u32,
    result: Result<RecognizedSegment, TranscriptionError>,
}

struct PendingRetry {
    index: usize,
    attempt: u32,
    due: Instant,
}

/// Everything a worker needs to run one attempt of one job's chunk.
struct Batch {
    chunks: Arc<ChunkSequence>,
    adapter: Arc<RecognitionAdapter>,
    cancel: CancelToken,
    aborted: Arc<AtomicBool>,
    result_tx: Sender<AttemptResult>,
}

impl Batch {
    fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    fn submit(&self, task_tx: &Sender<Task>, index: usize, attempt: u32) -> Result<(), TranscriptionError> {
        let chunks = Arc::clone(&self.chunks);
        let adapter = Arc::clone(&self.adapter);
        let cancel = self.cancel.clone();
        let aborted = Arc::clone(&self.aborted);
        let result_tx = self.result_tx.clone();
        let task: Task = Box::new(move || {
            let result = if aborted.load(Ordering::SeqCst) {
                Err(TranscriptionError::Cancelled)
            } else {
                panic::catch_unwind(AssertUnwindSafe(|| {
                    recognize_chunk(&chunks, &adapter, index, attempt, &cancel)
                }))
                .unwrap_or_else(|_| {
                    Err(TranscriptionError::Invariant(format!(
                        "recognition of chunk {index} panicked"
                    )))
                })
            };
            let _ = result_tx.send(AttemptResult {
                index,
                attempt,
                result,
            });
        });
        task_tx.send(task).map_err(|_| {
            TranscriptionError::Invariant("recognition pool stopped accepting work".into())
        })
    }
}

fn recognize_chunk(
    chunks: &ChunkSequence,
    adapter: &RecognitionAdapter,
    index: usize,
    attempt: u32,
    cancel: &CancelToken,
) -> Result<RecognizedSegment, TranscriptionError> {
    cancel.check()?;
    log::debug!("Recognizing chunk {index} (attempt {attempt})");
    let chunk = chunks.materialize(index)?;
    let result = adapter.recognize(&chunk, cancel);
    if let Err(e) = chunk.remove_file() {
        log::warn!("Could not delete {}: {e}", chunk.path().display());
    }
    result
}
