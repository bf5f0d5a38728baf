use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::audio::domain::speech_recognizer::RecognizerProvider;
use crate::audio::infrastructure::wav_chunker::Chunker;
use crate::pipeline::infrastructure::recognition_pool::RecognitionPool;
use crate::shared::cancel::CancelToken;
use crate::shared::config::{JobOptions, TranscriptionConfig};
use crate::shared::error::{JobFailure, TranscriptionError};
use crate::transcript::domain::job_result::JobResult;
use crate::transcript::domain::transcript_assembler::TranscriptAssembler;
use crate::video::domain::audio_extractor::AudioExtractor;
use crate::video::domain::source_media::SourceMedia;

use super::job_status::{JobState, JobStatus};
use super::job_workspace::JobWorkspace;
use super::media_prober::MediaProber;
use super::recognition_adapter::RecognitionAdapter;

/// Drives one job from source video to transcript.
///
/// Stages run strictly in order: probing, chunking, recognizing (fanned out
/// over the shared recognition pool) and assembling. Whatever the outcome,
/// the job's source file and scratch files are gone before the terminal
/// status is published.
pub struct JobPipeline {
    config: TranscriptionConfig,
    prober: MediaProber,
    recognizers: Arc<dyn RecognizerProvider>,
    pool: Arc<RecognitionPool>,
}

impl JobPipeline {
    pub fn new(
        config: TranscriptionConfig,
        extractor: Box<dyn AudioExtractor>,
        recognizers: Arc<dyn RecognizerProvider>,
        pool: Arc<RecognitionPool>,
    ) -> Self {
        let prober = MediaProber::new(extractor, &config);
        Self {
            config,
            prober,
            recognizers,
            pool,
        }
    }

    pub fn config(&self) -> &TranscriptionConfig {
        &self.config
    }

    /// Run the job whose source file is `source_path`. The file is owned by
    /// the job from here on and is deleted when the job ends.
    pub fn run(
        &self,
        state: &JobState,
        source_path: &Path,
        options: &JobOptions,
        cancel: &CancelToken,
    ) -> Result<JobResult, JobFailure> {
        state.transition(JobStatus::Probing);
        let started = Instant::now();

        match self.execute(state, source_path, options, cancel) {
            Ok(result) => {
                log::info!(
                    "Job {} finished in {:.1}s with {} fragments and {} gaps",
                    state.id(),
                    started.elapsed().as_secs_f64(),
                    result.fragments().count(),
                    result.gap_count()
                );
                state.transition(JobStatus::Done);
                Ok(result)
            }
            Err(e) => {
                let failure = JobFailure::from(&e);
                log::warn!("Job {} failed: {e}", state.id());
                state.transition(JobStatus::Failed {
                    failure: failure.clone(),
                });
                Err(failure)
            }
        }
    }

    fn execute(
        &self,
        state: &JobState,
        source_path: &Path,
        options: &JobOptions,
        cancel: &CancelToken,
    ) -> Result<JobResult, TranscriptionError> {
        let source = open_source(source_path)?;
        let workspace = JobWorkspace::create(&self.config.temp_root, state.id(), source)?;
        options.validate()?;
        cancel.check()?;

        let started = Instant::now();
        let audio = self
            .prober
            .probe(workspace.source(), workspace.path(), cancel)?;
        state.record_timing("probing", started.elapsed());
        cancel.check()?;

        state.transition(JobStatus::Chunking);
        let started = Instant::now();
        let chunks = Chunker::new(workspace.chunk_dir()).split(
            &audio,
            options.clamped_target(),
            options.min_chunk_seconds as f64,
            options.max_chunk_seconds as f64,
        )?;
        let windows = chunks.windows();
        let total = chunks.len();
        state.record_timing("chunking", started.elapsed());
        cancel.check()?;

        let recognizer = self
            .recognizers
            .recognizer(&options.recognition_model)
            .map_err(|e| {
                TranscriptionError::RecognitionEngine(format!(
                    "cannot load model {:?}: {e}",
                    options.recognition_model
                ))
            })?;
        let adapter = Arc::new(RecognitionAdapter::new(
            recognizer,
            self.config.recognition_timeout,
        ));

        state.transition(JobStatus::Recognizing {
            completed: 0,
            total,
        });
        let started = Instant::now();
        let segments = self.pool.recognize_all(
            Arc::new(chunks),
            adapter,
            self.config.retry,
            cancel,
            |completed, total| state.transition(JobStatus::Recognizing { completed, total }),
        )?;
        state.record_timing("recognizing", started.elapsed());

        if segments.iter().all(|s| s.is_incomplete()) {
            return Err(TranscriptionError::AllChunksFailed(total));
        }
        cancel.check()?;

        state.transition(JobStatus::Assembling);
        let started = Instant::now();
        let result = TranscriptAssembler::new(options.enable_subtitles).assemble(&windows, segments)?;
        state.record_timing("assembling", started.elapsed());

        drop(workspace);
        Ok(result)
    }
}

/// Open the job's source. A source that cannot even be described is
/// still deleted if it exists, since the job owns it.
fn open_source(path: &Path) -> Result<SourceMedia, TranscriptionError> {
    SourceMedia::open(path).map_err(|e| {
        if path.is_file() {
            let _ = std::fs::remove_file(path);
        }
        e
    })
}
