use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pipeline::retry::{BackoffSchedule, RetryPolicy};

use super::constants::{
    DEFAULT_LANGUAGE, DEFAULT_MAX_CHUNK_SECONDS, DEFAULT_MIN_CHUNK_SECONDS,
    DEFAULT_TARGET_CHUNK_SECONDS, DEFAULT_WHISPER_MODEL, SUPPORTED_EXTENSIONS,
    TARGET_CHANNELS, TARGET_SAMPLE_RATE,
};
use super::error::TranscriptionError;

const DEFAULT_RECOGNITION_WORKERS: usize = 2;
const DEFAULT_RECOGNITION_TIMEOUT: Duration = Duration::from_secs(20 * 60);
const DEFAULT_EXTRACTION_TIMEOUT: Duration = Duration::from_secs(30 * 60);
const DEFAULT_RECOGNITION_RETRIES: u32 = 2;

/// Per-job options supplied with each submission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobOptions {
    pub target_chunk_seconds: u32,
    pub min_chunk_seconds: u32,
    pub max_chunk_seconds: u32,
    pub enable_subtitles: bool,
    pub recognition_model: String,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            target_chunk_seconds: DEFAULT_TARGET_CHUNK_SECONDS,
            min_chunk_seconds: DEFAULT_MIN_CHUNK_SECONDS,
            max_chunk_seconds: DEFAULT_MAX_CHUNK_SECONDS,
            enable_subtitles: true,
            recognition_model: DEFAULT_WHISPER_MODEL.to_string(),
        }
    }
}

impl JobOptions {
    pub fn validate(&self) -> Result<(), TranscriptionError> {
        if self.target_chunk_seconds == 0 {
            return Err(TranscriptionError::InvalidDuration(
                "target chunk duration must be positive".into(),
            ));
        }
        if self.max_chunk_seconds == 0 {
            return Err(TranscriptionError::InvalidDuration(
                "maximum chunk duration must be positive".into(),
            ));
        }
        if self.min_chunk_seconds > self.max_chunk_seconds {
            return Err(TranscriptionError::InvalidDuration(format!(
                "minimum chunk duration {}s exceeds maximum {}s",
                self.min_chunk_seconds, self.max_chunk_seconds
            )));
        }
        Ok(())
    }

    /// Target duration pulled into the `[min, max]` window.
    pub fn clamped_target(&self) -> f64 {
        self.target_chunk_seconds
            .clamp(self.min_chunk_seconds, self.max_chunk_seconds.max(self.min_chunk_seconds))
            as f64
    }
}

/// Process-wide settings shared by every job.
#[derive(Clone, Debug)]
pub struct TranscriptionConfig {
    /// Root under which each job gets its own scratch directory.
    pub temp_root: PathBuf,
    pub sample_rate: u32,
    pub channels: u16,
    /// Lowercase container extensions accepted by the prober.
    pub supported_extensions: Vec<String>,
    /// Size of the recognition pool shared across jobs.
    pub recognition_workers: usize,
    pub recognition_timeout: Duration,
    pub extraction_timeout: Duration,
    pub retry: RetryPolicy,
    /// Language hint passed to the recognition engine.
    pub language: String,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            temp_root: std::env::temp_dir().join("recognbot"),
            sample_rate: TARGET_SAMPLE_RATE,
            channels: TARGET_CHANNELS,
            supported_extensions: SUPPORTED_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            recognition_workers: DEFAULT_RECOGNITION_WORKERS,
            recognition_timeout: DEFAULT_RECOGNITION_TIMEOUT,
            extraction_timeout: DEFAULT_EXTRACTION_TIMEOUT,
            retry: RetryPolicy {
                max_retries: DEFAULT_RECOGNITION_RETRIES,
                backoff: BackoffSchedule::default(),
            },
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

impl TranscriptionConfig {
    pub fn is_supported_extension(&self, extension: &str) -> bool {
        let ext = extension.trim_start_matches('.').to_lowercase();
        self.supported_extensions.iter().any(|s| *s == ext)
    }
}
