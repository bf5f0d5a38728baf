use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Errors raised anywhere in the transcription pipeline.
///
/// `RecognitionTimeout` and `RecognitionEngine` are chunk-local: they are
/// retried and then absorbed into an incomplete segment. Every other variant
/// aborts the whole job.
#[derive(Error, Debug)]
pub enum TranscriptionError {
    #[error("unsupported media in {path}: {reason}")]
    UnsupportedFormat { path: PathBuf, reason: String },
    #[error("audio extraction failed: {0}")]
    ExtractionFailed(String),
    #[error("invalid chunk duration settings: {0}")]
    InvalidDuration(String),
    #[error("recognition did not finish within {0:?}")]
    RecognitionTimeout(Duration),
    #[error("recognition engine failed: {0}")]
    RecognitionEngine(String),
    #[error("recognition failed for all {0} chunks")]
    AllChunksFailed(usize),
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("job cancelled")]
    Cancelled,
    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl TranscriptionError {
    pub fn unsupported(path: &Path, reason: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn storage(path: &Path, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Whether a failed recognition attempt may be repeated.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RecognitionTimeout(_) | Self::RecognitionEngine(_)
        )
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnsupportedFormat { .. } => ErrorCategory::UnsupportedFormat,
            Self::ExtractionFailed(_) => ErrorCategory::ExtractionFailed,
            Self::InvalidDuration(_) => ErrorCategory::InvalidDuration,
            Self::RecognitionTimeout(_) => ErrorCategory::RecognitionTimeout,
            Self::RecognitionEngine(_) => ErrorCategory::RecognitionEngine,
            Self::AllChunksFailed(_) => ErrorCategory::AllChunksFailed,
            Self::Storage { .. } => ErrorCategory::Storage,
            Self::Cancelled => ErrorCategory::Cancelled,
            Self::Invariant(_) => ErrorCategory::Internal,
        }
    }
}

/// User-facing failure category reported to the delivery side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    UnsupportedFormat,
    ExtractionFailed,
    InvalidDuration,
    RecognitionTimeout,
    RecognitionEngine,
    AllChunksFailed,
    Storage,
    Cancelled,
    Internal,
}

impl ErrorCategory {
    /// Short Russian description shown to the person who uploaded the video.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat => {
                "формат файла не поддерживается (нужен MP4, MOV, MKV или AVI)"
            }
            Self::ExtractionFailed => "не удалось извлечь звуковую дорожку",
            Self::InvalidDuration => "неверные настройки длительности фрагментов",
            Self::RecognitionTimeout => "распознавание заняло слишком много времени",
            Self::RecognitionEngine => "ошибка движка распознавания речи",
            Self::AllChunksFailed => "не удалось распознать ни один фрагмент записи",
            Self::Storage => "нет места или доступа к временным файлам",
            Self::Cancelled => "обработка отменена",
            Self::Internal => "внутренняя ошибка обработки",
        }
    }
}

/// Failure handed to the delivery side once a job ends in `Failed`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JobFailure {
    pub category: ErrorCategory,
    /// Technical detail for logs, never shown to the user.
    pub detail: String,
}

impl JobFailure {
    pub fn user_message(&self) -> String {
        let reason = self.category.describe();
        if self.category == ErrorCategory::Cancelled {
            return format!("Не удалось обработать видео: {reason}.");
        }
        format!(
            "Не удалось обработать видео: {reason}. \
             Попробуйте ещё раз позже или обратитесь в поддержку."
        )
    }
}

impl From<&TranscriptionError> for JobFailure {
    fn from(err: &TranscriptionError) -> Self {
        Self {
            category: err.category(),
            detail: err.to_string(),
        }
    }
}
