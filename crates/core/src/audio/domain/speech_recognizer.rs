use std::sync::Arc;
use std::time::Instant;

use crate::shared::cancel::CancelToken;

use super::audio_segment::AudioSegment;
use super::recognized_segment::RecognizedFragment;

pub type RecognizerError = Box<dyn std::error::Error + Send + Sync>;

/// Tells a running engine call to stop early: the job was cancelled or the
/// call ran past its deadline.
///
/// Owns everything it checks, so engines can move a clone into a callback.
#[derive(Clone, Debug)]
pub struct AbortSignal {
    cancel: CancelToken,
    deadline: Option<Instant>,
}

impl AbortSignal {
    pub fn new(cancel: CancelToken, deadline: Instant) -> Self {
        Self {
            cancel,
            deadline: Some(deadline),
        }
    }

    /// A signal that only fires when `cancel` does.
    pub fn unbounded(cancel: CancelToken) -> Self {
        Self {
            cancel,
            deadline: None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    pub fn should_abort(&self) -> bool {
        self.is_cancelled() || self.is_expired()
    }
}

/// Domain interface for speech-to-text transcription.
///
/// Implementations run inference on one audio segment and return fragments
/// timed relative to the start of that segment. Calls share no state.
/// A call must return promptly once `abort.should_abort()` turns true; the
/// caller holds its worker slot until it does.
pub trait SpeechRecognizer: Send + Sync {
    fn transcribe(
        &self,
        audio: &AudioSegment,
        abort: &AbortSignal,
    ) -> Result<Vec<RecognizedFragment>, RecognizerError>;
}

/// Hands out recognizers by model identifier (e.g. `small`).
pub trait RecognizerProvider: Send + Sync {
    fn recognizer(&self, model_id: &str) -> Result<Arc<dyn SpeechRecognizer>, RecognizerError>;
}
