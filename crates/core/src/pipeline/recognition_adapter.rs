use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::audio::domain::audio_chunk::AudioChunk;
use crate::audio::domain::recognized_segment::RecognizedSegment;
use crate::audio::domain::speech_recognizer::{AbortSignal, SpeechRecognizer};
use crate::audio::infrastructure::wav_file;
use crate::shared::cancel::CancelToken;
use crate::shared::error::TranscriptionError;

/// Runs the recognition engine on one chunk at a time, under a deadline.
pub struct RecognitionAdapter {
    recognizer: Arc<dyn SpeechRecognizer>,
    timeout: Duration,
}

impl RecognitionAdapter {
    pub fn new(recognizer: Arc<dyn SpeechRecognizer>, timeout: Duration) -> Self {
        Self {
            recognizer,
            timeout,
        }
    }

    /// One engine call for `chunk`, on the calling thread.
    ///
    /// The engine is handed an abort signal that fires on cancellation or
    /// once the timeout passes, and the call is awaited until it returns.
    /// Cancellation wins over every other outcome; a call that ends after
    /// its deadline is a timeout even if it produced text.
    pub fn recognize(
        &self,
        chunk: &AudioChunk,
        cancel: &CancelToken,
    ) -> Result<RecognizedSegment, TranscriptionError> {
        cancel.check()?;
        let audio = wav_file::read_segment(chunk.path())?;
        let signal = AbortSignal::new(cancel.clone(), Instant::now() + self.timeout);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.recognizer.transcribe(&audio, &signal)
        }));

        cancel.check()?;
        if signal.is_expired() {
            return Err(TranscriptionError::RecognitionTimeout(self.timeout));
        }
        match outcome {
            Ok(Ok(fragments)) => Ok(RecognizedSegment::complete(chunk.index(), fragments)),
            Ok(Err(e)) => Err(TranscriptionError::RecognitionEngine(e.to_string())),
            Err(_) => Err(TranscriptionError::RecognitionEngine(
                "engine call panicked".into(),
            )),
        }
    }
}
