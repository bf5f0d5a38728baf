//! Stub ports shared by the pipeline tests.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::audio::domain::audio_segment::AudioSegment;
use crate::audio::domain::recognized_segment::RecognizedFragment;
use crate::audio::domain::speech_recognizer::{
    AbortSignal, RecognizerError, RecognizerProvider, SpeechRecognizer,
};
use crate::audio::infrastructure::wav_file::{pcm16_spec, wav_error};
use crate::shared::error::TranscriptionError;
use crate::video::domain::audio_extractor::{AudioExtractor, ExtractionRequest};
use crate::video::domain::normalized_audio::NormalizedAudio;

fn write_wav(
    request: &ExtractionRequest<'_>,
    seconds: f64,
    sample: impl Fn(u64) -> i16,
) -> Result<(), TranscriptionError> {
    request.cancel.check()?;
    let mut writer = hound::WavWriter::create(
        request.output,
        pcm16_spec(request.sample_rate, request.channels),
    )
    .map_err(|e| wav_error(request.output, e))?;
    let frames = (seconds * request.sample_rate as f64).round() as u64;
    for frame in 0..frames {
        for _ in 0..request.channels {
            writer
                .write_sample(sample(frame))
                .map_err(|e| wav_error(request.output, e))?;
        }
    }
    writer.finalize().map_err(|e| wav_error(request.output, e))
}

/// Writes `seconds` of silence at the requested format instead of decoding.
pub struct SilentExtractor {
    pub seconds: f64,
}

impl AudioExtractor for SilentExtractor {
    fn extract(&self, request: &ExtractionRequest<'_>) -> Result<(), TranscriptionError> {
        write_wav(request, self.seconds, |_| 0)
    }
}

/// Writes audio whose every sample holds the whole second it belongs to,
/// so a recognizer can tell which part of the file it was handed.
pub struct PositionExtractor {
    pub seconds: f64,
}

impl AudioExtractor for PositionExtractor {
    fn extract(&self, request: &ExtractionRequest<'_>) -> Result<(), TranscriptionError> {
        let rate = request.sample_rate as u64;
        write_wav(request, self.seconds, move |frame| (frame / rate) as i16)
    }
}

/// Write `seconds` of position-encoded mono audio to `dir/audio.wav`.
pub fn position_audio(dir: &Path, sample_rate: u32, seconds: u64) -> NormalizedAudio {
    let path = dir.join("audio.wav");
    let mut writer = hound::WavWriter::create(&path, pcm16_spec(sample_rate, 1)).unwrap();
    let frames = seconds * sample_rate as u64;
    for frame in 0..frames {
        writer.write_sample((frame / sample_rate as u64) as i16).unwrap();
    }
    writer.finalize().unwrap();
    NormalizedAudio::new(path, sample_rate, frames)
}

/// Second of the source file at which `audio` starts, as written by
/// [`PositionExtractor`].
pub fn start_second(audio: &AudioSegment) -> u64 {
    audio
        .samples()
        .first()
        .map(|s| (s * i16::MAX as f32).round() as u64)
        .unwrap_or(0)
}

type Script = dyn Fn(u64) -> Result<Vec<RecognizedFragment>, RecognizerError> + Send + Sync;

/// Recognizer driven by a closure over the chunk's starting second.
///
/// An optional delay runs before the closure. By default the delay ends
/// early with an error once the abort signal fires, the way the Whisper
/// engine stops; `ignoring_abort` makes it sleep the full time instead.
pub struct ScriptedRecognizer {
    script: Box<Script>,
    delay: Duration,
    honours_abort: bool,
    calls: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedRecognizer {
    pub fn new(
        script: impl Fn(u64) -> Result<Vec<RecognizedFragment>, RecognizerError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            delay: Duration::ZERO,
            honours_abort: true,
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Emits one fragment `"chunk at {second}s"` a second into each chunk.
    pub fn echo() -> Self {
        Self::new(|second| {
            Ok(vec![RecognizedFragment::new(
                1.0,
                2.0,
                format!("chunk at {second}s"),
            )])
        })
    }

    /// Fails every call with an engine error.
    pub fn failing() -> Self {
        Self::new(|_| Err("engine crashed".into()))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn ignoring_abort(mut self) -> Self {
        self.honours_abort = false;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls currently inside `transcribe`.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Most calls ever inside `transcribe` at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn wait(&self, abort: &AbortSignal) -> Result<(), RecognizerError> {
        if !self.honours_abort {
            std::thread::sleep(self.delay);
            return Ok(());
        }
        let until = Instant::now() + self.delay;
        while Instant::now() < until {
            if abort.should_abort() {
                return Err("aborted".into());
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        Ok(())
    }
}

impl SpeechRecognizer for ScriptedRecognizer {
    fn transcribe(
        &self,
        audio: &AudioSegment,
        abort: &AbortSignal,
    ) -> Result<Vec<RecognizedFragment>, RecognizerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let result = self
            .wait(abort)
            .and_then(|()| (self.script)(start_second(audio)));
        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Hands out the same recognizer for every model id.
pub struct FixedProvider(pub Arc<dyn SpeechRecognizer>);

impl RecognizerProvider for FixedProvider {
    fn recognizer(&self, _model_id: &str) -> Result<Arc<dyn SpeechRecognizer>, RecognizerError> {
        Ok(Arc::clone(&self.0))
    }
}

/// Provider that cannot load any model.
pub struct MissingModelProvider;

impl RecognizerProvider for MissingModelProvider {
    fn recognizer(&self, model_id: &str) -> Result<Arc<dyn SpeechRecognizer>, RecognizerError> {
        Err(format!("Whisper model not found: {model_id}").into())
    }
}
