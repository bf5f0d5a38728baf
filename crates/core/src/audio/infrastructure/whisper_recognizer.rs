use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::audio::domain::audio_segment::AudioSegment;
use crate::audio::domain::recognized_segment::RecognizedFragment;
use crate::audio::domain::speech_recognizer::{
    AbortSignal, RecognizerError, RecognizerProvider, SpeechRecognizer,
};
use crate::shared::model_resolver::{resolve_whisper_model, ProgressFn};

/// Speech recognizer using whisper.cpp via whisper-rs.
///
/// The model is loaded once; every call creates its own inference state, so
/// one recognizer can serve several chunks concurrently. whisper.cpp polls
/// the abort signal during inference and stops the call when it fires.
pub struct WhisperRecognizer {
    ctx: WhisperContext,
    model_path: PathBuf,
    language: String,
}

impl WhisperRecognizer {
    pub fn new(model_path: &Path, language: &str) -> Result<Self, RecognizerError> {
        if !model_path.exists() {
            return Err(format!("Whisper model not found at: {}", model_path.display()).into());
        }
        log::info!("Loading Whisper model from {}", model_path.display());
        let ctx = WhisperContext::new_with_params(
            model_path.to_str().ok_or("Invalid model path")?,
            WhisperContextParameters::default(),
        )
        .map_err(|e| format!("Failed to load Whisper model: {e}"))?;
        Ok(Self {
            ctx,
            model_path: model_path.to_path_buf(),
            language: language.to_string(),
        })
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

impl SpeechRecognizer for WhisperRecognizer {
    fn transcribe(
        &self,
        audio: &AudioSegment,
        abort: &AbortSignal,
    ) -> Result<Vec<RecognizedFragment>, RecognizerError> {
        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| format!("Failed to create Whisper state: {e}"))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some(&self.language));
        params.set_translate(false);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_n_threads(num_cpus().min(4) as i32);
        let signal = abort.clone();
        params.set_abort_callback_safe(move || signal.should_abort());

        let outcome = state.full(params, audio.samples());
        if abort.should_abort() {
            return Err("Whisper inference aborted".into());
        }
        outcome.map_err(|e| format!("Whisper inference failed: {e}"))?;

        let mut fragments = Vec::new();
        for seg_idx in 0..state.full_n_segments() {
            let Some(segment) = state.get_segment(seg_idx) else {
                continue;
            };
            let text = match segment.to_str() {
                Ok(t) => t.trim(),
                Err(_) => continue,
            };
            if text.is_empty() {
                continue;
            }
            // Segment timestamps are in centiseconds.
            fragments.push(RecognizedFragment::new(
                segment.start_timestamp() as f64 / 100.0,
                segment.end_timestamp() as f64 / 100.0,
                text,
            ));
        }

        Ok(fragments)
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

type Slot = Arc<Mutex<Option<Arc<dyn SpeechRecognizer>>>>;

/// Loaded recognizers keyed by model id.
///
/// Each id has its own lock, held while that model loads, so a download of
/// one model never blocks callers asking for another.
#[derive(Default)]
struct ModelCache {
    slots: Mutex<HashMap<String, Slot>>,
}

impl ModelCache {
    fn get_or_load(
        &self,
        model_id: &str,
        load: impl FnOnce() -> Result<Arc<dyn SpeechRecognizer>, RecognizerError>,
    ) -> Result<Arc<dyn SpeechRecognizer>, RecognizerError> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(slots.entry(model_id.to_string()).or_default())
        };
        let mut loaded = slot.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(recognizer) = loaded.as_ref() {
            return Ok(Arc::clone(recognizer));
        }
        let recognizer = load()?;
        *loaded = Some(Arc::clone(&recognizer));
        Ok(recognizer)
    }
}

/// Resolves Whisper models by identifier and keeps each loaded one for reuse.
pub struct WhisperRecognizerProvider {
    model_dir: Option<PathBuf>,
    language: String,
    loaded: ModelCache,
}

impl WhisperRecognizerProvider {
    pub fn new(model_dir: Option<PathBuf>, language: &str) -> Self {
        Self {
            model_dir,
            language: language.to_string(),
            loaded: ModelCache::default(),
        }
    }

    fn load(&self, model_id: &str) -> Result<Arc<dyn SpeechRecognizer>, RecognizerError> {
        let id = model_id.to_string();
        let progress: ProgressFn = Box::new(move |downloaded, total| {
            if total > 0 {
                log::debug!(
                    "Downloading {id}: {:.0}%",
                    downloaded as f64 / total as f64 * 100.0
                );
            } else {
                log::debug!("Downloading {id}: {downloaded} bytes");
            }
        });
        let path = resolve_whisper_model(model_id, self.model_dir.as_deref(), Some(progress))?;
        Ok(Arc::new(WhisperRecognizer::new(&path, &self.language)?))
    }
}

impl RecognizerProvider for WhisperRecognizerProvider {
    fn recognizer(&self, model_id: &str) -> Result<Arc<dyn SpeechRecognizer>, RecognizerError> {
        self.loaded.get_or_load(model_id, || self.load(model_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::ScriptedRecognizer;
    use crate::shared::cancel::CancelToken;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    fn stub() -> Arc<dyn SpeechRecognizer> {
        Arc::new(ScriptedRecognizer::echo())
    }

    #[test]
    fn test_cache_loads_each_model_once() {
        let cache = ModelCache::default();
        let loads = AtomicUsize::new(0);
        let load = || {
            loads.fetch_add(1, Ordering::SeqCst);
            Ok(stub())
        };

        let first = cache.get_or_load("small", load).unwrap();
        let second = cache.get_or_load("small", load).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cache_retries_after_failed_load() {
        let cache = ModelCache::default();
        assert!(cache.get_or_load("base", || Err("offline".into())).is_err());
        assert!(cache.get_or_load("base", || Ok(stub())).is_ok());
    }

    #[test]
    fn test_slow_load_does_not_block_other_models() {
        let cache = Arc::new(ModelCache::default());
        cache.get_or_load("tiny", || Ok(stub())).unwrap();
        let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(0);
        let (started_tx, started_rx) = crossbeam_channel::bounded::<()>(1);

        let loader = {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || {
                cache.get_or_load("medium", || {
                    started_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                    Ok(stub())
                })
            })
        };
        started_rx.recv().unwrap();

        let started = Instant::now();
        assert!(cache.get_or_load("tiny", || Err("must be cached".into())).is_ok());
        assert!(started.elapsed() < Duration::from_secs(1));

        release_tx.send(()).unwrap();
        assert!(loader.join().unwrap().is_ok());
    }

    #[test]
    fn test_new_nonexistent_path_error_message() {
        let result = WhisperRecognizer::new(Path::new("/nonexistent/model.bin"), "ru");
        let err = result.err().unwrap().to_string();
        assert!(
            err.contains("not found"),
            "Expected 'not found' in error, got: {err}"
        );
    }

    #[test]
    fn test_provider_rejects_invalid_model_id() {
        let dir = tempfile::tempdir().unwrap();
        let provider = WhisperRecognizerProvider::new(Some(dir.path().to_path_buf()), "ru");
        assert!(provider.recognizer("../etc/passwd").is_err());
    }

    #[test]
    #[ignore] // Requires whisper model file
    fn test_transcribe_does_not_crash_on_sine_wave() {
        let provider = WhisperRecognizerProvider::new(None, "ru");
        let recognizer = provider.recognizer("tiny").expect("Failed to load recognizer");

        let sample_rate = 16000u32;
        let len = (3.0 * sample_rate as f64) as usize;
        let samples: Vec<f32> = (0..len)
            .map(|i| {
                let t = i as f64 / sample_rate as f64;
                (2.0 * std::f64::consts::PI * 440.0 * t).sin() as f32
            })
            .collect();
        let audio = AudioSegment::new(samples, sample_rate, 1);

        let abort = AbortSignal::unbounded(CancelToken::new());
        let result = recognizer.transcribe(&audio, &abort);
        assert!(result.is_ok(), "Transcription should not error: {result:?}");
        let again = provider.recognizer("tiny").unwrap();
        assert!(Arc::ptr_eq(&recognizer, &again));
    }
}
