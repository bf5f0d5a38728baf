use std::path::Path;
use std::time::{Duration, Instant};

use crate::audio::infrastructure::wav_file;
use crate::shared::cancel::CancelToken;
use crate::shared::config::TranscriptionConfig;
use crate::shared::constants::NORMALIZED_AUDIO_FILENAME;
use crate::shared::error::TranscriptionError;
use crate::video::domain::audio_extractor::{AudioExtractor, ExtractionRequest};
use crate::video::domain::normalized_audio::NormalizedAudio;
use crate::video::domain::source_media::SourceMedia;

/// Turns a source video into normalized mono audio on disk.
pub struct MediaProber {
    extractor: Box<dyn AudioExtractor>,
    supported_extensions: Vec<String>,
    sample_rate: u32,
    channels: u16,
    timeout: Duration,
}

impl MediaProber {
    pub fn new(extractor: Box<dyn AudioExtractor>, config: &TranscriptionConfig) -> Self {
        Self {
            extractor,
            supported_extensions: config.supported_extensions.clone(),
            sample_rate: config.sample_rate,
            channels: config.channels,
            timeout: config.extraction_timeout,
        }
    }

    /// Extract the audio of `source` into `output_dir`.
    ///
    /// The written file belongs to the caller, which deletes it with the
    /// rest of the job's scratch space.
    pub fn probe(
        &self,
        source: &SourceMedia,
        output_dir: &Path,
        cancel: &CancelToken,
    ) -> Result<NormalizedAudio, TranscriptionError> {
        let container = source.container().unwrap_or_default();
        if !self.supported_extensions.iter().any(|e| e == container) {
            return Err(TranscriptionError::unsupported(
                source.path(),
                format!("container {container:?} is not in the allow-list"),
            ));
        }
        cancel.check()?;

        let output = output_dir.join(NORMALIZED_AUDIO_FILENAME);
        let request = ExtractionRequest {
            input: source.path(),
            output: &output,
            sample_rate: self.sample_rate,
            channels: self.channels,
            deadline: Instant::now() + self.timeout,
            cancel,
        };
        self.extractor.extract(&request)?;
        cancel.check()?;

        if !output.exists() {
            return Err(TranscriptionError::ExtractionFailed(format!(
                "extractor reported success but wrote no file at {}",
                output.display()
            )));
        }
        let info = wav_file::read_info(&output)?;
        if info.sample_rate != self.sample_rate || info.channels != self.channels {
            return Err(TranscriptionError::ExtractionFailed(format!(
                "expected {} Hz / {} ch, got {} Hz / {} ch",
                self.sample_rate, self.channels, info.sample_rate, info.channels
            )));
        }
        if info.frames == 0 {
            return Err(TranscriptionError::ExtractionFailed(
                "extracted audio is empty".into(),
            ));
        }

        let audio = NormalizedAudio::new(output, info.sample_rate, info.frames);
        log::info!(
            "Probed {} ({} bytes): {:.1}s of audio",
            source.path().display(),
            source.byte_size(),
            audio.duration()
        );
        Ok(audio)
    }
}
