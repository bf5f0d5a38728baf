use std::fs;
use std::path::{Path, PathBuf};

use crate::audio::domain::audio_chunk::{AudioChunk, ChunkSpan, ChunkWindow};
use crate::audio::domain::chunk_plan::plan_chunks;
use crate::shared::error::TranscriptionError;
use crate::video::domain::normalized_audio::NormalizedAudio;

use super::wav_file;

/// Splits normalized audio into bounded chunks stored as separate WAV files.
pub struct Chunker {
    output_dir: PathBuf,
}

impl Chunker {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Plan the chunks of `audio`. No chunk file is written until it is
    /// materialized through the returned sequence.
    pub fn split(
        &self,
        audio: &NormalizedAudio,
        target_seconds: f64,
        min_seconds: f64,
        max_seconds: f64,
    ) -> Result<ChunkSequence, TranscriptionError> {
        let spans = plan_chunks(
            audio.total_samples(),
            audio.sample_rate(),
            target_seconds,
            min_seconds,
            max_seconds,
        )?;
        fs::create_dir_all(&self.output_dir)
            .map_err(|e| TranscriptionError::storage(&self.output_dir, e))?;

        log::info!(
            "Split {:.1}s of audio into {} chunks",
            audio.duration(),
            spans.len()
        );

        Ok(ChunkSequence {
            source: audio.path().to_path_buf(),
            sample_rate: audio.sample_rate(),
            spans,
            output_dir: self.output_dir.clone(),
        })
    }
}

/// A finite, restartable sequence of chunks over one audio file.
///
/// Each chunk is regenerated from its span and the parent audio on demand,
/// so a single chunk can be rebuilt without touching its siblings.
#[derive(Debug)]
pub struct ChunkSequence {
    source: PathBuf,
    sample_rate: u32,
    spans: Vec<ChunkSpan>,
    output_dir: PathBuf,
}

impl ChunkSequence {
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn spans(&self) -> &[ChunkSpan] {
        &self.spans
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn windows(&self) -> Vec<ChunkWindow> {
        self.spans.iter().map(|s| s.window(self.sample_rate)).collect()
    }

    pub fn chunk_path(&self, index: usize) -> PathBuf {
        self.output_dir.join(format!("chunk_{index:04}.wav"))
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write chunk `index` to its own file, overwriting any earlier copy.
    pub fn materialize(&self, index: usize) -> Result<AudioChunk, TranscriptionError> {
        let span = *self.spans.get(index).ok_or_else(|| {
            TranscriptionError::Invariant(format!(
                "chunk {index} requested from a sequence of {}",
                self.spans.len()
            ))
        })?;
        let path = self.chunk_path(index);
        wav_file::copy_range(&self.source, &path, span.start_sample, span.sample_count)?;
        Ok(AudioChunk::new(span, self.sample_rate, path))
    }

    pub fn iter(&self) -> impl Iterator<Item = Result<AudioChunk, TranscriptionError>> + '_ {
        (0..self.spans.len()).map(move |i| self.materialize(i))
    }
}
