use std::io;
use std::path::{Path, PathBuf};

/// Position of one chunk inside the normalized audio, in samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkSpan {
    pub index: usize,
    pub start_sample: u64,
    pub sample_count: u64,
}

impl ChunkSpan {
    pub fn end_sample(&self) -> u64 {
        self.start_sample + self.sample_count
    }

    pub fn window(&self, sample_rate: u32) -> ChunkWindow {
        let rate = sample_rate as f64;
        ChunkWindow {
            index: self.index,
            start: self.start_sample as f64 / rate,
            end: self.end_sample() as f64 / rate,
        }
    }
}

/// A chunk's time range on the full-file timeline, in seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChunkWindow {
    pub index: usize,
    pub start: f64,
    pub end: f64,
}

impl ChunkWindow {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// A chunk written to its own WAV file, ready for recognition.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioChunk {
    span: ChunkSpan,
    sample_rate: u32,
    path: PathBuf,
}

impl AudioChunk {
    pub fn new(span: ChunkSpan, sample_rate: u32, path: PathBuf) -> Self {
        Self {
            span,
            sample_rate,
            path,
        }
    }

    pub fn index(&self) -> usize {
        self.span.index
    }

    pub fn span(&self) -> ChunkSpan {
        self.span
    }

    pub fn window(&self) -> ChunkWindow {
        self.span.window(self.sample_rate)
    }

    /// Seconds from the start of the full audio.
    pub fn start_offset(&self) -> f64 {
        self.window().start
    }

    pub fn duration(&self) -> f64 {
        self.window().duration()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the chunk's audio file. A file that is already gone is not an error.
    pub fn remove_file(&self) -> io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}
