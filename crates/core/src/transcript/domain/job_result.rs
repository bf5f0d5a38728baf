use std::io::Read;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::shared::constants::{SUBTITLE_FILENAME, TRANSCRIPT_FILENAME};

use super::transcript_entry::{TranscriptEntry, TranscriptFragment};
use super::transcript_renderer::{render_plain, render_srt};

/// Time range of one chunk in the final result and whether it was recognized.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ChunkCoverage {
    pub chunk_index: usize,
    pub start: f64,
    pub end: f64,
    pub incomplete: bool,
}

/// Final artifacts of a finished job. Immutable once built.
#[derive(Clone, Debug, Serialize)]
pub struct JobResult {
    entries: Vec<TranscriptEntry>,
    coverage: Vec<ChunkCoverage>,
    transcript: String,
    subtitles: Option<String>,
    generated_at: DateTime<Utc>,
}

impl JobResult {
    pub fn new(
        entries: Vec<TranscriptEntry>,
        coverage: Vec<ChunkCoverage>,
        with_subtitles: bool,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let transcript = render_plain(&entries);
        let subtitles = with_subtitles.then(|| render_srt(&entries));
        Self {
            entries,
            coverage,
            transcript,
            subtitles,
            generated_at,
        }
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    /// Recognized fragments in final order, gaps left out.
    pub fn fragments(&self) -> impl Iterator<Item = &TranscriptFragment> {
        self.entries.iter().filter_map(TranscriptEntry::as_fragment)
    }

    pub fn coverage(&self) -> &[ChunkCoverage] {
        &self.coverage
    }

    pub fn gap_count(&self) -> usize {
        self.coverage.iter().filter(|c| c.incomplete).count()
    }

    /// Seconds of source audio accounted for, recognized or marked as a gap.
    pub fn covered_duration(&self) -> f64 {
        self.coverage.iter().map(|c| c.end - c.start).sum()
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn subtitles(&self) -> Option<&str> {
        self.subtitles.as_deref()
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// Files handed to the delivery side: the transcript, then subtitles if enabled.
    pub fn artifacts(&self) -> Vec<Artifact> {
        let mut artifacts = vec![Artifact {
            filename: TRANSCRIPT_FILENAME.to_string(),
            bytes: self.transcript.as_bytes().to_vec(),
        }];
        if let Some(srt) = &self.subtitles {
            artifacts.push(Artifact {
                filename: SUBTITLE_FILENAME.to_string(),
                bytes: srt.as_bytes().to_vec(),
            });
        }
        artifacts
    }
}

/// A UTF-8 document with its suggested file name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn reader(&self) -> impl Read + '_ {
        self.bytes.as_slice()
    }
}
