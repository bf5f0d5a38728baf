use chrono::Utc;

use crate::audio::domain::audio_chunk::ChunkWindow;
use crate::audio::domain::recognized_segment::RecognizedSegment;
use crate::shared::error::TranscriptionError;

use super::job_result::{ChunkCoverage, JobResult};
use super::transcript_entry::{TranscriptEntry, TranscriptFragment};

/// Tolerance when checking that consecutive chunks touch.
const BOUNDARY_EPSILON: f64 = 1e-6;

/// Merges per-chunk recognition output into one time-coded transcript.
#[derive(Clone, Copy, Debug)]
pub struct TranscriptAssembler {
    subtitles: bool,
}

impl TranscriptAssembler {
    pub fn new(subtitles: bool) -> Self {
        Self { subtitles }
    }

    /// Build the job result from every chunk's window and its segment.
    ///
    /// Inputs may arrive in any order; both are indexed by chunk before
    /// anything is rebased. Each chunk must have exactly one segment and the
    /// chunks must tile the timeline without gaps or overlaps.
    ///
    /// Rebased fragment times are clamped into their chunk's window and
    /// stably sorted by start. Blank fragments are dropped. An incomplete
    /// segment becomes a single gap entry spanning its chunk.
    pub fn assemble(
        &self,
        chunks: &[ChunkWindow],
        mut segments: Vec<RecognizedSegment>,
    ) -> Result<JobResult, TranscriptionError> {
        let mut windows = chunks.to_vec();
        windows.sort_by_key(|w| w.index);
        segments.sort_by_key(|s| s.chunk_index());
        validate(&windows, &segments)?;

        let mut entries = Vec::new();
        let mut coverage = Vec::with_capacity(windows.len());
        for (window, segment) in windows.iter().zip(&segments) {
            coverage.push(ChunkCoverage {
                chunk_index: window.index,
                start: window.start,
                end: window.end,
                incomplete: segment.is_incomplete(),
            });

            if segment.is_incomplete() {
                entries.push(TranscriptEntry::Gap {
                    chunk_index: window.index,
                    start: window.start,
                    end: window.end,
                });
                continue;
            }

            let mut rebased: Vec<TranscriptFragment> = segment
                .fragments()
                .iter()
                .filter_map(|f| {
                    // One line per fragment in both renderings.
                    let text = f.text.split_whitespace().collect::<Vec<_>>().join(" ");
                    if text.is_empty() {
                        return None;
                    }
                    let start = rebase(window, f.start, window.start);
                    let end = rebase(window, f.end, start).max(start);
                    Some(TranscriptFragment {
                        chunk_index: window.index,
                        start,
                        end,
                        text,
                    })
                })
                .collect();
            rebased.sort_by(|a, b| a.start.total_cmp(&b.start));
            entries.extend(rebased.into_iter().map(TranscriptEntry::Speech));
        }

        Ok(JobResult::new(entries, coverage, self.subtitles, Utc::now()))
    }
}

/// Shift a chunk-relative time onto the full timeline, inside the chunk.
fn rebase(window: &ChunkWindow, relative: f64, fallback: f64) -> f64 {
    if !relative.is_finite() {
        return fallback;
    }
    (window.start + relative).clamp(window.start, window.end)
}

fn validate(windows: &[ChunkWindow], segments: &[RecognizedSegment]) -> Result<(), TranscriptionError> {
    if windows.is_empty() {
        return Err(TranscriptionError::Invariant("no chunks to assemble".into()));
    }
    if windows.len() != segments.len() {
        return Err(TranscriptionError::Invariant(format!(
            "{} chunks but {} recognition results",
            windows.len(),
            segments.len()
        )));
    }
    for (position, (window, segment)) in windows.iter().zip(segments).enumerate() {
        if window.index != position {
            return Err(TranscriptionError::Invariant(format!(
                "chunk indices are not contiguous: expected {position}, found {}",
                window.index
            )));
        }
        if segment.chunk_index() != position {
            return Err(TranscriptionError::Invariant(format!(
                "no recognition result for chunk {position}"
            )));
        }
        if !(window.start.is_finite() && window.end.is_finite()) || window.end < window.start {
            return Err(TranscriptionError::Invariant(format!(
                "chunk {position} has an invalid range [{}, {}]",
                window.start, window.end
            )));
        }
    }
    if windows[0].start.abs() > BOUNDARY_EPSILON {
        return Err(TranscriptionError::Invariant(format!(
            "first chunk starts at {}s instead of 0",
            windows[0].start
        )));
    }
    for pair in windows.windows(2) {
        if (pair[1].start - pair[0].end).abs() > BOUNDARY_EPSILON {
            return Err(TranscriptionError::Invariant(format!(
                "chunks {} and {} do not touch ({}s vs {}s)",
                pair[0].index, pair[1].index, pair[0].end, pair[1].start
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::domain::recognized_segment::RecognizedFragment;
    use approx::assert_relative_eq;

    fn windows(durations: &[f64]) -> Vec<ChunkWindow> {
        let mut start = 0.0;
        durations
            .iter()
            .enumerate()
            .map(|(index, d)| {
                let w = ChunkWindow {
                    index,
                    start,
                    end: start + d,
                };
                start += d;
                w
            })
            .collect()
    }

    fn frag(start: f64, end: f64, text: &str) -> RecognizedFragment {
        RecognizedFragment::new(start, end, text)
    }

    fn five_segments_with_second_failed() -> Vec<RecognizedSegment> {
        (0..5)
            .map(|i| {
                if i == 1 {
                    RecognizedSegment::incomplete(i, "timeout")
                } else {
                    RecognizedSegment::complete(i, vec![frag(1.0, 2.0, &format!("part {i}"))])
                }
            })
            .collect()
    }

    #[test]
    fn test_rebases_by_chunk_offset() {
        let chunks = windows(&[410.0, 410.0, 410.0]);
        let segments = vec![
            RecognizedSegment::complete(0, vec![frag(0.5, 2.0, "один")]),
            RecognizedSegment::complete(1, vec![frag(3.0, 4.0, "два")]),
            RecognizedSegment::complete(2, vec![frag(0.0, 1.0, "три")]),
        ];

        let result = TranscriptAssembler::new(false).assemble(&chunks, segments).unwrap();

        let starts: Vec<f64> = result.fragments().map(|f| f.start).collect();
        assert_eq!(starts, [0.5, 413.0, 820.0]);
        assert_eq!(
            result.transcript(),
            "[00:00:00] один\n[00:06:53] два\n[00:13:40] три\n"
        );
    }

    #[test]
    fn test_arrival_order_does_not_matter() {
        let chunks = windows(&[300.0, 300.0, 300.0]);
        let mut segments: Vec<RecognizedSegment> = (0..3)
            .map(|i| RecognizedSegment::complete(i, vec![frag(1.0, 2.0, &i.to_string())]))
            .collect();
        let in_order = TranscriptAssembler::new(true)
            .assemble(&chunks, segments.clone())
            .unwrap();

        segments.reverse();
        let mut shuffled_chunks = chunks.clone();
        shuffled_chunks.swap(0, 2);
        let reversed = TranscriptAssembler::new(true)
            .assemble(&shuffled_chunks, segments)
            .unwrap();

        assert_eq!(in_order.transcript(), reversed.transcript());
        assert_eq!(in_order.subtitles(), reversed.subtitles());
    }

    #[test]
    fn test_failed_chunk_becomes_gap_line() {
        let chunks = windows(&[400.0; 5]);
        let result = TranscriptAssembler::new(true)
            .assemble(&chunks, five_segments_with_second_failed())
            .unwrap();

        let lines: Vec<&str> = result.transcript().lines().collect();
        assert_eq!(
            lines,
            [
                "[00:00:01] part 0",
                "[00:06:40] [gap] 00:06:40-00:13:20",
                "[00:13:21] part 2",
                "[00:20:01] part 3",
                "[00:26:41] part 4",
            ]
        );
        assert!(result.subtitles().unwrap().contains("00:06:40,000 --> 00:13:20,000\n[gap]"));
        assert_eq!(result.gap_count(), 1);
    }

    #[test]
    fn test_sorted_and_fully_covered() {
        let chunks = windows(&[410.0, 410.0, 410.0]);
        let segments = vec![
            RecognizedSegment::complete(0, vec![frag(5.0, 6.0, "b"), frag(1.0, 2.0, "a")]),
            RecognizedSegment::incomplete(1, "engine"),
            RecognizedSegment::complete(2, vec![frag(0.0, 500.0, "long")]),
        ];

        let result = TranscriptAssembler::new(false).assemble(&chunks, segments).unwrap();

        let starts: Vec<f64> = result.entries().iter().map(|e| e.start()).collect();
        assert!(starts.windows(2).all(|w| w[0] <= w[1]), "{starts:?}");
        assert_relative_eq!(result.covered_duration(), 1230.0);
        let last = result.fragments().last().unwrap();
        assert_relative_eq!(last.end, 1230.0);
    }

    #[test]
    fn test_reassembly_is_byte_identical() {
        let chunks = windows(&[400.0; 5]);
        let assembler = TranscriptAssembler::new(true);
        let first = assembler
            .assemble(&chunks, five_segments_with_second_failed())
            .unwrap();
        let second = assembler
            .assemble(&chunks, five_segments_with_second_failed())
            .unwrap();
        assert_eq!(first.transcript(), second.transcript());
        assert_eq!(first.subtitles(), second.subtitles());
    }

    #[test]
    fn test_out_of_window_times_are_clamped() {
        let chunks = windows(&[10.0, 10.0]);
        let segments = vec![
            RecognizedSegment::complete(0, vec![frag(-1.0, 3.0, "early")]),
            RecognizedSegment::complete(1, vec![frag(8.0, 15.0, "late"), frag(f64::NAN, 2.0, "nan")]),
        ];
        let result = TranscriptAssembler::new(false).assemble(&chunks, segments).unwrap();
        let spans: Vec<(f64, f64)> = result.fragments().map(|f| (f.start, f.end)).collect();
        assert_eq!(spans, [(0.0, 3.0), (10.0, 12.0), (18.0, 20.0)]);
    }

    #[test]
    fn test_blank_fragments_are_dropped_and_text_trimmed() {
        let chunks = windows(&[10.0]);
        let segments = vec![RecognizedSegment::complete(
            0,
            vec![frag(0.0, 1.0, "   "), frag(1.0, 2.0, "  да  ")],
        )];
        let result = TranscriptAssembler::new(false).assemble(&chunks, segments).unwrap();
        assert_eq!(result.transcript(), "[00:00:01] да\n");
    }

    #[test]
    fn test_multiline_fragment_renders_on_one_line() {
        let chunks = windows(&[10.0]);
        let segments = vec![RecognizedSegment::complete(
            0,
            vec![frag(1.0, 2.0, "первая\nвторая\n\n  строка")],
        )];
        let result = TranscriptAssembler::new(true).assemble(&chunks, segments).unwrap();

        assert_eq!(result.transcript(), "[00:00:01] первая вторая строка\n");
        let srt = result.subtitles().unwrap();
        assert!(srt.contains("00:00:01,000 --> 00:00:02,000\nпервая вторая строка\n"));
        assert_eq!(srt.trim_end().split("\n\n").count(), 1, "{srt}");
    }

    #[test]
    fn test_missing_segment_is_invariant_violation() {
        let chunks = windows(&[10.0, 10.0]);
        let segments = vec![RecognizedSegment::complete(0, vec![])];
        let result = TranscriptAssembler::new(false).assemble(&chunks, segments);
        assert!(matches!(result, Err(TranscriptionError::Invariant(_))));
    }

    #[test]
    fn test_duplicate_segment_is_invariant_violation() {
        let chunks = windows(&[10.0, 10.0]);
        let segments = vec![
            RecognizedSegment::complete(0, vec![]),
            RecognizedSegment::complete(0, vec![]),
        ];
        let result = TranscriptAssembler::new(false).assemble(&chunks, segments);
        assert!(matches!(result, Err(TranscriptionError::Invariant(_))));
    }

    #[test]
    fn test_overlapping_chunks_are_invariant_violation() {
        let chunks = vec![
            ChunkWindow {
                index: 0,
                start: 0.0,
                end: 10.0,
            },
            ChunkWindow {
                index: 1,
                start: 9.0,
                end: 20.0,
            },
        ];
        let segments = vec![
            RecognizedSegment::complete(0, vec![]),
            RecognizedSegment::complete(1, vec![]),
        ];
        let result = TranscriptAssembler::new(false).assemble(&chunks, segments);
        assert!(matches!(result, Err(TranscriptionError::Invariant(_))));
    }

    #[test]
    fn test_empty_input_is_invariant_violation() {
        let result = TranscriptAssembler::new(false).assemble(&[], Vec::new());
        assert!(matches!(result, Err(TranscriptionError::Invariant(_))));
    }
}
