use std::fmt::Write;

use crate::shared::constants::GAP_MARKER;

use super::timecode::{format_clock, format_subtitle};
use super::transcript_entry::TranscriptEntry;

/// One line per entry: `[HH:MM:SS] text`, or for a gap
/// `[HH:MM:SS] [gap] HH:MM:SS-HH:MM:SS`.
pub fn render_plain(entries: &[TranscriptEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        let _ = match entry {
            TranscriptEntry::Speech(f) => writeln!(out, "[{}] {}", format_clock(f.start), f.text),
            TranscriptEntry::Gap { start, end, .. } => writeln!(
                out,
                "[{}] {GAP_MARKER} {}-{}",
                format_clock(*start),
                format_clock(*start),
                format_clock(*end)
            ),
        };
    }
    out
}

/// Numbered SubRip cues, one per entry, each followed by a blank line.
pub fn render_srt(entries: &[TranscriptEntry]) -> String {
    let mut out = String::new();
    for (i, entry) in entries.iter().enumerate() {
        let text = match entry {
            TranscriptEntry::Speech(f) => f.text.as_str(),
            TranscriptEntry::Gap { .. } => GAP_MARKER,
        };
        let _ = write!(
            out,
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            format_subtitle(entry.start()),
            format_subtitle(entry.end()),
            text
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::domain::transcript_entry::TranscriptFragment;

    fn speech(start: f64, end: f64, text: &str) -> TranscriptEntry {
        TranscriptEntry::Speech(TranscriptFragment {
            chunk_index: 0,
            start,
            end,
            text: text.into(),
        })
    }

    fn entries() -> Vec<TranscriptEntry> {
        vec![
            speech(1.25, 3.5, "Добрый день."),
            TranscriptEntry::Gap {
                chunk_index: 1,
                start: 410.0,
                end: 820.0,
            },
            speech(3725.0, 3726.75, "Спасибо."),
        ]
    }

    #[test]
    fn test_plain_lines() {
        let text = render_plain(&entries());
        assert_eq!(
            text,
            "[00:00:01] Добрый день.\n\
             [00:06:50] [gap] 00:06:50-00:13:40\n\
             [01:02:05] Спасибо.\n"
        );
    }

    #[test]
    fn test_srt_cues() {
        let srt = render_srt(&entries());
        assert_eq!(
            srt,
            "1\n00:00:01,250 --> 00:00:03,500\nДобрый день.\n\n\
             2\n00:06:50,000 --> 00:13:40,000\n[gap]\n\n\
             3\n01:02:05,000 --> 01:02:06,750\nСпасибо.\n\n"
        );
    }

    #[test]
    fn test_empty_input_renders_nothing() {
        assert_eq!(render_plain(&[]), "");
        assert_eq!(render_srt(&[]), "");
    }
}
