use serde::Serialize;

/// A recognized fragment placed on the full-file timeline.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TranscriptFragment {
    pub chunk_index: usize,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// One line of the final transcript: speech, or the marker for a chunk
/// whose recognition was given up on.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TranscriptEntry {
    Speech(TranscriptFragment),
    Gap {
        chunk_index: usize,
        start: f64,
        end: f64,
    },
}

impl TranscriptEntry {
    pub fn chunk_index(&self) -> usize {
        match self {
            Self::Speech(f) => f.chunk_index,
            Self::Gap { chunk_index, .. } => *chunk_index,
        }
    }

    pub fn start(&self) -> f64 {
        match self {
            Self::Speech(f) => f.start,
            Self::Gap { start, .. } => *start,
        }
    }

    pub fn end(&self) -> f64 {
        match self {
            Self::Speech(f) => f.end,
            Self::Gap { end, .. } => *end,
        }
    }

    pub fn is_gap(&self) -> bool {
        matches!(self, Self::Gap { .. })
    }

    pub fn as_fragment(&self) -> Option<&TranscriptFragment> {
        match self {
            Self::Speech(f) => Some(f),
            Self::Gap { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gap_serializes_with_kind_tag() {
        let gap = TranscriptEntry::Gap {
            chunk_index: 1,
            start: 600.0,
            end: 1200.0,
        };
        let json = serde_json::to_value(&gap).unwrap();
        assert_eq!(json["kind"], "gap");
        assert_eq!(json["chunk_index"], 1);
        assert!(gap.is_gap());
        assert!(gap.as_fragment().is_none());
    }

    #[test]
    fn test_speech_accessors() {
        let entry = TranscriptEntry::Speech(TranscriptFragment {
            chunk_index: 0,
            start: 1.5,
            end: 2.5,
            text: "привет".into(),
        });
        assert_eq!(entry.start(), 1.5);
        assert_eq!(entry.end(), 2.5);
        assert_eq!(entry.as_fragment().unwrap().text, "привет");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["kind"], "speech");
        assert_eq!(json["text"], "привет");
    }
}
