use serde::Serialize;

/// One span of recognized text, timed relative to the chunk it came from.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecognizedFragment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl RecognizedFragment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Recognition output for one chunk.
///
/// An incomplete segment carries no fragments; it stands in for a chunk
/// whose recognition failed after every retry.
#[derive(Clone, Debug, PartialEq)]
pub struct RecognizedSegment {
    chunk_index: usize,
    fragments: Vec<RecognizedFragment>,
    failure: Option<String>,
}

impl RecognizedSegment {
    pub fn complete(chunk_index: usize, fragments: Vec<RecognizedFragment>) -> Self {
        Self {
            chunk_index,
            fragments,
            failure: None,
        }
    }

    pub fn incomplete(chunk_index: usize, reason: impl Into<String>) -> Self {
        Self {
            chunk_index,
            fragments: Vec::new(),
            failure: Some(reason.into()),
        }
    }

    pub fn chunk_index(&self) -> usize {
        self.chunk_index
    }

    pub fn fragments(&self) -> &[RecognizedFragment] {
        &self.fragments
    }

    pub fn is_incomplete(&self) -> bool {
        self.failure.is_some()
    }

    /// Why recognition was given up on, for incomplete segments.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }
}
