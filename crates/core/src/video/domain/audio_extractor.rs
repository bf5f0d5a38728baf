use std::path::Path;
use std::time::Instant;

use crate::shared::cancel::CancelToken;
use crate::shared::error::TranscriptionError;

/// One extraction call: demux `input` and write its audio track to `output`
/// as 16-bit PCM WAV at `sample_rate` with `channels` channels.
#[derive(Clone, Copy, Debug)]
pub struct ExtractionRequest<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub sample_rate: u32,
    pub channels: u16,
    /// The call must give up with `ExtractionFailed` once this passes.
    pub deadline: Instant,
    pub cancel: &'a CancelToken,
}

/// Domain interface for the audio-extraction tool.
///
/// Implementations report undecodable containers or codecs as
/// `UnsupportedFormat`, any other tool failure as `ExtractionFailed`, and
/// stop with `Cancelled` when the request's token fires.
pub trait AudioExtractor: Send + Sync {
    fn extract(&self, request: &ExtractionRequest<'_>) -> Result<(), TranscriptionError>;
}
