use std::path::Path;

use crate::audio::domain::audio_segment::AudioSegment;
use crate::shared::error::TranscriptionError;

/// Layout of every WAV file a job writes: signed 16-bit PCM.
pub fn pcm16_spec(sample_rate: u32, channels: u16) -> hound::WavSpec {
    hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

/// Header facts about a WAV file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WavInfo {
    pub sample_rate: u32,
    pub channels: u16,
    /// Samples per channel.
    pub frames: u64,
}

pub fn read_info(path: &Path) -> Result<WavInfo, TranscriptionError> {
    let reader = hound::WavReader::open(path).map_err(|e| wav_error(path, e))?;
    let spec = reader.spec();
    Ok(WavInfo {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        frames: reader.duration() as u64,
    })
}

/// Copy `count` frames starting at frame `start` from `src` into a new file `dst`.
pub fn copy_range(src: &Path, dst: &Path, start: u64, count: u64) -> Result<(), TranscriptionError> {
    let mut reader = hound::WavReader::open(src).map_err(|e| wav_error(src, e))?;
    let spec = reader.spec();
    let offset = u32::try_from(start).map_err(|_| {
        TranscriptionError::Invariant(format!("frame offset {start} exceeds WAV addressing"))
    })?;
    reader
        .seek(offset)
        .map_err(|e| TranscriptionError::storage(src, e))?;

    let mut writer = hound::WavWriter::create(dst, pcm16_spec(spec.sample_rate, spec.channels))
        .map_err(|e| wav_error(dst, e))?;
    let wanted = count * spec.channels as u64;
    let mut copied = 0u64;
    for sample in reader.samples::<i16>().take(wanted as usize) {
        let sample = sample.map_err(|e| wav_error(src, e))?;
        writer.write_sample(sample).map_err(|e| wav_error(dst, e))?;
        copied += 1;
    }
    writer.finalize().map_err(|e| wav_error(dst, e))?;

    if copied != wanted {
        return Err(TranscriptionError::Invariant(format!(
            "{} ended after {copied} of {wanted} samples",
            src.display()
        )));
    }
    Ok(())
}

/// Load a whole WAV file as normalized f32 samples.
pub fn read_segment(path: &Path) -> Result<AudioSegment, TranscriptionError> {
    let mut reader = hound::WavReader::open(path).map_err(|e| wav_error(path, e))?;
    let spec = reader.spec();
    let pcm = reader
        .samples::<i16>()
        .collect::<Result<Vec<i16>, _>>()
        .map_err(|e| wav_error(path, e))?;
    Ok(AudioSegment::from_pcm16(&pcm, spec.sample_rate, spec.channels))
}

/// I/O failures are storage problems; anything else means the audio itself is bad.
pub fn wav_error(path: &Path, err: hound::Error) -> TranscriptionError {
    match err {
        hound::Error::IoError(source) => TranscriptionError::storage(path, source),
        other => TranscriptionError::ExtractionFailed(format!("{}: {other}", path.display())),
    }
}
