use std::fs::File;
use std::io::BufWriter;
use std::time::Instant;

use ffmpeg_next::format::{sample, Sample};
use ffmpeg_next::util::frame::audio::Audio;
use ffmpeg_next::ChannelLayout;

use crate::audio::infrastructure::wav_file::{pcm16_spec, wav_error};
use crate::shared::error::TranscriptionError;
use crate::video::domain::audio_extractor::{AudioExtractor, ExtractionRequest};

type WavSink = hound::WavWriter<BufWriter<File>>;

/// Decodes the best audio stream of a container with ffmpeg-next and
/// resamples it to packed 16-bit PCM.
pub struct FfmpegAudioExtractor;

impl AudioExtractor for FfmpegAudioExtractor {
    fn extract(&self, request: &ExtractionRequest<'_>) -> Result<(), TranscriptionError> {
        let result = extract_to_wav(request);
        if result.is_err() {
            let _ = std::fs::remove_file(request.output);
        }
        result
    }
}

fn extract_to_wav(request: &ExtractionRequest<'_>) -> Result<(), TranscriptionError> {
    ffmpeg_next::init().map_err(|e| ffmpeg_failure("init", e))?;

    let mut ictx = ffmpeg_next::format::input(request.input)
        .map_err(|e| TranscriptionError::unsupported(request.input, e.to_string()))?;

    let audio_stream = ictx
        .streams()
        .best(ffmpeg_next::media::Type::Audio)
        .ok_or_else(|| TranscriptionError::unsupported(request.input, "no audio track"))?;
    let audio_stream_index = audio_stream.index();

    let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(audio_stream.parameters())
        .map_err(|e| TranscriptionError::unsupported(request.input, e.to_string()))?;
    let mut decoder = codec_ctx
        .decoder()
        .audio()
        .map_err(|e| TranscriptionError::unsupported(request.input, e.to_string()))?;

    let target_layout = match request.channels {
        1 => ChannelLayout::MONO,
        _ => ChannelLayout::STEREO,
    };
    let mut resampler = ffmpeg_next::software::resampling::Context::get(
        decoder.format(),
        decoder.channel_layout(),
        decoder.rate(),
        Sample::I16(sample::Type::Packed),
        target_layout,
        request.sample_rate,
    )
    .map_err(|e| TranscriptionError::unsupported(request.input, e.to_string()))?;

    let mut writer = hound::WavWriter::create(
        request.output,
        pcm16_spec(request.sample_rate, request.channels),
    )
    .map_err(|e| wav_error(request.output, e))?;

    let mut decoded = Audio::empty();
    let mut resampled = Audio::empty();
    let mut written = 0u64;

    for (stream, packet) in ictx.packets() {
        request.cancel.check()?;
        if Instant::now() >= request.deadline {
            return Err(TranscriptionError::ExtractionFailed(format!(
                "{} did not finish before the extraction deadline",
                request.input.display()
            )));
        }
        if stream.index() != audio_stream_index {
            continue;
        }

        decoder
            .send_packet(&packet)
            .map_err(|e| ffmpeg_failure("decode", e))?;
        while decoder.receive_frame(&mut decoded).is_ok() {
            resampler
                .run(&decoded, &mut resampled)
                .map_err(|e| ffmpeg_failure("resample", e))?;
            written += write_frame(&resampled, request, &mut writer)?;
        }
    }

    decoder.send_eof().map_err(|e| ffmpeg_failure("flush", e))?;
    while decoder.receive_frame(&mut decoded).is_ok() {
        resampler
            .run(&decoded, &mut resampled)
            .map_err(|e| ffmpeg_failure("resample", e))?;
        written += write_frame(&resampled, request, &mut writer)?;
    }

    // The resampler may hold buffered samples.
    if let Ok(Some(delay)) = resampler.flush(&mut resampled) {
        if delay.output > 0 {
            written += write_frame(&resampled, request, &mut writer)?;
        }
    }

    writer.finalize().map_err(|e| wav_error(request.output, e))?;
    log::debug!(
        "Extracted {written} frames from {} into {}",
        request.input.display(),
        request.output.display()
    );
    Ok(())
}

/// Append a packed i16 frame to the WAV sink, returning frames written.
fn write_frame(
    frame: &Audio,
    request: &ExtractionRequest<'_>,
    writer: &mut WavSink,
) -> Result<u64, TranscriptionError> {
    let frames = frame.samples();
    if frames == 0 {
        return Ok(0);
    }
    let data = frame.data(0);
    let byte_len = (frames * request.channels as usize * 2).min(data.len());
    for pair in data[..byte_len].chunks_exact(2) {
        writer
            .write_sample(i16::from_ne_bytes([pair[0], pair[1]]))
            .map_err(|e| wav_error(request.output, e))?;
    }
    Ok(frames as u64)
}

fn ffmpeg_failure(stage: &str, err: ffmpeg_next::Error) -> TranscriptionError {
    TranscriptionError::ExtractionFailed(format!("ffmpeg {stage} failed: {err}"))
}
