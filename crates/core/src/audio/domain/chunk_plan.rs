use crate::shared::error::TranscriptionError;

use super::audio_chunk::ChunkSpan;

/// Split `total_samples` of audio into evenly sized, contiguous chunks.
///
/// The chunk count starts at `ceil(duration / target)` and is moved into the
/// range that keeps every chunk inside `[min, max]` seconds. Audio shorter
/// than `min` becomes a single chunk. When no count satisfies both bounds the
/// `max` bound wins and chunks may fall below `min`.
///
/// Boundaries are `floor(i * N / n)`, so chunk lengths differ by at most one
/// sample and the spans cover `[0, N)` exactly once.
pub fn plan_chunks(
    total_samples: u64,
    sample_rate: u32,
    target_seconds: f64,
    min_seconds: f64,
    max_seconds: f64,
) -> Result<Vec<ChunkSpan>, TranscriptionError> {
    validate(sample_rate, target_seconds, min_seconds, max_seconds)?;
    if total_samples == 0 {
        return Err(TranscriptionError::Invariant(
            "cannot split empty audio".into(),
        ));
    }

    let rate = sample_rate as f64;
    let min_samples = (min_seconds * rate).ceil() as u64;
    let max_samples = ((max_seconds * rate).floor() as u64).max(1);
    let target_samples = ((target_seconds.clamp(min_seconds, max_seconds) * rate).round() as u64)
        .clamp(1, max_samples);

    let count = if total_samples < min_samples {
        1
    } else {
        chunk_count(total_samples, target_samples, min_samples, max_samples)
    };

    Ok(even_spans(total_samples, count))
}

fn validate(
    sample_rate: u32,
    target: f64,
    min: f64,
    max: f64,
) -> Result<(), TranscriptionError> {
    if sample_rate == 0 {
        return Err(TranscriptionError::InvalidDuration(
            "sample rate must be positive".into(),
        ));
    }
    if !target.is_finite() || target <= 0.0 {
        return Err(TranscriptionError::InvalidDuration(format!(
            "target duration must be positive, got {target}"
        )));
    }
    if !min.is_finite() || !max.is_finite() || min < 0.0 || max <= 0.0 {
        return Err(TranscriptionError::InvalidDuration(format!(
            "chunk bounds must be finite with a positive maximum, got [{min}, {max}]"
        )));
    }
    if min > max {
        return Err(TranscriptionError::InvalidDuration(format!(
            "minimum {min}s exceeds maximum {max}s"
        )));
    }
    Ok(())
}

fn chunk_count(total: u64, target: u64, min: u64, max: u64) -> usize {
    let preferred = total.div_ceil(target).max(1);
    // Fewest chunks that keep each one at or under `max`.
    let fewest = total.div_ceil(max).max(1);
    // Most chunks that keep each one at or over `min`.
    let most = if min == 0 { u64::MAX } else { total / min };

    if fewest <= most {
        preferred.clamp(fewest, most) as usize
    } else {
        log::warn!(
            "No chunk count fits {total} samples into [{min}, {max}]; using {fewest} shorter chunks"
        );
        fewest as usize
    }
}

fn even_spans(total: u64, count: usize) -> Vec<ChunkSpan> {
    let n = count as u128;
    let boundary = |i: u128| (i * total as u128 / n) as u64;
    (0..count)
        .map(|index| {
            let start = boundary(index as u128);
            let end = boundary(index as u128 + 1);
            ChunkSpan {
                index,
                start_sample: start,
                sample_count: end - start,
            }
        })
        .collect()
}
