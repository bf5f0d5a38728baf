use std::path::{Path, PathBuf};

/// Mono PCM audio extracted from a job's source, stored as a WAV file.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedAudio {
    path: PathBuf,
    sample_rate: u32,
    total_samples: u64,
}

impl NormalizedAudio {
    pub fn new(path: PathBuf, sample_rate: u32, total_samples: u64) -> Self {
        Self {
            path,
            sample_rate,
            total_samples,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn total_samples(&self) -> u64 {
        self.total_samples
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.total_samples as f64 / self.sample_rate as f64
    }
}
