use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::shared::constants::CHUNK_DIR_NAME;
use crate::shared::error::TranscriptionError;
use crate::video::domain::source_media::SourceMedia;

use super::job_status::JobId;

/// Scratch space owned by one job.
///
/// Holds the job's source file and a private directory for the normalized
/// audio and chunk files. Dropping the workspace deletes all of them, on
/// every exit path including errors, cancellation and panics.
pub struct JobWorkspace {
    dir: TempDir,
    source: SourceMedia,
}

impl JobWorkspace {
    /// Take ownership of `source` and create `<root>/job-<id>-*`.
    ///
    /// If the directory cannot be created the source is deleted before
    /// returning the error.
    pub fn create(root: &Path, job: JobId, source: SourceMedia) -> Result<Self, TranscriptionError> {
        let dir = fs::create_dir_all(root).and_then(|_| {
            tempfile::Builder::new()
                .prefix(&format!("job-{job}-"))
                .tempdir_in(root)
        });
        match dir {
            Ok(dir) => {
                log::debug!("Job {job} workspace at {}", dir.path().display());
                Ok(Self { dir, source })
            }
            Err(e) => {
                remove_source(&source);
                Err(TranscriptionError::storage(root, e))
            }
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn source(&self) -> &SourceMedia {
        &self.source
    }

    pub fn chunk_dir(&self) -> PathBuf {
        self.dir.path().join(CHUNK_DIR_NAME)
    }
}

impl Drop for JobWorkspace {
    fn drop(&mut self) {
        remove_source(&self.source);
        log::debug!("Removing job workspace {}", self.dir.path().display());
    }
}

fn remove_source(source: &SourceMedia) {
    if let Err(e) = source.remove() {
        log::warn!("Could not delete {}: {e}", source.path().display());
    }
}
