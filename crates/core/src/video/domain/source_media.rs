use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::shared::error::TranscriptionError;

/// An uploaded video on local storage, owned by exactly one job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceMedia {
    path: PathBuf,
    container: Option<String>,
    byte_size: u64,
}

impl SourceMedia {
    /// Describe an existing file. Fails with a storage error if it cannot be read.
    pub fn open(path: &Path) -> Result<Self, TranscriptionError> {
        let metadata = fs::metadata(path).map_err(|e| TranscriptionError::storage(path, e))?;
        if !metadata.is_file() {
            return Err(TranscriptionError::storage(
                path,
                io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
            ));
        }
        Ok(Self {
            path: path.to_path_buf(),
            container: container_of(path),
            byte_size: metadata.len(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lowercase file extension, if any.
    pub fn container(&self) -> Option<&str> {
        self.container.as_deref()
    }

    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }

    /// Delete the file. A file that is already gone is not an error.
    pub fn remove(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// Copy an externally owned file into `dir` under a random name that keeps
/// its extension. The copy belongs to the job; the original is untouched.
pub fn stage_source(external: &Path, dir: &Path) -> Result<SourceMedia, TranscriptionError> {
    fs::create_dir_all(dir).map_err(|e| TranscriptionError::storage(dir, e))?;
    let name = match container_of(external) {
        Some(ext) => format!("{}.{ext}", Uuid::new_v4()),
        None => Uuid::new_v4().to_string(),
    };
    let staged = dir.join(name);
    if let Err(e) = fs::copy(external, &staged) {
        let _ = fs::remove_file(&staged);
        let path = if external.exists() { staged.as_path() } else { external };
        return Err(TranscriptionError::storage(path, e));
    }
    log::debug!("Staged {} as {}", external.display(), staged.display());
    SourceMedia::open(&staged)
}

fn container_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| e.to_lowercase())
}
