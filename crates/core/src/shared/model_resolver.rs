use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::constants::WHISPER_MODEL_BASE_URL;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("invalid recognition model identifier: {0:?}")]
    InvalidModelId(String),
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("download of {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// File name of the whisper.cpp weights for a model identifier such as `small`.
pub fn whisper_model_filename(model_id: &str) -> Result<String, ModelResolveError> {
    let valid = !model_id.is_empty()
        && model_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        && !model_id.starts_with('.');
    if !valid {
        return Err(ModelResolveError::InvalidModelId(model_id.to_string()));
    }
    Ok(format!("ggml-{model_id}.bin"))
}

/// Resolve whisper.cpp weights for `model_id`.
///
/// Resolution order:
/// 1. `model_dir`, when the operator points at pre-fetched models
/// 2. User cache directory
/// 3. Download to the cache
pub fn resolve_whisper_model(
    model_id: &str,
    model_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let name = whisper_model_filename(model_id)?;

    if let Some(dir) = model_dir {
        let local = dir.join(&name);
        if local.exists() {
            return Ok(local);
        }
    }

    let cache_dir = model_cache_dir()?;
    let cached_path = cache_dir.join(&name);
    if cached_path.exists() {
        return Ok(cached_path);
    }

    fs::create_dir_all(&cache_dir).map_err(ModelResolveError::CacheDir)?;
    let url = format!("{WHISPER_MODEL_BASE_URL}/{name}");
    log::info!("Downloading recognition model {model_id} from {url}");
    download(&url, &cached_path, progress)?;
    Ok(cached_path)
}

/// Per-user cache directory for recognition models.
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    dirs::cache_dir()
        .map(|d| d.join("recognbot").join("models"))
        .ok_or(ModelResolveError::NoCacheDir)
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let response = reqwest::blocking::get(url).map_err(|e| ModelResolveError::Download {
        url: url.to_string(),
        source: e,
    })?;
    if !response.status().is_success() {
        return Err(ModelResolveError::HttpStatus {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    let total = response.content_length().unwrap_or(0);
    let bytes = response.bytes().map_err(|e| ModelResolveError::Download {
        url: url.to_string(),
        source: e,
    })?;

    // Partial downloads never land under the final name.
    let temp_path = dest.with_extension("part");
    let write_err = |source| ModelResolveError::Write {
        path: temp_path.clone(),
        source,
    };
    let mut file = fs::File::create(&temp_path).map_err(write_err)?;

    let mut downloaded: u64 = 0;
    for chunk in bytes.chunks(4 * 1024 * 1024) {
        file.write_all(chunk).map_err(write_err)?;
        downloaded += chunk.len() as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }
    file.flush().map_err(write_err)?;
    drop(file);

    fs::rename(&temp_path, dest).map_err(|e| ModelResolveError::Write {
        path: dest.to_path_buf(),
        source: e,
    })
}
