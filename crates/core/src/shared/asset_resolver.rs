use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::constants::ASSET_CACHE_APP_DIR;

#[derive(Error, Debug)]
pub enum AssetResolveError {
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("download failed for {url}: HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("failed to write asset to {}: {source}", .path.display())]
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

/// Resolve a runtime asset (e.g. the label font) by name.
///
/// Returns the cached copy when present, otherwise downloads `url` into
/// the user cache directory first.
pub fn resolve(
    name: &str,
    url: &str,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, AssetResolveError> {
    resolve_in(&asset_cache_dir()?, name, url, progress)
}

/// Same as [`resolve`] with an explicit cache directory.
pub fn resolve_in(
    cache_dir: &Path,
    name: &str,
    url: &str,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, AssetResolveError> {
    let cached_path = cache_dir.join(name);
    if cached_path.exists() {
        log::debug!("Using cached asset {}", cached_path.display());
        return Ok(cached_path);
    }

    fs::create_dir_all(cache_dir).map_err(AssetResolveError::CacheDir)?;
    log::info!("Downloading {name} from {url}");
    download(url, &cached_path, progress)?;
    Ok(cached_path)
}

/// Platform-specific asset cache directory.
///
/// - macOS: `~/Library/Application Support/Human Detection/assets/`
/// - Linux: `$XDG_CACHE_HOME/Human Detection/assets/` or `~/.cache/Human Detection/assets/`
/// - Windows: `%LOCALAPPDATA%/Human Detection/assets/`
pub fn asset_cache_dir() -> Result<PathBuf, AssetResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join(ASSET_CACHE_APP_DIR).join("assets"))
            .ok_or(AssetResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join(ASSET_CACHE_APP_DIR).join("assets"))
            .ok_or(AssetResolveError::NoCacheDir)
    }
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), AssetResolveError> {
    let response = reqwest::blocking::get(url).map_err(|e| AssetResolveError::Download {
        url: url.to_string(),
        source: e,
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(AssetResolveError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let total = response.content_length().unwrap_or(0);
    let bytes = response.bytes().map_err(|e| AssetResolveError::Download {
        url: url.to_string(),
        source: e,
    })?;

    // Write to a temp file first, then rename for atomicity
    let temp_path = dest.with_extension("part");
    let write_err = |e| AssetResolveError::Write {
        path: temp_path.clone(),
        source: e,
    };
    let mut file = fs::File::create(&temp_path).map_err(write_err)?;

    let mut downloaded: u64 = 0;
    for chunk in bytes.chunks(1024 * 1024) {
        file.write_all(chunk).map_err(write_err)?;
        downloaded += chunk.len() as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }
    file.flush().map_err(write_err)?;
    drop(file);

    fs::rename(&temp_path, dest).map_err(|e| AssetResolveError::Write {
        path: dest.to_path_buf(),
        source: e,
    })?;

    Ok(())
}
