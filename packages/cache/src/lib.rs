#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Filesystem cache for gazette PDFs.
//!
//! Maps an issue to a local path under `<root>/<year>/<month>/` and
//! guarantees at most one successful download per issue per cache root.
//! Downloads go to a `.part` file first and are renamed into place, so
//! an interrupted write can never satisfy [`is_cached`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use gazette_models::{GazetteIssue, IssueDate};

/// Timeout for PDF downloads. Longer than the locator's lookup timeout
/// since issues routinely run to tens of megabytes.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Suffix for in-flight download files.
const PARTIAL_SUFFIX: &str = ".part";

/// Errors from cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The PDF download failed at the transport/HTTP level.
    #[error("download failed: {0}")]
    Download(#[from] reqwest::Error),

    /// A filesystem operation failed while writing the cache.
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Builds a [`reqwest::Client`] configured for PDF downloads.
///
/// # Errors
///
/// Returns the underlying [`reqwest::Error`] if the client cannot be
/// constructed.
pub fn download_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().timeout(DOWNLOAD_TIMEOUT).build()
}

/// The default cache directory for an issue: `<base>/<year>/<month:02>`.
#[must_use]
pub fn default_cache_root(base: &Path, date: IssueDate) -> PathBuf {
    base.join(date.year().to_string())
        .join(format!("{:02}", date.month()))
}

/// The full cache path for an issue's PDF under a cache directory.
#[must_use]
pub fn cache_path(dir: &Path, issue: &GazetteIssue) -> PathBuf {
    dir.join(issue.pdf_file_name())
}

/// Validates that a directory exists (creating it if needed) and is
/// writable, by probe-writing and deleting a marker file.
///
/// Returns `false` instead of an error so callers can fall back to a
/// default cache root.
#[must_use]
pub fn ensure_directory(path: &Path) -> bool {
    if let Err(e) = std::fs::create_dir_all(path) {
        log::warn!("Cannot create cache directory {}: {e}", path.display());
        return false;
    }

    let probe = path.join(".write_probe");
    match std::fs::write(&probe, b"") {
        Ok(()) => {
            if let Err(e) = std::fs::remove_file(&probe) {
                log::warn!("Cannot remove write probe {}: {e}", probe.display());
            }
            true
        }
        Err(e) => {
            log::warn!("Cache directory {} is not writable: {e}", path.display());
            false
        }
    }
}

/// Whether a valid cached PDF is present at `path`.
///
/// A zero-byte file is treated as absent: it is the residue of a failed
/// write and must never be reused.
#[must_use]
pub fn is_cached(path: &Path) -> bool {
    std::fs::metadata(path).is_ok_and(|m| m.is_file() && m.len() > 0)
}

/// Downloads `url` to `dest`.
///
/// Parent directories are created as needed. Bytes are written to
/// `<dest>.part` and renamed into place only after the full body has
/// been persisted, so a crash mid-download leaves no file at `dest`.
///
/// # Errors
///
/// Returns [`CacheError::Download`] on transport/HTTP failure and
/// [`CacheError::Io`] on filesystem failure. No retries — retry policy
/// belongs to the orchestrating caller.
pub async fn download(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
) -> Result<(), CacheError> {
    log::info!("Downloading {url} to {}", dest.display());

    let response = client.get(url).send().await?.error_for_status()?;
    let bytes = response.bytes().await?;
    log::debug!("Downloaded {} bytes from {url}", bytes.len());

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let partial = partial_path(dest);
    std::fs::write(&partial, &bytes)?;
    std::fs::rename(&partial, dest)?;

    log::info!("PDF saved to {}", dest.display());
    Ok(())
}

/// Downloads `url` to `dest` unless a valid PDF is already cached.
///
/// Returns `true` if a download was performed, `false` on a cache hit.
///
/// # Errors
///
/// Propagates [`download`] failures.
pub async fn fetch_if_absent(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
) -> Result<bool, CacheError> {
    if is_cached(dest) {
        log::info!("Valid cached PDF found at {}", dest.display());
        return Ok(false);
    }

    download(client, url, dest).await?;
    Ok(true)
}

/// The in-flight sibling path for a destination file.
fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map_or_else(|| "download".to_owned(), |n| n.to_string_lossy().into_owned());
    name.push_str(PARTIAL_SUFFIX);
    dest.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(name);
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn zero_byte_file_is_not_cached() {
        let dir = temp_dir("gazette_cache_test_zero");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("empty.pdf");
        std::fs::write(&path, b"").unwrap();

        assert!(!is_cached(&path));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn non_empty_file_is_cached() {
        let dir = temp_dir("gazette_cache_test_nonempty");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("issue.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();

        assert!(is_cached(&path));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_file_is_not_cached() {
        assert!(!is_cached(Path::new("/nonexistent/gazette/issue.pdf")));
    }

    #[test]
    fn ensure_directory_creates_and_probes() {
        let dir = temp_dir("gazette_cache_test_ensure").join("2025").join("03");

        assert!(ensure_directory(&dir));
        assert!(dir.is_dir());
        assert!(!dir.join(".write_probe").exists());

        std::fs::remove_dir_all(dir.parent().unwrap().parent().unwrap()).unwrap();
    }

    #[test]
    fn default_root_uses_zero_padded_month() {
        let date = IssueDate::new(3, 3, 2025).unwrap();
        let root = default_cache_root(Path::new("diarios"), date);
        assert_eq!(root, Path::new("diarios").join("2025").join("03"));
    }

    #[test]
    fn cache_path_appends_remote_basename() {
        let date = IssueDate::new(3, 3, 2025).unwrap();
        let issue = GazetteIssue::new(
            date,
            "https://tcm.ioepa.com.br/arquivos/diario-1234.pdf".to_owned(),
        );
        let path = cache_path(Path::new("diarios/2025/03"), &issue);
        assert_eq!(path, Path::new("diarios/2025/03").join("diario-1234.pdf"));
    }

    #[test]
    fn partial_path_appends_suffix() {
        let p = partial_path(Path::new("diarios/2025/03/diario.pdf"));
        assert_eq!(p, Path::new("diarios/2025/03").join("diario.pdf.part"));
    }
}
