//! Per-photo download engine. Resolves the requested sizes of one photo,
//! runs change detection against the destination directory, and streams
//! whatever is missing or stale.
//!
//! Nothing here returns an error to the caller: one bad photo must not stop
//! an album, so failures come back as [`SyncOutcome::Failed`] (or `false`).

pub mod detect;
pub mod error;
pub mod file;
pub mod paths;
pub mod variant;

use std::path::Path;

use crate::photos::{AssetVersion, RemotePhoto};
use crate::retry::RetryConfig;
use crate::types::VersionSize;

use detect::Decision;
use error::DownloadError;

/// Settings shared by every photo of a pass.
#[derive(Debug, Clone, Copy)]
pub struct DownloadOptions {
    pub retry: RetryConfig,
    /// Emit a `Downloading <path> ...` line per initiated download.
    pub verbose: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            verbose: true,
        }
    }
}

/// Result of syncing one size of one photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A current copy was already on disk.
    Skipped,
    /// The photo does not offer this size, or the call was missing inputs.
    Unavailable,
    Downloaded,
    /// The transfer failed; `transient` says a later pass may succeed.
    Failed { transient: bool },
}

/// Stream `version` to `path`, stamping the photo's added date as mtime.
async fn fetch(
    photo: &RemotePhoto,
    version: &AssetVersion,
    path: &Path,
    supersede: Option<&Path>,
    retry: &RetryConfig,
) -> Result<(), DownloadError> {
    file::download_file(version, path, supersede, retry).await?;

    if let Some(added) = photo.added_date() {
        let mtime_path = path.to_path_buf();
        let ts = added.timestamp();
        let stamped = tokio::task::spawn_blocking(move || file::set_file_mtime(&mtime_path, ts)).await;
        match stamped {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("Could not set mtime on {}: {}", path.display(), e),
            Err(e) => tracing::warn!("mtime task failed for {}: {}", path.display(), e),
        }
    }
    Ok(())
}

/// Sync one size of one photo into `destination`.
///
/// Resolves the size, decides from the local directory whether to fetch,
/// moves a superseded original aside, and downloads. Missing inputs or a
/// size the photo does not offer yield [`SyncOutcome::Unavailable`].
pub async fn process_photo(
    photo: Option<&RemotePhoto>,
    size: VersionSize,
    destination: Option<&Path>,
    options: &DownloadOptions,
) -> SyncOutcome {
    let (Some(photo), Some(destination)) = (photo, destination) else {
        return SyncOutcome::Unavailable;
    };
    let Some((_, version)) = variant::resolve_variants(photo, &[size]).into_iter().next() else {
        return SyncOutcome::Unavailable;
    };

    let decision = detect::detect(destination, photo.filename(), size, version.size);
    let (path, supersede) = match &decision {
        Decision::Skip { .. } => return SyncOutcome::Skipped,
        Decision::Download { path } => (path, None),
        Decision::Upgrade { path, marker } => (path, Some(marker.as_path())),
    };

    if options.verbose {
        tracing::info!("Downloading {} ...", path.display());
    }

    match fetch(photo, version, path, supersede, &options.retry).await {
        Ok(()) => SyncOutcome::Downloaded,
        Err(e) => {
            tracing::error!("Failed to download {}: {}", path.display(), e);
            SyncOutcome::Failed {
                transient: e.is_retryable(),
            }
        }
    }
}

/// Download every requested size of `photo` into `destination`,
/// unconditionally, under the size-appropriate filenames.
///
/// Returns `false` when an input is missing, when none of the sizes is
/// offered, or when any transfer fails; `true` once every offered size has
/// been written.
pub async fn download_photo(
    photo: Option<&RemotePhoto>,
    sizes: Option<&[VersionSize]>,
    destination: Option<&Path>,
    options: &DownloadOptions,
) -> bool {
    let (Some(photo), Some(sizes), Some(destination)) = (photo, sizes, destination) else {
        return false;
    };
    let resolved = variant::resolve_variants(photo, sizes);
    if resolved.is_empty() {
        return false;
    }

    let mut ok = true;
    for (size, version) in resolved {
        let path = destination.join(paths::size_filename(photo.filename(), size));
        if options.verbose {
            tracing::info!("Downloading {} ...", path.display());
        }
        if let Err(e) = fetch(photo, version, &path, None, &options.retry).await {
            tracing::error!("Failed to download {}: {}", path.display(), e);
            ok = false;
        }
    }
    ok
}
