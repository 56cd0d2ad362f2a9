//! Album syncer and sync pass.
//!
//! A pass resolves the configured albums (or the whole library), gives each
//! one its own subdirectory under the destination root and runs every photo
//! through [`process_photo`] for every requested size. Per-photo failures are
//! counted and logged; only service-level failures abort a pass.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use crate::config::PhotosConfig;
use crate::download::paths::{add_dedup_suffix, clean_filename, size_filename};
use crate::download::{process_photo, DownloadOptions, SyncOutcome};
use crate::photos::{PhotoAlbum, PhotosService, RemotePhoto, ServiceError};
use crate::types::VersionSize;

/// Subdirectory used when no album filter is configured.
pub const ALL_PHOTOS_DIR: &str = "all";

/// What a pass (or one album of it) did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncSummary {
    pub downloaded: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
    pub skipped: usize,
    pub unavailable: usize,
}

impl SyncSummary {
    fn record(&mut self, outcome: SyncOutcome, path: PathBuf) {
        match outcome {
            SyncOutcome::Downloaded => self.downloaded.push(path),
            SyncOutcome::Failed { .. } => self.failed.push(path),
            SyncOutcome::Skipped => self.skipped += 1,
            SyncOutcome::Unavailable => self.unavailable += 1,
        }
    }

    pub fn merge(&mut self, other: SyncSummary) {
        self.downloaded.extend(other.downloaded);
        self.failed.extend(other.failed);
        self.skipped += other.skipped;
        self.unavailable += other.unavailable;
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Size that tells two same-named photos apart: the original's, else the
/// first declared one.
fn identity_size(photo: &RemotePhoto) -> Option<u64> {
    [VersionSize::Original, VersionSize::Medium, VersionSize::Thumb]
        .iter()
        .find_map(|s| photo.versions().get(s).and_then(|v| v.size))
}

/// Local names handed out so far in one album, keyed by cleaned filename.
///
/// A listing may hold different photos under one name (camera counters
/// repeat across a library). The first keeps its name; a later one with a
/// different size is saved as `<stem>-<size>.<ext>`, so the two never take
/// turns overwriting each other.
#[derive(Debug, Default)]
struct ClaimedNames(HashMap<String, Option<u64>>);

impl ClaimedNames {
    fn claim<'a>(&mut self, photo: &'a RemotePhoto) -> Cow<'a, RemotePhoto> {
        let name = clean_filename(photo.filename());
        let size = identity_size(photo);
        let Some(claimed) = self.0.get(&name) else {
            self.0.insert(name, size);
            return Cow::Borrowed(photo);
        };
        match size {
            Some(n) if *claimed != size => {
                let renamed = add_dedup_suffix(photo.filename(), n);
                tracing::debug!("{} already taken, saving as {}", photo.filename(), renamed);
                self.0.insert(clean_filename(&renamed), size);
                Cow::Owned(photo.clone().with_filename(renamed))
            }
            _ => Cow::Borrowed(photo),
        }
    }
}

/// Mirror one album into `destination`.
///
/// Returns `Ok(None)` without touching the filesystem when any input is
/// missing. Otherwise the directory is created first and every photo is
/// processed for every size, in listing order. A transient failure pauses
/// for the configured backoff before the next photo. Same-named photos of
/// different sizes get distinct local names (see [`add_dedup_suffix`]).
pub async fn sync_album(
    album: Option<&PhotoAlbum>,
    destination: Option<&Path>,
    sizes: Option<&[VersionSize]>,
    options: &DownloadOptions,
    shutdown: &CancellationToken,
) -> std::io::Result<Option<SyncSummary>> {
    let (Some(album), Some(destination), Some(sizes)) = (album, destination, sizes) else {
        return Ok(None);
    };

    tokio::fs::create_dir_all(destination).await?;
    if album.is_empty() {
        tracing::debug!("Album {} is empty", album);
    }

    let mut claimed = ClaimedNames::default();
    let mut summary = SyncSummary::default();
    for listed in album.photos() {
        if shutdown.is_cancelled() {
            tracing::info!("Shutdown requested, stopping album {}", album);
            break;
        }
        let claim = claimed.claim(listed);
        let photo: &RemotePhoto = &claim;
        for &size in sizes {
            let outcome = process_photo(Some(photo), size, Some(destination), options).await;
            let path = destination.join(size_filename(photo.filename(), size));
            summary.record(outcome, path);

            if let SyncOutcome::Failed { transient: true } = outcome {
                let delay = options.retry.backoff();
                if !delay.is_zero() {
                    tracing::debug!("Backing off {}s after transient failure", delay.as_secs());
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown.cancelled() => {}
                    }
                }
            }
        }
    }
    Ok(Some(summary))
}

/// Resolve the configured album names, failing on the first unknown one.
async fn resolve_albums(
    names: &[String],
    service: &dyn PhotosService,
) -> Result<Vec<PhotoAlbum>, ServiceError> {
    let mut albums = Vec::with_capacity(names.len());
    for name in names {
        match service.album(name).await? {
            Some(album) => albums.push(album),
            None => {
                let available = service.album_names().await?;
                return Err(ServiceError::AlbumNotFound {
                    name: name.clone(),
                    available,
                });
            }
        }
    }
    Ok(albums)
}

/// Run one sync pass.
pub async fn sync_photos(
    config: &PhotosConfig,
    service: &dyn PhotosService,
    options: &DownloadOptions,
    shutdown: &CancellationToken,
) -> anyhow::Result<SyncSummary> {
    let root = &config.destination;
    tokio::fs::create_dir_all(root)
        .await
        .with_context(|| format!("Failed to create {}", root.display()))?;

    let targets: Vec<(PhotoAlbum, PathBuf)> = if config.filters.albums.is_empty() {
        let library = service.all().await?;
        vec![(library, root.join(ALL_PHOTOS_DIR))]
    } else {
        resolve_albums(&config.filters.albums, service)
            .await?
            .into_iter()
            .map(|album| {
                let dir = root.join(clean_filename(album.name()));
                (album, dir)
            })
            .collect()
    };

    let sizes = config.filters.file_sizes.as_slice();
    let mut summary = SyncSummary::default();
    for (album, dir) in &targets {
        if shutdown.is_cancelled() {
            break;
        }
        tracing::info!(
            "Syncing {} ({} photos) into {}",
            if album.name().is_empty() { ALL_PHOTOS_DIR } else { album.name() },
            album.len(),
            dir.display()
        );
        let album_summary = sync_album(Some(album), Some(dir), Some(sizes), options, shutdown)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        if let Some(s) = album_summary {
            summary.merge(s);
        }
    }

    tracing::info!(
        downloaded = summary.downloaded.len(),
        skipped = summary.skipped,
        unavailable = summary.unavailable,
        failed = summary.failed.len(),
        "Sync pass complete"
    );
    Ok(summary)
}
