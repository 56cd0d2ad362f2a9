use std::fs::FileTimes;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures_util::StreamExt;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::error::DownloadError;
use super::paths::{part_path, vacant_path};
use crate::photos::AssetVersion;
use crate::retry::{self, RetryAction, RetryConfig};

/// Stream one size variant into `download_path` through a `.part` file.
///
/// Each attempt starts the `.part` file from scratch. Once the stream has
/// ended cleanly, an existing file at `download_path` is moved to
/// `supersede` (when given) and the `.part` file is renamed into place, so a
/// failed transfer never disturbs what is already on disk. A copy already
/// kept at `supersede` stays put; the newer one goes to `<marker>-<n>`.
pub async fn download_file(
    version: &AssetVersion,
    download_path: &Path,
    supersede: Option<&Path>,
    retry_config: &RetryConfig,
) -> Result<(), DownloadError> {
    let part_path = part_path(download_path);

    let result = retry::retry_with_backoff(
        retry_config,
        |e: &DownloadError| {
            if e.is_retryable() {
                RetryAction::Retry
            } else {
                RetryAction::Abort
            }
        },
        || async {
            let _ = fs::remove_file(&part_path).await;
            attempt_download(version, download_path, &part_path).await
        },
    )
    .await;

    if let Err(e) = result {
        let _ = fs::remove_file(&part_path).await;
        return Err(e);
    }

    if let Some(marker) = supersede {
        if fs::try_exists(download_path).await.unwrap_or(false) {
            let marker = vacant_path(marker);
            if let Err(e) = fs::rename(download_path, &marker).await {
                let _ = fs::remove_file(&part_path).await;
                return Err(DownloadError::disk(e, &marker));
            }
            tracing::info!(
                "Kept previous {} as {}",
                download_path.display(),
                marker.display()
            );
        }
    }

    fs::rename(&part_path, download_path)
        .await
        .map_err(|e| DownloadError::disk(e, download_path))
}

/// Single transfer attempt into `part_path`.
async fn attempt_download(
    version: &AssetVersion,
    download_path: &Path,
    part_path: &Path,
) -> Result<(), DownloadError> {
    let mut stream = version
        .open()
        .await
        .map_err(|e| DownloadError::remote(e, download_path, 0))?;

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(part_path)
        .await
        .map_err(|e| DownloadError::disk(e, part_path))?;

    let mut bytes_written: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| DownloadError::remote(e, download_path, bytes_written))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| DownloadError::disk(e, part_path))?;
        bytes_written += chunk.len() as u64;
    }
    file.flush()
        .await
        .map_err(|e| DownloadError::disk(e, part_path))?;
    drop(file);

    if let Some(declared) = version.size {
        if declared != bytes_written {
            tracing::warn!(
                "{}: service declared {} bytes, received {}",
                download_path.display(),
                declared,
                bytes_written
            );
        }
    }
    Ok(())
}

/// Set the modification and access times of a file to the given Unix
/// timestamp. Dates before 1970 clamp to the epoch.
pub fn set_file_mtime(path: &Path, timestamp: i64) -> std::io::Result<()> {
    let time = if timestamp >= 0 {
        UNIX_EPOCH + Duration::from_secs(timestamp as u64)
    } else {
        UNIX_EPOCH
            .checked_sub(Duration::from_secs(timestamp.unsigned_abs()))
            .unwrap_or(SystemTime::UNIX_EPOCH)
    };
    let times = FileTimes::new().set_modified(time).set_accessed(time);
    let file = std::fs::File::options().write(true).open(path)?;
    file.set_times(times)?;
    Ok(())
}
