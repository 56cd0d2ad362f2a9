//! Change detection. Decides, from the local directory alone, whether one
//! size of a photo needs fetching.
//!
//! There is no sync journal: every pass re-derives state from what is on
//! disk. A superseded original is never overwritten in place; it is moved
//! aside to `<base>__original.<ext>` first, and the presence of that marker
//! counts as "original already fetched".

use std::path::{Path, PathBuf};

use super::paths::{marker_filename, size_filename};
use crate::types::VersionSize;

/// What to do with one (photo, size) in one destination directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Nothing usable on disk; fetch into `path`.
    Download { path: PathBuf },
    /// The local original differs from the remote one. Move it to `marker`,
    /// then fetch into `path`.
    Upgrade { path: PathBuf, marker: PathBuf },
    /// Already current.
    Skip { path: PathBuf },
}

impl Decision {
    pub fn path(&self) -> &Path {
        match self {
            Decision::Download { path } | Decision::Upgrade { path, .. } | Decision::Skip { path } => {
                path
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Decision::Download { .. } => "download",
            Decision::Upgrade { .. } => "upgrade",
            Decision::Skip { .. } => "skip",
        }
    }
}

/// Local filesystem entries relevant to one (photo, size).
#[derive(Debug, Clone)]
pub struct LocalFileState {
    pub path: PathBuf,
    pub marker: PathBuf,
    /// Byte length of the file at `path`, if it is a regular file.
    pub local_size: Option<u64>,
    pub marker_exists: bool,
}

impl LocalFileState {
    pub fn inspect(directory: &Path, filename: &str, size: VersionSize) -> Self {
        let path = directory.join(size_filename(filename, size));
        let marker = directory.join(marker_filename(filename));
        let local_size = std::fs::metadata(&path)
            .ok()
            .filter(|m| m.is_file())
            .map(|m| m.len());
        let marker_exists = marker.is_file();
        Self {
            path,
            marker,
            local_size,
            marker_exists,
        }
    }
}

/// Apply the decision policy to an inspected local state.
///
/// A declared remote size that differs from the local length means the
/// remote changed; with no declared size an existing file is trusted.
/// Only originals go through the marker; derived sizes are replaced in place.
pub fn decide(state: &LocalFileState, size: VersionSize, declared_size: Option<u64>) -> Decision {
    let path = state.path.clone();
    match state.local_size {
        Some(local) => match declared_size {
            Some(remote) if remote != local => {
                if size == VersionSize::Original {
                    Decision::Upgrade {
                        path,
                        marker: state.marker.clone(),
                    }
                } else {
                    Decision::Download { path }
                }
            }
            _ => Decision::Skip { path },
        },
        None if size == VersionSize::Original && state.marker_exists => Decision::Skip { path },
        None => Decision::Download { path },
    }
}

/// Inspect `directory` and decide what to do for `filename` at `size`.
pub fn detect(
    directory: &Path,
    filename: &str,
    size: VersionSize,
    declared_size: Option<u64>,
) -> Decision {
    let state = LocalFileState::inspect(directory, filename, size);
    let decision = decide(&state, size, declared_size);
    tracing::debug!(
        path = %decision.path().display(),
        local_size = ?state.local_size,
        remote_size = ?declared_size,
        marker = state.marker_exists,
        "change detection: {}",
        decision.label(),
    );
    decision
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, data: &[u8]) {
        fs::write(dir.join(name), data).unwrap();
    }

    #[test]
    fn test_missing_file_downloads() {
        let tmp = TempDir::new().unwrap();
        let d = detect(tmp.path(), "IMG_1.JPG", VersionSize::Original, Some(10));
        assert_eq!(
            d,
            Decision::Download {
                path: tmp.path().join("IMG_1.JPG")
            }
        );
    }

    #[test]
    fn test_same_size_skips() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "IMG_1.JPG", b"0123456789");
        let d = detect(tmp.path(), "IMG_1.JPG", VersionSize::Original, Some(10));
        assert!(matches!(d, Decision::Skip { .. }));
    }

    #[test]
    fn test_size_mismatch_upgrades_original() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "IMG_1.JPG", b"edited");
        let d = detect(tmp.path(), "IMG_1.JPG", VersionSize::Original, Some(10));
        assert_eq!(
            d,
            Decision::Upgrade {
                path: tmp.path().join("IMG_1.JPG"),
                marker: tmp.path().join("IMG_1__original.JPG"),
            }
        );
    }

    #[test]
    fn test_size_mismatch_replaces_derived_size_in_place() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "IMG_1__thumb.JPG", b"old");
        let d = detect(tmp.path(), "IMG_1.JPG", VersionSize::Thumb, Some(10));
        assert_eq!(
            d,
            Decision::Download {
                path: tmp.path().join("IMG_1__thumb.JPG")
            }
        );
    }

    #[test]
    fn test_no_declared_size_trusts_local_file() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "IMG_1.JPG", b"anything");
        let d = detect(tmp.path(), "IMG_1.JPG", VersionSize::Original, None);
        assert!(matches!(d, Decision::Skip { .. }));
    }

    #[test]
    fn test_marker_only_skips_original() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "IMG_1__original.JPG", b"0123456789");
        let d = detect(tmp.path(), "IMG_1.JPG", VersionSize::Original, Some(10));
        assert_eq!(
            d,
            Decision::Skip {
                path: tmp.path().join("IMG_1.JPG")
            }
        );
    }

    #[test]
    fn test_marker_does_not_cover_derived_sizes() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "IMG_1__original.JPG", b"0123456789");
        let d = detect(tmp.path(), "IMG_1.JPG", VersionSize::Medium, Some(4));
        assert_eq!(
            d,
            Decision::Download {
                path: tmp.path().join("IMG_1__medium.JPG")
            }
        );
    }

    #[test]
    fn test_directory_at_path_is_not_a_local_copy() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("IMG_1.JPG")).unwrap();
        let state = LocalFileState::inspect(tmp.path(), "IMG_1.JPG", VersionSize::Original);
        assert_eq!(state.local_size, None);
        assert!(!state.marker_exists);
    }
}
