//! Remote photo service interface: albums, photos, and the per-size byte
//! streams the sync engine mirrors. The CloudKit-backed implementation lives
//! in [`cloudkit`]; the engine only sees the [`PhotosService`] trait.

mod asset;
pub mod cloudkit;
pub mod error;
#[cfg(test)]
pub mod memory;
pub mod queries;
pub mod session;

pub use cloudkit::CloudKitService;
pub use error::ServiceError;
pub use session::PhotosSession;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::stream::BoxStream;

use crate::types::VersionSize;

/// Chunks of a variant's bytes, in order.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, ServiceError>>;

/// Something that can open the byte stream of one size variant.
#[async_trait::async_trait]
pub trait VersionSource: Send + Sync {
    async fn open(&self) -> Result<ByteStream, ServiceError>;
}

/// One downloadable size variant of a photo.
#[derive(Clone)]
pub struct AssetVersion {
    /// Byte size declared by the service, when it declares one.
    pub size: Option<u64>,
    source: Arc<dyn VersionSource>,
}

impl AssetVersion {
    pub fn new(size: Option<u64>, source: Arc<dyn VersionSource>) -> Self {
        Self { size, source }
    }

    pub async fn open(&self) -> Result<ByteStream, ServiceError> {
        self.source.open().await
    }
}

impl std::fmt::Debug for AssetVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetVersion")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

pub type VersionsMap = HashMap<VersionSize, AssetVersion>;

#[derive(Debug, Clone)]
pub struct RemotePhoto {
    filename: String,
    versions: VersionsMap,
    added_date: Option<DateTime<Utc>>,
}

impl RemotePhoto {
    pub fn new(filename: impl Into<String>, versions: VersionsMap) -> Self {
        Self {
            filename: filename.into(),
            versions,
            added_date: None,
        }
    }

    pub fn with_added_date(mut self, added: DateTime<Utc>) -> Self {
        self.added_date = Some(added);
        self
    }

    /// The same photo saved under another local name.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn versions(&self) -> &VersionsMap {
        &self.versions
    }

    /// When the photo was added to the library; used as the local mtime.
    pub fn added_date(&self) -> Option<DateTime<Utc>> {
        self.added_date
    }
}

impl std::fmt::Display for RemotePhoto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<RemotePhoto: {}>", self.filename)
    }
}

/// A named album and its photos in remote listing order.
#[derive(Debug, Clone)]
pub struct PhotoAlbum {
    name: String,
    photos: Vec<RemotePhoto>,
}

impl PhotoAlbum {
    pub fn new(name: impl Into<String>, photos: Vec<RemotePhoto>) -> Self {
        Self {
            name: name.into(),
            photos,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn photos(&self) -> &[RemotePhoto] {
        &self.photos
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }
}

impl std::fmt::Display for PhotoAlbum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// The remote library as the sync engine sees it.
///
/// Errors from these calls are pass-fatal: without a listing there is
/// nothing to sync.
#[async_trait::async_trait]
pub trait PhotosService: Send + Sync {
    /// Names of the user albums, in the service's order.
    async fn album_names(&self) -> Result<Vec<String>, ServiceError>;

    /// Fetch one album by name, or `None` when the service has no such album.
    async fn album(&self, name: &str) -> Result<Option<PhotoAlbum>, ServiceError>;

    /// The implicit collection holding every photo in the library.
    async fn all(&self) -> Result<PhotoAlbum, ServiceError>;
}
