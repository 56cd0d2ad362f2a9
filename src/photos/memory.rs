//! In-memory service and sources for engine tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};

use super::{
    AssetVersion, ByteStream, PhotoAlbum, PhotosService, RemotePhoto, ServiceError,
    VersionSource, VersionsMap,
};
use crate::types::VersionSize;

/// Serves fixed bytes, split into small chunks, and counts opens.
#[derive(Debug, Default)]
pub struct MemorySource {
    data: Vec<u8>,
    opens: AtomicU32,
}

impl MemorySource {
    pub fn new(data: &[u8]) -> Self {
        Self {
            data: data.to_vec(),
            opens: AtomicU32::new(0),
        }
    }

    pub fn opens(&self) -> u32 {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl VersionSource for MemorySource {
    async fn open(&self) -> Result<ByteStream, ServiceError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let chunks: Vec<Result<Vec<u8>, ServiceError>> =
            self.data.chunks(4).map(|c| Ok(c.to_vec())).collect();
        Ok(stream::iter(chunks).boxed())
    }
}

/// Rejects every open with an API response error.
#[derive(Debug)]
pub struct FailingSource {
    pub code: &'static str,
}

#[async_trait::async_trait]
impl VersionSource for FailingSource {
    async fn open(&self) -> Result<ByteStream, ServiceError> {
        Err(ServiceError::api("download rejected", self.code))
    }
}

/// Opens fine, then breaks after the first chunk.
#[derive(Debug)]
pub struct TruncatedSource;

#[async_trait::async_trait]
impl VersionSource for TruncatedSource {
    async fn open(&self) -> Result<ByteStream, ServiceError> {
        let chunks: Vec<Result<Vec<u8>, ServiceError>> = vec![
            Ok(b"part".to_vec()),
            Err(ServiceError::Connection("connection reset".into())),
        ];
        Ok(stream::iter(chunks).boxed())
    }
}

/// Build a photo whose variants serve the given bytes, declaring their length.
pub fn photo(filename: &str, variants: &[(VersionSize, &str)]) -> RemotePhoto {
    let versions: VersionsMap = variants
        .iter()
        .map(|(size, data)| {
            let source: Arc<dyn VersionSource> = Arc::new(MemorySource::new(data.as_bytes()));
            (*size, AssetVersion::new(Some(data.len() as u64), source))
        })
        .collect();
    RemotePhoto::new(filename, versions)
}

/// Build a photo with a single variant backed by `source`.
pub fn photo_with_source(
    filename: &str,
    size: VersionSize,
    declared: Option<u64>,
    source: Arc<dyn VersionSource>,
) -> RemotePhoto {
    let mut versions = VersionsMap::new();
    versions.insert(size, AssetVersion::new(declared, source));
    RemotePhoto::new(filename, versions)
}

#[derive(Debug, Default)]
pub struct MemoryService {
    albums: Vec<PhotoAlbum>,
    fail_listing: bool,
}

impl MemoryService {
    pub fn new(albums: Vec<PhotoAlbum>) -> Self {
        Self {
            albums,
            fail_listing: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            albums: Vec::new(),
            fail_listing: true,
        }
    }

    fn check(&self) -> Result<(), ServiceError> {
        if self.fail_listing {
            return Err(ServiceError::api("listing unavailable", "503"));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl PhotosService for MemoryService {
    async fn album_names(&self) -> Result<Vec<String>, ServiceError> {
        self.check()?;
        Ok(self.albums.iter().map(|a| a.name().to_string()).collect())
    }

    async fn album(&self, name: &str) -> Result<Option<PhotoAlbum>, ServiceError> {
        self.check()?;
        Ok(self.albums.iter().find(|a| a.name() == name).cloned())
    }

    /// Every photo of every album, first occurrence of a filename wins.
    async fn all(&self) -> Result<PhotoAlbum, ServiceError> {
        self.check()?;
        let mut photos: Vec<RemotePhoto> = Vec::new();
        for album in &self.albums {
            for p in album.photos() {
                if !photos.iter().any(|q| q.filename() == p.filename()) {
                    photos.push(p.clone());
                }
            }
        }
        Ok(PhotoAlbum::new(String::new(), photos))
    }
}
