//! # Media
//!
//! Upload inspection plus content-addressed blob storage.
//! Keys are the SHA-256 of the stored bytes, so identical uploads share one
//! blob and a stored image outlives any single recipe that points at it.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use domains::ports::{MediaProcessor, MediaStorage, ProcessedMedia, StoredMedia};
use domains::{DomainError, DomainResult};
use image::ImageFormat;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

#[cfg(feature = "media-local")]
use std::path::PathBuf;

const ALLOWED_FORMATS: [ImageFormat; 4] = [ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::WebP, ImageFormat::Gif];

/// Hex SHA-256 of the content.
pub fn content_key(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(any(feature = "media-local", test))]
fn is_content_key(key: &str) -> bool {
    key.len() == 64 && key.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(feature = "media-local")]
fn sniff_content_type(data: &[u8]) -> String {
    image::guess_format(data)
        .map(|f| f.to_mime_type().to_string())
        .unwrap_or_else(|_| "application/octet-stream".to_string())
}

/// Sniffs and validates uploads, optionally recompressing PNGs losslessly.
pub struct ImageMediaProcessor {
    max_bytes: usize,
    optimize_png: bool,
}

impl ImageMediaProcessor {
    pub fn new(max_bytes: usize, optimize_png: bool) -> Self {
        Self { max_bytes, optimize_png }
    }
}

impl MediaProcessor for ImageMediaProcessor {
    fn process(&self, data: Bytes, declared_type: Option<String>) -> DomainResult<ProcessedMedia> {
        if data.len() > self.max_bytes {
            return Err(DomainError::PayloadTooLarge(format!("image exceeds {} bytes", self.max_bytes)));
        }
        if let Some(declared) = declared_type.as_deref() {
            if !declared.starts_with("image/") && declared != "application/octet-stream" {
                return Err(DomainError::validation("only image uploads are allowed"));
            }
        }

        let format = image::guess_format(&data)
            .ok()
            .filter(|f| ALLOWED_FORMATS.contains(f))
            .ok_or_else(|| DomainError::validation("image must be jpeg, png, webp or gif"))?;
        image::load_from_memory_with_format(&data, format)
            .map_err(|err| DomainError::validation(format!("image could not be decoded: {err}")))?;

        let data = if format == ImageFormat::Png && self.optimize_png {
            match oxipng::optimize_from_memory(&data, &oxipng::Options::default()) {
                Ok(optimized) if optimized.len() < data.len() => {
                    debug!(before = data.len(), after = optimized.len(), "png optimized");
                    Bytes::from(optimized)
                }
                Ok(_) => data,
                Err(err) => {
                    warn!(%err, "png optimization failed, keeping original");
                    data
                }
            }
        } else {
            data
        };

        Ok(ProcessedMedia { data, content_type: format.to_mime_type().to_string() })
    }
}

/// Process-local blob store for tests and database-less runs.
#[derive(Default)]
pub struct InMemoryMediaStorage {
    blobs: DashMap<String, StoredMedia>,
}

impl InMemoryMediaStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MediaStorage for InMemoryMediaStorage {
    async fn store(&self, data: Bytes, content_type: &str) -> DomainResult<String> {
        let key = content_key(&data);
        self.blobs
            .entry(key.clone())
            .or_insert_with(|| StoredMedia { data, content_type: content_type.to_string() });
        Ok(key)
    }

    async fn load(&self, key: &str) -> DomainResult<Option<StoredMedia>> {
        Ok(self.blobs.get(key).map(|m| m.clone()))
    }
}

/// Filesystem blob store sharded as `root/ab/cd/<hash>`.
#[cfg(feature = "media-local")]
pub struct LocalMediaStorage {
    root: PathBuf,
}

#[cfg(feature = "media-local")]
impl LocalMediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn sharded_path(&self, key: &str) -> PathBuf {
        let mut path = self.root.clone();
        path.push(&key[0..2]);
        path.push(&key[2..4]);
        path.push(key);
        path
    }
}

#[cfg(feature = "media-local")]
#[async_trait]
impl MediaStorage for LocalMediaStorage {
    async fn store(&self, data: Bytes, _content_type: &str) -> DomainResult<String> {
        let key = content_key(&data);
        let target = self.sharded_path(&key);
        if tokio::fs::try_exists(&target).await.map_err(DomainError::internal)? {
            return Ok(key);
        }
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(DomainError::internal)?;
        }
        // Write then rename so readers never see a partial blob.
        let tmp = target.with_extension(format!("tmp-{}", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, &data).await.map_err(DomainError::internal)?;
        tokio::fs::rename(&tmp, &target).await.map_err(DomainError::internal)?;
        debug!(%key, bytes = data.len(), "media stored");
        Ok(key)
    }

    async fn load(&self, key: &str) -> DomainResult<Option<StoredMedia>> {
        if !is_content_key(key) {
            return Ok(None);
        }
        match tokio::fs::read(self.sharded_path(key)).await {
            Ok(data) => Ok(Some(StoredMedia { content_type: sniff_content_type(&data), data: Bytes::from(data) })),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(DomainError::internal(err)),
        }
    }
}
