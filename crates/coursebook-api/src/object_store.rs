// crates/coursebook-api/src/object_store.rs
// ============================================================================
// Module: Submission Object Storage
// Description: Blob store abstraction over S3 with an in-memory double.
// Purpose: Persist and stream submission payloads under server-generated
//          keys with strict validation.
// Dependencies: coursebook-core, coursebook-config, async-trait, aws-sdk-s3,
//               bytes, tempfile, tokio, tokio-stream
// ============================================================================

//! ## Overview
//! Submission payloads live in an object store behind the [`BlobStore`]
//! trait. Uploads are spooled chunk by chunk to a scratch file before the
//! blob write, and downloads stream through a bounded channel, so a payload
//! never sits whole in memory in either direction. Keys are server-generated;
//! every key is still validated before use because storage is treated as
//! untrusted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Component;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use coursebook_config::S3ObjectStoreConfig;
use coursebook_core::ApiError;
use coursebook_core::BlobKey;
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum length of a single key segment.
const MAX_KEY_SEGMENT_LENGTH: usize = 255;
/// Maximum total key length.
const MAX_KEY_LENGTH: usize = 1024;
/// Download chunk size in bytes.
const DOWNLOAD_CHUNK_BYTES: usize = 8192;
/// Bounded channel depth for streamed downloads.
const DOWNLOAD_CHANNEL_DEPTH: usize = 16;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Object-store errors for submission payloads.
#[derive(Debug, Error)]
pub enum BlobStoreError {
    /// Invalid configuration or key input.
    #[error("object store invalid: {0}")]
    Invalid(String),
    /// Backend I/O failure.
    #[error("object store io error: {0}")]
    Io(String),
    /// Backend returned an error.
    #[error("object store backend error: {0}")]
    Backend(String),
    /// Object does not exist.
    #[error("object not found: {0}")]
    NotFound(String),
}

impl From<BlobStoreError> for ApiError {
    fn from(error: BlobStoreError) -> Self {
        match error {
            BlobStoreError::NotFound(message) => Self::NotFound(message),
            BlobStoreError::Invalid(message)
            | BlobStoreError::Io(message)
            | BlobStoreError::Backend(message) => Self::Storage(message),
        }
    }
}

// ============================================================================
// SECTION: Download Handle
// ============================================================================

/// Streaming handle to a stored payload.
pub struct BlobDownload {
    /// Stored content type of the payload.
    pub content_type: String,
    /// Payload length in bytes when the backend reports it.
    pub content_length: Option<u64>,
    /// Chunked payload stream with backpressure.
    pub stream: ReceiverStream<Result<Bytes, std::io::Error>>,
}

// ============================================================================
// SECTION: Upload Spool
// ============================================================================

/// Upload payload spooled to a scratch file.
///
/// Request bodies are appended chunk by chunk as they arrive, so an upload
/// of any size occupies one chunk of memory at a time. The scratch file is
/// removed when the spool is dropped.
pub struct PayloadSpool {
    /// Scratch file owning the on-disk payload.
    temp: NamedTempFile,
    /// Async handle the chunks are written through.
    file: tokio::fs::File,
    /// Bytes written so far.
    written: u64,
}

impl PayloadSpool {
    /// Creates an empty spool backed by a fresh scratch file.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError::Io`] when the scratch file cannot be
    /// created.
    pub async fn new() -> Result<Self, BlobStoreError> {
        let temp = NamedTempFile::new().map_err(|err| BlobStoreError::Io(err.to_string()))?;
        let file = tokio::fs::File::create(temp.path())
            .await
            .map_err(|err| BlobStoreError::Io(err.to_string()))?;
        Ok(Self { temp, file, written: 0 })
    }

    /// Appends one chunk to the spool.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError::Io`] when the write fails.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), BlobStoreError> {
        self.file
            .write_all(chunk)
            .await
            .map_err(|err| BlobStoreError::Io(err.to_string()))?;
        self.written += u64::try_from(chunk.len())
            .map_err(|err| BlobStoreError::Io(err.to_string()))?;
        Ok(())
    }

    /// Flushes buffered writes once the body is fully consumed.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError::Io`] when the flush fails.
    pub async fn finish(&mut self) -> Result<(), BlobStoreError> {
        self.file
            .flush()
            .await
            .map_err(|err| BlobStoreError::Io(err.to_string()))
    }

    /// Spools a complete in-memory payload in one step.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError::Io`] when the scratch file cannot be
    /// written.
    pub async fn from_bytes(bytes: &[u8]) -> Result<Self, BlobStoreError> {
        let mut spool = Self::new().await?;
        spool.write_chunk(bytes).await?;
        spool.finish().await?;
        Ok(spool)
    }

    /// Payload length in bytes.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.written
    }

    /// True when nothing has been written.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.written == 0
    }

    /// Path of the scratch file holding the payload.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.temp.path()
    }
}

// ============================================================================
// SECTION: Blob Store Trait
// ============================================================================

/// Object-store abstraction for submission payloads.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Writes a spooled payload under the given key.
    async fn put(
        &self,
        key: &BlobKey,
        content_type: &str,
        payload: &PayloadSpool,
    ) -> Result<(), BlobStoreError>;

    /// Opens a streaming download for the given key.
    async fn open(&self, key: &BlobKey) -> Result<BlobDownload, BlobStoreError>;

    /// Deletes the payload under the given key. Deleting a missing key is a
    /// no-op, matching S3 semantics.
    async fn delete(&self, key: &BlobKey) -> Result<(), BlobStoreError>;
}

// ============================================================================
// SECTION: S3 Implementation
// ============================================================================

/// S3-backed blob store.
pub struct S3BlobStore {
    /// Underlying S3 client.
    client: Client,
    /// Bucket name.
    bucket: String,
    /// Root prefix prepended to all keys.
    prefix: String,
}

impl S3BlobStore {
    /// Builds an S3-backed blob store from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError`] when configuration is invalid.
    pub async fn new(config: &S3ObjectStoreConfig) -> Result<Self, BlobStoreError> {
        config.validate().map_err(|err| BlobStoreError::Invalid(err.to_string()))?;
        let prefix = normalize_prefix(config.prefix.as_deref().unwrap_or(""))?;
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = config.region.clone() {
            loader = loader.region(Region::new(region));
        }
        if let Some(endpoint) = config.endpoint.clone() {
            loader = loader.endpoint_url(endpoint);
        }
        let shared_config = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if config.force_path_style {
            builder = builder.force_path_style(true);
        }
        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
            prefix,
        })
    }

    /// Applies the configured prefix to a validated key.
    fn prefixed_key(&self, key: &BlobKey) -> Result<String, BlobStoreError> {
        validate_key(key.as_str())?;
        let full = format!("{}{}", self.prefix, key.as_str());
        if full.len() > MAX_KEY_LENGTH {
            return Err(BlobStoreError::Invalid("object key exceeds length limit".to_string()));
        }
        Ok(full)
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(
        &self,
        key: &BlobKey,
        content_type: &str,
        payload: &PayloadSpool,
    ) -> Result<(), BlobStoreError> {
        let key = self.prefixed_key(key)?;
        let body = ByteStream::from_path(payload.path())
            .await
            .map_err(|err| BlobStoreError::Io(err.to_string()))?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .map_err(|err| BlobStoreError::Backend(err.to_string()))?;
        Ok(())
    }

    async fn open(&self, key: &BlobKey) -> Result<BlobDownload, BlobStoreError> {
        let full_key = self.prefixed_key(key)?;
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .send()
            .await
            .map_err(|err| {
                let service = err.into_service_error();
                if service.is_no_such_key() {
                    BlobStoreError::NotFound(key.to_string())
                } else {
                    BlobStoreError::Backend(service.to_string())
                }
            })?;
        let content_type =
            output.content_type().unwrap_or("application/octet-stream").to_string();
        let content_length =
            output.content_length().and_then(|length| u64::try_from(length).ok());
        let mut reader = output.body.into_async_read();
        let (tx, rx) = mpsc::channel::<Result<Bytes, std::io::Error>>(DOWNLOAD_CHANNEL_DEPTH);
        tokio::spawn(async move {
            let mut chunk = [0u8; DOWNLOAD_CHUNK_BYTES];
            loop {
                match reader.read(&mut chunk).await {
                    Ok(0) => break,
                    Ok(read) => {
                        if tx.send(Ok(Bytes::copy_from_slice(&chunk[.. read]))).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        let _ = tx.send(Err(err)).await;
                        break;
                    }
                }
            }
        });
        Ok(BlobDownload {
            content_type,
            content_length,
            stream: ReceiverStream::new(rx),
        })
    }

    async fn delete(&self, key: &BlobKey) -> Result<(), BlobStoreError> {
        let key = self.prefixed_key(key)?;
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| BlobStoreError::Backend(err.to_string()))?;
        Ok(())
    }
}

// ============================================================================
// SECTION: In-Memory Implementation
// ============================================================================

/// In-process blob store for tests and local development.
#[derive(Default)]
pub struct InMemoryBlobStore {
    /// Stored objects keyed by blob key.
    objects: Mutex<BTreeMap<String, (String, Bytes)>>,
}

impl InMemoryBlobStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored objects.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError::Io`] when the internal lock is poisoned.
    pub fn len(&self) -> Result<usize, BlobStoreError> {
        Ok(self.lock()?.len())
    }

    /// Returns true when no objects are stored.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError::Io`] when the internal lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, BlobStoreError> {
        Ok(self.lock()?.is_empty())
    }

    /// Locks the object map.
    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, (String, Bytes)>>, BlobStoreError>
    {
        self.objects
            .lock()
            .map_err(|_| BlobStoreError::Io("object store lock poisoned".to_string()))
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(
        &self,
        key: &BlobKey,
        content_type: &str,
        payload: &PayloadSpool,
    ) -> Result<(), BlobStoreError> {
        validate_key(key.as_str())?;
        let bytes = tokio::fs::read(payload.path())
            .await
            .map_err(|err| BlobStoreError::Io(err.to_string()))?;
        self.lock()?
            .insert(key.to_string(), (content_type.to_string(), Bytes::from(bytes)));
        Ok(())
    }

    async fn open(&self, key: &BlobKey) -> Result<BlobDownload, BlobStoreError> {
        let (content_type, bytes) = self
            .lock()?
            .get(key.as_str())
            .cloned()
            .ok_or_else(|| BlobStoreError::NotFound(key.to_string()))?;
        let (tx, rx) = mpsc::channel::<Result<Bytes, std::io::Error>>(1);
        let content_length = u64::try_from(bytes.len()).ok();
        let _ = tx.send(Ok(bytes)).await;
        Ok(BlobDownload {
            content_type,
            content_length,
            stream: ReceiverStream::new(rx),
        })
    }

    async fn delete(&self, key: &BlobKey) -> Result<(), BlobStoreError> {
        self.lock()?.remove(key.as_str());
        Ok(())
    }
}

// ============================================================================
// SECTION: Key Validation
// ============================================================================

/// Normalizes a root prefix string for object storage.
fn normalize_prefix(raw: &str) -> Result<String, BlobStoreError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    if trimmed.starts_with('/') {
        return Err(BlobStoreError::Invalid(
            "prefix must be relative (no leading slash)".to_string(),
        ));
    }
    let normalized = trimmed.strip_suffix('/').unwrap_or(trimmed);
    validate_key(normalized)?;
    Ok(format!("{normalized}/"))
}

/// Validates a blob key as a relative, traversal-free path.
fn validate_key(key: &str) -> Result<(), BlobStoreError> {
    if key.is_empty() {
        return Err(BlobStoreError::Invalid("key must be set".to_string()));
    }
    if key.contains('\\') {
        return Err(BlobStoreError::Invalid("key must not contain backslashes".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(BlobStoreError::Invalid("key exceeds length limit".to_string()));
    }
    let candidate = Path::new(key);
    if candidate.is_absolute() {
        return Err(BlobStoreError::Invalid("key must be relative".to_string()));
    }
    for component in candidate.components() {
        match component {
            Component::Normal(value) => {
                if value.len() > MAX_KEY_SEGMENT_LENGTH {
                    return Err(BlobStoreError::Invalid(
                        "key segment exceeds length limit".to_string(),
                    ));
                }
            }
            _ => {
                return Err(BlobStoreError::Invalid(
                    "key must be relative without traversal".to_string(),
                ));
            }
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use tokio_stream::StreamExt;

    use super::*;

    #[tokio::test]
    async fn memory_store_round_trips_payloads() {
        let store = InMemoryBlobStore::new();
        let key = BlobKey::new("submissions/1/2/abcd");
        let spool = PayloadSpool::from_bytes(b"payload").await.expect("spool");
        store.put(&key, "application/pdf", &spool).await.expect("put");
        let mut download = store.open(&key).await.expect("open");
        assert_eq!(download.content_type, "application/pdf");
        assert_eq!(download.content_length, Some(7));
        let chunk = download.stream.next().await.expect("chunk").expect("bytes");
        assert_eq!(chunk, Bytes::from_static(b"payload"));
        store.delete(&key).await.expect("delete");
        assert!(matches!(store.open(&key).await, Err(BlobStoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn uploads_spool_chunks_through_a_scratch_file() {
        let mut spool = PayloadSpool::new().await.expect("spool");
        assert!(spool.is_empty());
        for chunk in [&b"first-"[..], &b"second-"[..], &b"third"[..]] {
            spool.write_chunk(chunk).await.expect("chunk");
        }
        spool.finish().await.expect("finish");
        assert_eq!(spool.len(), 18);
        let on_disk = tokio::fs::read(spool.path()).await.expect("read back");
        assert_eq!(on_disk, b"first-second-third");

        let store = InMemoryBlobStore::new();
        let key = BlobKey::new("submissions/4/5/chunked");
        store.put(&key, "text/plain", &spool).await.expect("put");
        let mut download = store.open(&key).await.expect("open");
        assert_eq!(download.content_length, Some(18));
        let body = download.stream.next().await.expect("chunk").expect("bytes");
        assert_eq!(body, Bytes::from_static(b"first-second-third"));
    }

    #[tokio::test]
    async fn delete_of_missing_key_is_a_noop() {
        let store = InMemoryBlobStore::new();
        store.delete(&BlobKey::new("absent")).await.expect("noop delete");
    }

    #[test]
    fn key_validation_rejects_traversal() {
        assert!(validate_key("submissions/1/2/abcd").is_ok());
        assert!(validate_key("/absolute").is_err());
        assert!(validate_key("../parent").is_err());
        assert!(validate_key("a\\b").is_err());
        assert!(validate_key("").is_err());
    }
}
