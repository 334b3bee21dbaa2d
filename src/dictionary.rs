//! Dictionary Chunk Sources
//!
//! Dictionaries reach the guest as plain newline-delimited text streamed in
//! fixed-size chunks; the guest does its own line splitting. Sources only
//! produce chunks — the facade owns transmission and the terminating
//! newline that flushes the guest's trailing entry.

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::error::BridgeResult;

/// Default chunk size for streamed dictionary sources (64 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// A streaming supplier of dictionary bytes.
///
/// Ingestion suspends between chunks; this is the only long-running
/// asynchronous phase of the bridge.
#[async_trait]
pub trait DictionarySource: Send {
    /// The next chunk, or `None` once the source is exhausted
    async fn next_chunk(&mut self) -> BridgeResult<Option<Bytes>>;
}

/// Reads a dictionary file in fixed-size chunks
#[derive(Debug)]
pub struct FileSource {
    file: tokio::fs::File,
    chunk_size: usize,
}

impl FileSource {
    /// Open `path` with the default chunk size
    pub async fn open(path: impl AsRef<Path>) -> BridgeResult<Self> {
        let path = path.as_ref();
        let file = tokio::fs::File::open(path).await?;
        debug!("opened dictionary source {:?}", path);
        Ok(Self {
            file,
            chunk_size: DEFAULT_CHUNK_SIZE,
        })
    }

    /// Override the chunk size (must be non-zero)
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk size must be non-zero");
        self.chunk_size = chunk_size;
        self
    }
}

#[async_trait]
impl DictionarySource for FileSource {
    async fn next_chunk(&mut self) -> BridgeResult<Option<Bytes>> {
        let mut buf = vec![0u8; self.chunk_size];
        let n = self.file.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(Bytes::from(buf)))
    }
}

/// Serves an in-memory dictionary in fixed-size chunks
pub struct SliceSource {
    data: Bytes,
    pos: usize,
    chunk_size: usize,
}

impl SliceSource {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk size must be non-zero");
        self.chunk_size = chunk_size;
        self
    }
}

#[async_trait]
impl DictionarySource for SliceSource {
    async fn next_chunk(&mut self) -> BridgeResult<Option<Bytes>> {
        if self.pos >= self.data.len() {
            return Ok(None);
        }
        let end = (self.pos + self.chunk_size).min(self.data.len());
        let chunk = self.data.slice(self.pos..end);
        self.pos = end;
        Ok(Some(chunk))
    }
}
