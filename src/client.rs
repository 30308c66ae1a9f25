//! The object-store capability consumed by the caching layer.
//!
//! The engine never talks to a network client directly; everything goes
//! through [ObjectClient]. [ObjectStoreClient] adapts any arrow-rs
//! [ObjectStore] to that capability.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::{path::Path, ObjectStore};

use crate::{Error, Result};

/// Identity of one immutable remote object: a `(bucket, key)` pair.
///
/// Compared and hashed by value; used as the cache key everywhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectUri {
    bucket: String,
    key: String,
}

impl ObjectUri {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for ObjectUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// Object metadata. Only the total length matters to the caching layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectMetadata {
    /// Total object size in bytes.
    pub content_length: u64,
}

/// Minimal client capability: ranged reads and metadata lookups against
/// a remote object store.
#[async_trait]
pub trait ObjectClient: fmt::Debug + Send + Sync + 'static {
    /// Fetch the bytes of `range` from `uri`.
    async fn get_object(&self, uri: &ObjectUri, range: Range<u64>) -> Result<Bytes>;

    /// Fetch the metadata of `uri`.
    async fn head_object(&self, uri: &ObjectUri) -> Result<ObjectMetadata>;
}

/// [ObjectClient] backed by an arrow-rs [ObjectStore].
///
/// The wrapped store is assumed to be rooted at a single bucket, so the
/// key of a URI maps directly to a store path.
#[derive(Debug, Clone)]
pub struct ObjectStoreClient {
    inner: Arc<dyn ObjectStore>,
}

impl ObjectStoreClient {
    pub fn new(inner: Arc<dyn ObjectStore>) -> Self {
        Self { inner }
    }

    fn path_of(uri: &ObjectUri) -> Path {
        Path::from(uri.key())
    }
}

#[async_trait]
impl ObjectClient for ObjectStoreClient {
    async fn get_object(&self, uri: &ObjectUri, range: Range<u64>) -> Result<Bytes> {
        self.inner
            .get_range(&Self::path_of(uri), range.start as usize..range.end as usize)
            .await
            .map_err(|e| Error::fetch(uri, e))
    }

    async fn head_object(&self, uri: &ObjectUri) -> Result<ObjectMetadata> {
        let meta = self
            .inner
            .head(&Self::path_of(uri))
            .await
            .map_err(|e| Error::fetch(uri, e))?;
        Ok(ObjectMetadata {
            content_length: meta.size as u64,
        })
    }
}
