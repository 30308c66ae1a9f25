//! Capacity-bounded cache of object metadata.

use std::sync::Arc;

use moka::future::Cache;

use crate::client::{ObjectClient, ObjectMetadata, ObjectUri};
use crate::config::PhysicalIoConfig;
use crate::{Error, Result};

/// Caches object metadata keyed by [ObjectUri].
///
/// Concurrent lookups for the same object share a single in-flight HEAD
/// request. Successful results are memoized until evicted under capacity
/// pressure; failures resolve every waiter with the error and are not
/// cached, so the next lookup retries.
#[derive(Debug)]
pub struct MetadataStore {
    client: Arc<dyn ObjectClient>,
    cache: Cache<ObjectUri, ObjectMetadata>,
}

impl MetadataStore {
    pub fn new(client: Arc<dyn ObjectClient>, config: &PhysicalIoConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.metadata_capacity())
            .build();
        Self { client, cache }
    }

    /// Resolve the metadata of `uri`, fetching it on first access.
    pub async fn get(&self, uri: &ObjectUri) -> Result<ObjectMetadata> {
        self.cache
            .try_get_with_by_ref(uri, self.client.head_object(uri))
            .await
            .map_err(|e: Arc<Error>| e.as_ref().clone())
    }

    /// How many metadata entries are cached.
    pub fn len(&self) -> usize {
        self.cache.entry_count() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
