//! Shared test doubles and fixtures.

use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::blob::Blob;
use crate::block_manager::BlockManager;
use crate::client::{ObjectClient, ObjectMetadata, ObjectUri};
use crate::config::{PhysicalIoConfig, PhysicalIoConfigBuilder};
use crate::metadata::MetadataStore;
use crate::{Error, Result};

pub(crate) const TEST_DATA: &str = "test-data-0123456789";

/// In-memory [ObjectClient] that records every request it serves and
/// can inject failures and latency.
#[derive(Debug)]
pub(crate) struct FakeObjectClient {
    data: Bytes,
    pub(crate) get_requests: Mutex<Vec<Range<u64>>>,
    pub(crate) head_count: AtomicUsize,
    pub(crate) fail_gets: AtomicBool,
    pub(crate) fail_heads: AtomicBool,
    pub(crate) get_delay_ms: AtomicU64,
}

impl FakeObjectClient {
    pub(crate) fn new(data: &str) -> Self {
        Self {
            data: Bytes::copy_from_slice(data.as_bytes()),
            get_requests: Mutex::new(Vec::new()),
            head_count: AtomicUsize::new(0),
            fail_gets: AtomicBool::new(false),
            fail_heads: AtomicBool::new(false),
            get_delay_ms: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl ObjectClient for FakeObjectClient {
    async fn get_object(&self, uri: &ObjectUri, range: Range<u64>) -> Result<Bytes> {
        self.get_requests.lock().unwrap().push(range.clone());
        let delay = self.get_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(Error::fetch(uri, std::io::Error::other("injected get failure")));
        }
        if range.end > self.data.len() as u64 {
            return Err(Error::fetch(
                uri,
                std::io::Error::other(format!(
                    "range {range:?} out of bounds for {} bytes",
                    self.data.len()
                )),
            ));
        }
        Ok(self.data.slice(range.start as usize..range.end as usize))
    }

    async fn head_object(&self, uri: &ObjectUri) -> Result<ObjectMetadata> {
        self.head_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_heads.load(Ordering::SeqCst) {
            return Err(Error::fetch(uri, std::io::Error::other("injected head failure")));
        }
        Ok(ObjectMetadata {
            content_length: self.data.len() as u64,
        })
    }
}

pub(crate) fn test_config(f: impl FnOnce(&mut PhysicalIoConfigBuilder)) -> PhysicalIoConfig {
    let mut builder = PhysicalIoConfig::builder();
    f(&mut builder);
    builder.build().unwrap()
}

pub(crate) fn test_manager(
    data: &str,
    f: impl FnOnce(&mut PhysicalIoConfigBuilder),
) -> (BlockManager, Arc<FakeObjectClient>) {
    let client = Arc::new(FakeObjectClient::new(data));
    let config = test_config(f);
    let metadata_store = Arc::new(MetadataStore::new(client.clone(), &config));
    let manager = BlockManager::new(
        ObjectUri::new("foo", "bar"),
        client.clone(),
        metadata_store,
        config,
    );
    (manager, client)
}

pub(crate) fn test_blob(
    data: &str,
    f: impl FnOnce(&mut PhysicalIoConfigBuilder),
) -> (Blob, Arc<FakeObjectClient>) {
    let client = Arc::new(FakeObjectClient::new(data));
    let config = test_config(f);
    let metadata_store = Arc::new(MetadataStore::new(client.clone(), &config));
    let uri = ObjectUri::new("foo", "bar");
    let manager = Arc::new(BlockManager::new(
        uri.clone(),
        client.clone(),
        metadata_store.clone(),
        config,
    ));
    (Blob::new(uri, metadata_store, manager), client)
}
