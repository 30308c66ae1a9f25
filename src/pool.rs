//! Capacity-bounded pool of per-object block managers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Semaphore;

use crate::blob::Blob;
use crate::block_manager::BlockManager;
use crate::client::{ObjectClient, ObjectUri};
use crate::config::PhysicalIoConfig;
use crate::metadata::MetadataStore;
use crate::{Error, Result};

#[derive(Debug)]
struct Pooled {
    manager: Arc<BlockManager>,
    last_access: u64,
}

#[derive(Debug, Default)]
struct PoolMap {
    managers: HashMap<ObjectUri, Pooled>,
    clock: u64,
}

/// Pools [BlockManager]s across objects so that many concurrently open
/// objects share one metadata store and one prefetch-permit budget.
///
/// A manager is created on first access to an object and shared by every
/// subsequent [Blob] opened for it. When `pool_capacity` is exceeded the
/// least-recently-used manager is closed and dropped; the manager being
/// accessed is most-recently-used and never the victim, so eviction
/// cannot disturb the evicting caller's own reads. A [Blob] still
/// holding a closed manager observes [`Error::Closed`] on its next read.
#[derive(Debug)]
pub struct BlockManagerPool {
    client: Arc<dyn ObjectClient>,
    metadata_store: Arc<MetadataStore>,
    config: PhysicalIoConfig,
    prefetch_permits: Arc<Semaphore>,
    map: Mutex<PoolMap>,
    closed: AtomicBool,
}

impl BlockManagerPool {
    pub fn new(client: Arc<dyn ObjectClient>, config: PhysicalIoConfig) -> Self {
        let metadata_store = Arc::new(MetadataStore::new(client.clone(), &config));
        Self {
            prefetch_permits: Arc::new(Semaphore::new(config.prefetch_concurrency())),
            client,
            metadata_store,
            config,
            map: Mutex::new(PoolMap::default()),
            closed: AtomicBool::new(false),
        }
    }

    /// The metadata store shared by every pooled manager.
    pub fn metadata_store(&self) -> Arc<MetadataStore> {
        self.metadata_store.clone()
    }

    /// Existing or newly constructed manager for `uri`.
    pub fn block_manager(&self, uri: &ObjectUri) -> Result<Arc<BlockManager>> {
        self.ensure_open()?;
        let mut map = self.lock_map()?;
        map.clock += 1;
        let now = map.clock;

        if let Some(pooled) = map.managers.get_mut(uri) {
            pooled.last_access = now;
            return Ok(pooled.manager.clone());
        }

        self.evict_if_full(&mut map);
        let manager = Arc::new(BlockManager::with_permits(
            uri.clone(),
            self.client.clone(),
            self.metadata_store.clone(),
            self.config.clone(),
            self.prefetch_permits.clone(),
        ));
        map.managers.insert(
            uri.clone(),
            Pooled {
                manager: manager.clone(),
                last_access: now,
            },
        );
        Ok(manager)
    }

    /// Open a read façade for `uri`, backed by the pooled manager.
    pub fn open_blob(&self, uri: &ObjectUri) -> Result<Blob> {
        Ok(Blob::new(
            uri.clone(),
            self.metadata_store.clone(),
            self.block_manager(uri)?,
        ))
    }

    /// How many managers are pooled.
    pub fn len(&self) -> usize {
        self.map.lock().map(|map| map.managers.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Close every pooled manager. Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let Ok(mut map) = self.map.lock() else {
            return;
        };
        for (_, pooled) in map.managers.drain() {
            pooled.manager.close();
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed("block manager pool"));
        }
        Ok(())
    }

    fn lock_map(&self) -> Result<MutexGuard<'_, PoolMap>> {
        self.map
            .lock()
            .map_err(|_| Error::InvariantViolation("pool map lock poisoned".into()))
    }

    fn evict_if_full(&self, map: &mut PoolMap) {
        while map.managers.len() >= self.config.pool_capacity() {
            let victim = map
                .managers
                .iter()
                .min_by_key(|(_, pooled)| pooled.last_access)
                .map(|(uri, _)| uri.clone());
            match victim {
                Some(uri) => {
                    log::debug!("evicting block manager for {uri}");
                    if let Some(pooled) = map.managers.remove(&uri) {
                        pooled.manager.close();
                    }
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::testing::{test_config, FakeObjectClient, TEST_DATA};

    fn test_pool() -> BlockManagerPool {
        let client = Arc::new(FakeObjectClient::new(TEST_DATA));
        let config = test_config(|builder| {
            builder.pool_capacity(2);
        });
        BlockManagerPool::new(client, config)
    }

    #[test]
    fn test_manager_is_shared_per_uri() {
        let pool = test_pool();
        let uri = ObjectUri::new("foo", "a");

        let first = pool.block_manager(&uri).unwrap();
        let second = pool.block_manager(&uri).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_lru_manager_is_closed_on_eviction() {
        let pool = test_pool();
        let a = pool.block_manager(&ObjectUri::new("foo", "a")).unwrap();
        let b = pool.block_manager(&ObjectUri::new("foo", "b")).unwrap();

        // Touch `a` so `b` is the LRU entry when `c` overflows the pool.
        pool.block_manager(&ObjectUri::new("foo", "a")).unwrap();
        let c = pool.block_manager(&ObjectUri::new("foo", "c")).unwrap();

        assert_eq!(pool.len(), 2);
        assert!(b.is_closed());
        assert!(!a.is_closed());
        assert!(!c.is_closed());
    }

    #[test]
    fn test_close_closes_every_manager() {
        let pool = test_pool();
        let a = pool.block_manager(&ObjectUri::new("foo", "a")).unwrap();
        let b = pool.block_manager(&ObjectUri::new("foo", "b")).unwrap();

        pool.close();
        pool.close();

        assert!(a.is_closed());
        assert!(b.is_closed());
        assert!(pool.is_empty());
        assert!(matches!(
            pool.block_manager(&ObjectUri::new("foo", "a")),
            Err(Error::Closed(_))
        ));
    }
}
