//! Per-object block cache and fetch orchestration.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::{Bytes, BytesMut};
use futures::future::try_join_all;
use tokio::sync::Semaphore;
use tokio::task::AbortHandle;

use crate::block::Block;
use crate::client::{ObjectClient, ObjectUri};
use crate::config::PhysicalIoConfig;
use crate::metadata::MetadataStore;
use crate::plan::ReadMode;
use crate::{Error, Result};

/// Bookkeeping for one resident block.
#[derive(Debug)]
struct Resident {
    block: Arc<Block>,
    last_access: u64,
}

#[derive(Debug, Default)]
struct BlockMap {
    blocks: HashMap<u64, Resident>,
    /// Monotonic access clock backing the LRU order.
    clock: u64,
    fetches: Vec<AbortHandle>,
}

/// Owns every cached [Block] of one object and guarantees that the bytes
/// backing a read are resident before the caller proceeds.
///
/// Each block is fetched at most once concurrently: creation and the
/// `Empty`/`Failed` to `Fetching` transition happen under the map lock,
/// and only the transition winner spawns the fetch task, so a request
/// for a block that is already in flight joins the existing fetch
/// instead of issuing a duplicate range request.
///
/// Eviction removes the least-recently-accessed resolved block whenever
/// a new block would exceed the configured capacity; a block that is
/// still fetching is never evicted.
#[derive(Debug)]
pub struct BlockManager {
    uri: ObjectUri,
    client: Arc<dyn ObjectClient>,
    metadata_store: Arc<MetadataStore>,
    config: PhysicalIoConfig,
    prefetch_permits: Arc<Semaphore>,
    map: Mutex<BlockMap>,
    closed: AtomicBool,
}

impl BlockManager {
    pub fn new(
        uri: ObjectUri,
        client: Arc<dyn ObjectClient>,
        metadata_store: Arc<MetadataStore>,
        config: PhysicalIoConfig,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.prefetch_concurrency()));
        Self::with_permits(uri, client, metadata_store, config, permits)
    }

    /// Construct a manager sharing a prefetch-permit budget with others,
    /// as pooled managers do.
    pub(crate) fn with_permits(
        uri: ObjectUri,
        client: Arc<dyn ObjectClient>,
        metadata_store: Arc<MetadataStore>,
        config: PhysicalIoConfig,
        prefetch_permits: Arc<Semaphore>,
    ) -> Self {
        Self {
            uri,
            client,
            metadata_store,
            config,
            prefetch_permits,
            map: Mutex::new(BlockMap::default()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn uri(&self) -> &ObjectUri {
        &self.uri
    }

    /// How many blocks are resident.
    pub fn len(&self) -> usize {
        self.map.lock().map(|map| map.blocks.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Ensure the block covering `pos` is resident, or being fetched.
    /// `Sync` waits for it to resolve, `Async` returns after scheduling.
    pub async fn make_position_available(&self, pos: u64, mode: ReadMode) -> Result<()> {
        self.make_range_available(pos, 1, mode).await
    }

    /// Ensure every block overlapping `[pos, pos + len)` is resident or
    /// being fetched. The fetch window is extended to the read-ahead
    /// horizon and clipped to the object's content length; blocks fetched
    /// purely for read-ahead resolve in the background even in `Sync`
    /// mode.
    pub async fn make_range_available(&self, pos: u64, len: u64, mode: ReadMode) -> Result<()> {
        self.ensure_open()?;
        let content_length = self.metadata_store.get(&self.uri).await?.content_length;
        if pos >= content_length {
            return Ok(());
        }

        let block_size = self.config.block_size_bytes();
        let window_end = pos
            .saturating_add(len.max(self.config.read_ahead_bytes()))
            .min(content_length);
        let first = pos / block_size;
        let last = (window_end - 1) / block_size;

        let mut targets = Vec::with_capacity((last - first + 1) as usize);
        {
            let mut map = self.lock_map()?;
            map.clock += 1;
            let now = map.clock;
            for index in first..=last {
                let (block, claimed) = match map.blocks.get_mut(&index) {
                    Some(resident) => {
                        resident.last_access = now;
                        // Claims the fetch again only if a previous
                        // attempt failed.
                        (resident.block.clone(), resident.block.begin_fetch())
                    }
                    None => {
                        self.evict_if_full(&mut map);
                        let start = index * block_size;
                        let block_len = block_size.min(content_length - start);
                        let block = Arc::new(Block::new(self.uri.clone(), start, block_len));
                        let claimed = block.begin_fetch();
                        map.blocks.insert(
                            index,
                            Resident {
                                block: block.clone(),
                                last_access: now,
                            },
                        );
                        (block, claimed)
                    }
                };
                if claimed {
                    let handle = self.spawn_fetch(block.clone(), mode);
                    map.fetches.push(handle);
                }
                targets.push(block);
            }
            map.fetches.retain(|handle| !handle.is_finished());
        }

        if mode == ReadMode::Sync {
            let requested_end = pos.saturating_add(len).min(content_length);
            if requested_end > pos {
                let requested_last = (requested_end - 1) / block_size;
                for block in targets.iter().take((requested_last - first + 1) as usize) {
                    block.resolved().await;
                }
            }
        }
        Ok(())
    }

    /// The resident block covering `pos`, if any. Callers are expected
    /// to have made the position available first.
    pub fn get_block(&self, pos: u64) -> Option<Arc<Block>> {
        let mut map = self.map.lock().ok()?;
        map.clock += 1;
        let now = map.clock;
        let resident = map.blocks.get_mut(&(pos / self.config.block_size_bytes()))?;
        resident.last_access = now;
        Some(resident.block.clone())
    }

    /// Release every block and cancel outstanding fetches best-effort.
    /// Readers still parked on an in-flight fetch observe a failure
    /// rather than hanging. Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let Ok(mut map) = self.map.lock() else {
            return;
        };
        for handle in map.fetches.drain(..) {
            handle.abort();
        }
        for (_, resident) in map.blocks.drain() {
            resident
                .block
                .fail_if_unresolved(Error::Closed("block manager"));
        }
        log::debug!("closed block manager for {}", self.uri);
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed("block manager"));
        }
        Ok(())
    }

    fn lock_map(&self) -> Result<MutexGuard<'_, BlockMap>> {
        self.map
            .lock()
            .map_err(|_| Error::InvariantViolation("block map lock poisoned".into()))
    }

    /// Evict least-recently-accessed resolved blocks until there is room
    /// for one more. When every resident block is still fetching, the
    /// map transiently overshoots instead.
    fn evict_if_full(&self, map: &mut BlockMap) {
        while map.blocks.len() >= self.config.block_capacity() {
            let victim = map
                .blocks
                .iter()
                .filter(|(_, resident)| resident.block.is_evictable())
                .min_by_key(|(_, resident)| resident.last_access)
                .map(|(index, _)| *index);
            match victim {
                Some(index) => {
                    log::debug!("evicting block {index} of {}", self.uri);
                    map.blocks.remove(&index);
                }
                None => break,
            }
        }
    }

    fn spawn_fetch(&self, block: Arc<Block>, mode: ReadMode) -> AbortHandle {
        let client = self.client.clone();
        let uri = self.uri.clone();
        let range = block.start()..block.end();
        let max_range = self.config.max_range_size_bytes();
        let permits = self.prefetch_permits.clone();
        let handle = tokio::spawn(async move {
            // Prefetches contend for a bounded permit budget; fetches
            // issued for a blocking reader bypass it, so a saturated
            // prefetch queue cannot stall the reader.
            let _permit = match mode {
                ReadMode::Async => permits.acquire_owned().await.ok(),
                ReadMode::Sync => None,
            };
            let outcome = fetch_range(client, &uri, range.clone(), max_range).await;
            if let Err(err) = &outcome {
                log::warn!("fetch of {uri} [{}, {}) failed: {err}", range.start, range.end);
            }
            block.complete(outcome);
        });
        handle.abort_handle()
    }
}

/// Fetch `range`, splitting it into physical requests no larger than
/// `max_range` and reassembling the parts in order.
async fn fetch_range(
    client: Arc<dyn ObjectClient>,
    uri: &ObjectUri,
    range: Range<u64>,
    max_range: u64,
) -> Result<Bytes> {
    if range.end - range.start <= max_range {
        return client.get_object(uri, range).await;
    }

    let mut parts = Vec::new();
    let mut start = range.start;
    while start < range.end {
        let end = (start + max_range).min(range.end);
        parts.push(client.get_object(uri, start..end));
        start = end;
    }

    let chunks = try_join_all(parts).await?;
    let mut buf = BytesMut::with_capacity((range.end - range.start) as usize);
    for chunk in &chunks {
        buf.extend_from_slice(chunk);
    }
    Ok(buf.freeze())
}
