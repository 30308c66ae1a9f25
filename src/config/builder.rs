//! Config Builder
//!

use super::{
    PhysicalIoConfig, DEFAULT_BLOCK_CAPACITY, DEFAULT_BLOCK_SIZE, DEFAULT_MAX_RANGE_SIZE,
    DEFAULT_METADATA_CAPACITY, DEFAULT_POOL_CAPACITY, DEFAULT_READ_AHEAD_BYTES,
};
use crate::{Error, Result};

/// Builder for [PhysicalIoConfig].
pub struct PhysicalIoConfigBuilder {
    block_size_bytes: u64,
    read_ahead_bytes: u64,
    max_range_size_bytes: u64,
    block_capacity: usize,
    pool_capacity: usize,
    metadata_capacity: u64,
    prefetch_concurrency: usize,
}

impl PhysicalIoConfigBuilder {
    pub(crate) fn new() -> Self {
        Self {
            block_size_bytes: DEFAULT_BLOCK_SIZE,
            read_ahead_bytes: DEFAULT_READ_AHEAD_BYTES,
            max_range_size_bytes: DEFAULT_MAX_RANGE_SIZE,
            block_capacity: DEFAULT_BLOCK_CAPACITY,
            pool_capacity: DEFAULT_POOL_CAPACITY,
            metadata_capacity: DEFAULT_METADATA_CAPACITY,
            prefetch_concurrency: num_cpus::get(),
        }
    }

    /// Set the size of one cache segment.
    pub fn block_size_bytes(&mut self, bytes: u64) -> &mut Self {
        self.block_size_bytes = bytes;
        self
    }

    /// Set how far a requested fetch is speculatively extended.
    pub fn read_ahead_bytes(&mut self, bytes: u64) -> &mut Self {
        self.read_ahead_bytes = bytes;
        self
    }

    /// Set the cap on a single physical range request. Longer spans are
    /// split into multiple requests.
    pub fn max_range_size_bytes(&mut self, bytes: u64) -> &mut Self {
        self.max_range_size_bytes = bytes;
        self
    }

    /// Set the max number of resident blocks per object.
    pub fn block_capacity(&mut self, blocks: usize) -> &mut Self {
        self.block_capacity = blocks;
        self
    }

    /// Set the max number of pooled per-object block managers.
    pub fn pool_capacity(&mut self, managers: usize) -> &mut Self {
        self.pool_capacity = managers;
        self
    }

    /// Set the max number of cached metadata entries.
    pub fn metadata_capacity(&mut self, entries: u64) -> &mut Self {
        self.metadata_capacity = entries;
        self
    }

    /// Set the max number of in-flight background prefetches.
    pub fn prefetch_concurrency(&mut self, tasks: usize) -> &mut Self {
        self.prefetch_concurrency = tasks;
        self
    }

    pub fn build(&self) -> Result<PhysicalIoConfig> {
        if self.block_size_bytes == 0 {
            return Err(Error::invalid_arg("`block_size_bytes` must be positive"));
        }
        if self.read_ahead_bytes == 0 {
            return Err(Error::invalid_arg("`read_ahead_bytes` must be positive"));
        }
        if self.max_range_size_bytes == 0 {
            return Err(Error::invalid_arg("`max_range_size_bytes` must be positive"));
        }
        if self.block_capacity == 0 {
            return Err(Error::invalid_arg("`block_capacity` must be positive"));
        }
        if self.pool_capacity == 0 {
            return Err(Error::invalid_arg("`pool_capacity` must be positive"));
        }
        if self.metadata_capacity == 0 {
            return Err(Error::invalid_arg("`metadata_capacity` must be positive"));
        }
        if self.prefetch_concurrency == 0 {
            return Err(Error::invalid_arg("`prefetch_concurrency` must be positive"));
        }
        Ok(PhysicalIoConfig {
            block_size_bytes: self.block_size_bytes,
            read_ahead_bytes: self.read_ahead_bytes,
            max_range_size_bytes: self.max_range_size_bytes,
            block_capacity: self.block_capacity,
            pool_capacity: self.pool_capacity,
            metadata_capacity: self.metadata_capacity,
            prefetch_concurrency: self.prefetch_concurrency,
        })
    }
}
