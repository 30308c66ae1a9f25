//! Tunables of the physical I/O layer.
//!
//! All values are validated at construction; zero is never legal.
//!
//! ```
//! use blobio::PhysicalIoConfig;
//!
//! // Defaults tuned for columnar file formats
//! let config = PhysicalIoConfig::default();
//!
//! // Or size the per-object block budget from 10% of system memory
//! let config = PhysicalIoConfig::with_sys_memory(0.1).build().unwrap();
//! ```

use sysinfo::{MemoryRefreshKind, RefreshKind};

mod builder;

pub use self::builder::PhysicalIoConfigBuilder;

/// Default size of one cache segment is 8 MiB.
pub const DEFAULT_BLOCK_SIZE: u64 = 8 * 1024 * 1024;
/// Default speculative read-ahead is 64 KiB.
pub const DEFAULT_READ_AHEAD_BYTES: u64 = 64 * 1024;
/// Default cap on a single physical range request is 8 MiB.
pub const DEFAULT_MAX_RANGE_SIZE: u64 = 8 * 1024 * 1024;
/// Default number of resident blocks per object.
pub const DEFAULT_BLOCK_CAPACITY: usize = 50;
/// Default number of pooled per-object block managers.
pub const DEFAULT_POOL_CAPACITY: usize = 50;
/// Default number of cached metadata entries.
pub const DEFAULT_METADATA_CAPACITY: u64 = 50;

/// Validated configuration of the block cache and prefetch engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalIoConfig {
    block_size_bytes: u64,
    read_ahead_bytes: u64,
    max_range_size_bytes: u64,
    block_capacity: usize,
    pool_capacity: usize,
    metadata_capacity: u64,
    prefetch_concurrency: usize,
}

impl PhysicalIoConfig {
    /// Create a [`Builder`](PhysicalIoConfigBuilder) to construct a
    /// [PhysicalIoConfig].
    pub fn builder() -> PhysicalIoConfigBuilder {
        PhysicalIoConfigBuilder::new()
    }

    /// Size the per-object block budget so that one object's resident
    /// blocks use at most `fraction` of total system memory.
    ///
    /// warning: does NOT panic if the fraction is greater than 1,
    /// you are responsible for the consequences
    pub fn with_sys_memory(fraction: f32) -> PhysicalIoConfigBuilder {
        let sys = sysinfo::System::new_with_specifics(
            RefreshKind::new().with_memory(MemoryRefreshKind::everything()),
        );
        let budget = (sys.total_memory() as f32 * fraction) as u64;
        let blocks = (budget / DEFAULT_BLOCK_SIZE).max(1) as usize;
        let mut builder = Self::builder();
        builder.block_capacity(blocks);
        builder
    }

    /// Size of one cache segment, in bytes.
    pub fn block_size_bytes(&self) -> u64 {
        self.block_size_bytes
    }

    /// How many bytes to speculatively extend a requested fetch.
    pub fn read_ahead_bytes(&self) -> u64 {
        self.read_ahead_bytes
    }

    /// Cap on a single physical range request, in bytes.
    pub fn max_range_size_bytes(&self) -> u64 {
        self.max_range_size_bytes
    }

    /// Max resident blocks per object.
    pub fn block_capacity(&self) -> usize {
        self.block_capacity
    }

    /// Max pooled per-object block managers.
    pub fn pool_capacity(&self) -> usize {
        self.pool_capacity
    }

    /// Max cached metadata entries.
    pub fn metadata_capacity(&self) -> u64 {
        self.metadata_capacity
    }

    /// Max in-flight background prefetches.
    pub fn prefetch_concurrency(&self) -> usize {
        self.prefetch_concurrency
    }
}

impl Default for PhysicalIoConfig {
    fn default() -> Self {
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PhysicalIoConfig::default();
        assert_eq!(config.block_size_bytes(), 8 * 1024 * 1024);
        assert_eq!(config.read_ahead_bytes(), 64 * 1024);
        assert_eq!(config.max_range_size_bytes(), 8 * 1024 * 1024);
        assert_eq!(config.block_capacity(), 50);
        assert_eq!(config.pool_capacity(), 50);
        assert_eq!(config.metadata_capacity(), 50);
        assert!(config.prefetch_concurrency() >= 1);
    }

    #[test]
    fn test_builder_overrides() {
        let mut builder = PhysicalIoConfig::builder();
        builder
            .block_size_bytes(4096)
            .read_ahead_bytes(1024)
            .max_range_size_bytes(2048)
            .block_capacity(4)
            .pool_capacity(2)
            .metadata_capacity(8)
            .prefetch_concurrency(3);
        let config = builder.build().unwrap();
        assert_eq!(config.block_size_bytes(), 4096);
        assert_eq!(config.read_ahead_bytes(), 1024);
        assert_eq!(config.max_range_size_bytes(), 2048);
        assert_eq!(config.block_capacity(), 4);
        assert_eq!(config.pool_capacity(), 2);
        assert_eq!(config.metadata_capacity(), 8);
        assert_eq!(config.prefetch_concurrency(), 3);
    }

    #[test]
    fn test_rejects_zero_values() {
        let mut builder = PhysicalIoConfig::builder();
        builder.block_size_bytes(0);
        assert!(builder.build().is_err());

        let mut builder = PhysicalIoConfig::builder();
        builder.read_ahead_bytes(0);
        assert!(builder.build().is_err());

        let mut builder = PhysicalIoConfig::builder();
        builder.max_range_size_bytes(0);
        assert!(builder.build().is_err());

        let mut builder = PhysicalIoConfig::builder();
        builder.block_capacity(0);
        assert!(builder.build().is_err());

        let mut builder = PhysicalIoConfig::builder();
        builder.pool_capacity(0);
        assert!(builder.build().is_err());

        let mut builder = PhysicalIoConfig::builder();
        builder.metadata_capacity(0);
        assert!(builder.build().is_err());

        let mut builder = PhysicalIoConfig::builder();
        builder.prefetch_concurrency(0);
        assert!(builder.build().is_err());
    }
}
