//! **blobio**: a block-caching physical I/O layer that turns a remote,
//! range-addressable object store into a locally cached, block-structured
//! byte source.
//!
//! Large immutable objects (columnar file formats in particular) are read
//! in fixed-size [Block]s that are cached per object by a [BlockManager],
//! pooled across objects by a [BlockManagerPool], and served through the
//! per-object [Blob] façade. Reads block until their bytes are resident;
//! [IoPlan]s submitted through [`Blob::execute`] prefetch predicted
//! ranges in the background.
//!
//! ```no_run
//! # use std::sync::Arc;
//! use object_store::local::LocalFileSystem;
//! use blobio::{BlockManagerPool, ObjectStoreClient, ObjectUri, PhysicalIoConfig};
//!
//! # let rt = tokio::runtime::Runtime::new().unwrap();
//! # rt.block_on(async {
//! let client = Arc::new(ObjectStoreClient::new(Arc::new(LocalFileSystem::new())));
//! let pool = BlockManagerPool::new(client, PhysicalIoConfig::default());
//!
//! let blob = pool.open_blob(&ObjectUri::new("data", "part-0.parquet")).unwrap();
//! let mut buf = vec![0u8; 4096];
//! let n = blob.read(&mut buf, 0, 4096, 0).await.unwrap();
//! # })
//! ```

pub mod blob;
pub mod block;
pub mod block_manager;
pub mod client;
pub mod config;
pub mod error;
pub mod metadata;
pub mod plan;
pub mod pool;

#[cfg(test)]
pub(crate) mod testing;

pub use blob::Blob;
pub use block::Block;
pub use block_manager::BlockManager;
pub use client::{ObjectClient, ObjectMetadata, ObjectStoreClient, ObjectUri};
pub use config::{PhysicalIoConfig, PhysicalIoConfigBuilder};
pub use error::{Error, Result};
pub use metadata::MetadataStore;
pub use plan::{IoPlan, IoPlanExecution, IoPlanState, PrefetchRange, ReadMode};
pub use pool::BlockManagerPool;
