//! Per-object read façade.

use std::sync::Arc;

use crate::block_manager::BlockManager;
use crate::client::ObjectUri;
use crate::metadata::MetadataStore;
use crate::plan::{IoPlan, IoPlanExecution, IoPlanState, ReadMode};
use crate::{Error, Result};

/// A blob representing one remote object.
///
/// Composes the object's [BlockManager] with the shared [MetadataStore]
/// and serves byte and byte-range reads out of cached blocks, fetching
/// whatever is missing. Reads block until their bytes are resident;
/// [`execute`](Blob::execute) schedules background prefetches and never
/// does.
#[derive(Debug)]
pub struct Blob {
    uri: ObjectUri,
    metadata_store: Arc<MetadataStore>,
    block_manager: Arc<BlockManager>,
}

impl Blob {
    pub fn new(
        uri: ObjectUri,
        metadata_store: Arc<MetadataStore>,
        block_manager: Arc<BlockManager>,
    ) -> Self {
        Self {
            uri,
            metadata_store,
            block_manager,
        }
    }

    pub fn uri(&self) -> &ObjectUri {
        &self.uri
    }

    /// Read the single byte at `pos`.
    pub async fn read_byte(&self, pos: u64) -> Result<u8> {
        let content_length = self.content_length().await?;
        if pos >= content_length {
            return Err(Error::invalid_arg(format!(
                "`pos` {pos} must be less than content length {content_length}"
            )));
        }

        self.block_manager
            .make_position_available(pos, ReadMode::Sync)
            .await?;
        let block = self.block_manager.get_block(pos).ok_or_else(|| {
            Error::InvariantViolation(format!(
                "block for position {pos} of {} missing after synchronous fetch",
                self.uri
            ))
        })?;
        block.read_byte(pos)
    }

    /// Read up to `len` bytes starting at object offset `pos` into
    /// `buf[off..]`.
    ///
    /// Returns the number of bytes copied. The count is less than `len`
    /// only when the object ends first; `Ok(0)` means end-of-object.
    pub async fn read(&self, buf: &mut [u8], off: usize, len: usize, pos: u64) -> Result<usize> {
        let content_length = self.content_length().await?;
        if pos >= content_length {
            return Err(Error::invalid_arg(format!(
                "`pos` {pos} must be less than content length {content_length}"
            )));
        }
        if off >= buf.len() {
            return Err(Error::invalid_arg(format!(
                "`off` {off} must be less than buffer size {}",
                buf.len()
            )));
        }
        if len > buf.len() - off {
            return Err(Error::invalid_arg(format!(
                "`len` {len} overruns the buffer ({} bytes after `off` {off})",
                buf.len() - off
            )));
        }

        self.block_manager
            .make_range_available(pos, len as u64, ReadMode::Sync)
            .await?;

        let mut copied = 0;
        let mut next = pos;
        while copied < len && next < content_length {
            let block = self.block_manager.get_block(next).ok_or_else(|| {
                Error::InvariantViolation(format!(
                    "block for position {next} of {} missing after synchronous fetch",
                    self.uri
                ))
            })?;
            let n = match block.read(&mut buf[off + copied..off + len], next) {
                Ok(n) => n,
                // A failed block stops the read; bytes copied so far are
                // still valid.
                Err(_) if copied > 0 => return Ok(copied),
                Err(err) => return Err(err),
            };
            if n == 0 {
                break;
            }
            copied += n;
            next += n as u64;
        }
        Ok(copied)
    }

    /// Submit every range of `plan` as a background prefetch.
    ///
    /// Returns the submission outcome: scheduling stops at the first
    /// failing range, and ranges submitted before the failure keep
    /// fetching. Never waits for fetch completion.
    pub async fn execute(&self, plan: &IoPlan) -> IoPlanExecution {
        for range in plan.ranges() {
            if let Err(err) = self
                .block_manager
                .make_range_available(range.start(), range.length(), ReadMode::Async)
                .await
            {
                log::error!("failed to submit I/O plan for {}: {err}", self.uri);
                return IoPlanExecution {
                    state: IoPlanState::Failed,
                };
            }
        }
        IoPlanExecution {
            state: IoPlanState::Submitted,
        }
    }

    /// Total length of the object, resolving metadata on first use.
    pub async fn content_length(&self) -> Result<u64> {
        Ok(self.metadata_store.get(&self.uri).await?.content_length)
    }

    /// Release the underlying block manager. Idempotent.
    pub fn close(&self) {
        self.block_manager.close();
    }
}
