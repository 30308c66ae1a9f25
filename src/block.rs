//! A single cached segment of an object.

use bytes::Bytes;
use tokio::sync::watch;

use crate::client::ObjectUri;
use crate::{Error, Result};

/// Fetch state of a [Block].
#[derive(Debug, Clone)]
pub(crate) enum BlockState {
    /// Created, no fetch issued yet.
    Empty,
    /// A fetch is in flight. The block must not be evicted.
    Fetching,
    /// Bytes are resident and immutable.
    Ready(Bytes),
    /// The fetch failed; the next access retries it.
    Failed(Error),
}

/// One aligned, fixed-size segment of an object's bytes.
///
/// `start` is always a multiple of the configured block size; only the
/// final block of an object may be shorter than that size. The state
/// lives in a watch channel so that any number of readers can await the
/// transition out of `Fetching`, all joined to the same fetch.
#[derive(Debug)]
pub struct Block {
    uri: ObjectUri,
    start: u64,
    len: u64,
    state: watch::Sender<BlockState>,
}

impl Block {
    pub(crate) fn new(uri: ObjectUri, start: u64, len: u64) -> Self {
        let (state, _) = watch::channel(BlockState::Empty);
        Self {
            uri,
            start,
            len,
            state,
        }
    }

    /// Offset of the first byte held by this block.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Number of bytes held by this block.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Offset one past the last byte held by this block.
    pub fn end(&self) -> u64 {
        self.start + self.len
    }

    pub fn contains(&self, pos: u64) -> bool {
        self.start <= pos && pos < self.end()
    }

    /// Claim the fetch: moves `Empty` or `Failed` to `Fetching` and
    /// returns whether this caller won the claim. A block that is
    /// already `Fetching` or `Ready` needs no new fetch.
    pub(crate) fn begin_fetch(&self) -> bool {
        let mut claimed = false;
        self.state.send_modify(|state| {
            if matches!(state, BlockState::Empty | BlockState::Failed(_)) {
                *state = BlockState::Fetching;
                claimed = true;
            }
        });
        claimed
    }

    /// Record the fetch outcome and wake every waiter.
    pub(crate) fn complete(&self, outcome: Result<Bytes>) {
        self.state.send_modify(|state| {
            *state = match outcome {
                Ok(bytes) => BlockState::Ready(bytes),
                Err(err) => BlockState::Failed(err),
            };
        });
    }

    /// Fail an unresolved block, e.g. when its manager closes. Resolved
    /// blocks are left untouched.
    pub(crate) fn fail_if_unresolved(&self, err: Error) {
        self.state.send_modify(|state| {
            if matches!(state, BlockState::Empty | BlockState::Fetching) {
                *state = BlockState::Failed(err.clone());
            }
        });
    }

    /// A block may be evicted only once its fetch has resolved.
    pub(crate) fn is_evictable(&self) -> bool {
        matches!(
            *self.state.borrow(),
            BlockState::Ready(_) | BlockState::Failed(_)
        )
    }

    /// Wait until the state leaves `Empty`/`Fetching`.
    pub(crate) async fn resolved(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so the channel cannot close while
        // we hold a reference to the block.
        let _ = rx
            .wait_for(|state| matches!(state, BlockState::Ready(_) | BlockState::Failed(_)))
            .await;
    }

    /// Read the single byte at absolute offset `pos`.
    pub fn read_byte(&self, pos: u64) -> Result<u8> {
        if !self.contains(pos) {
            return Err(Error::invalid_arg(format!(
                "position {pos} outside block [{}, {}) of {}",
                self.start,
                self.end(),
                self.uri
            )));
        }
        match &*self.state.borrow() {
            BlockState::Ready(bytes) => Ok(bytes[(pos - self.start) as usize]),
            BlockState::Failed(err) => Err(err.clone()),
            BlockState::Empty | BlockState::Fetching => Err(Error::InvariantViolation(format!(
                "read of unfetched block [{}, {}) of {}",
                self.start,
                self.end(),
                self.uri
            ))),
        }
    }

    /// Copy bytes starting at absolute offset `pos` into `buf`.
    ///
    /// Returns the count copied, which is less than `buf.len()` when the
    /// block ends first; the caller continues into the next block.
    pub fn read(&self, buf: &mut [u8], pos: u64) -> Result<usize> {
        if !self.contains(pos) {
            return Err(Error::invalid_arg(format!(
                "position {pos} outside block [{}, {}) of {}",
                self.start,
                self.end(),
                self.uri
            )));
        }
        match &*self.state.borrow() {
            BlockState::Ready(bytes) => {
                let rel = (pos - self.start) as usize;
                let n = buf.len().min(self.len as usize - rel);
                buf[..n].copy_from_slice(&bytes[rel..rel + n]);
                Ok(n)
            }
            BlockState::Failed(err) => Err(err.clone()),
            BlockState::Empty | BlockState::Fetching => Err(Error::InvariantViolation(format!(
                "read of unfetched block [{}, {}) of {}",
                self.start,
                self.end(),
                self.uri
            ))),
        }
    }
}
