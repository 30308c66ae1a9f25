//! Declarative prefetch plans.
//!
//! An external read-pattern predictor produces an [IoPlan], a set of
//! byte ranges it expects to be read soon, and hands it to
//! [`Blob::execute`](crate::Blob::execute). Execution is fire-and-forget:
//! the returned [IoPlanExecution] reports the submission outcome only,
//! while the fetches continue in the background.

use crate::{Error, Result};

/// Blocking behaviour of a block-fetch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Wait until every targeted block has resolved.
    Sync,
    /// Schedule the fetches and return immediately.
    Async,
}

/// An inclusive byte range `[start, end]`.
///
/// `PrefetchRange::new(0, 100)?` covers 101 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefetchRange {
    start: u64,
    end: u64,
}

impl PrefetchRange {
    pub fn new(start: u64, end: u64) -> Result<Self> {
        if end < start {
            return Err(Error::invalid_arg(format!(
                "range end {end} is before start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    /// First byte covered.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Last byte covered.
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Number of bytes covered. Never zero.
    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Ordered set of ranges to prefetch.
#[derive(Debug, Clone, Default)]
pub struct IoPlan {
    ranges: Vec<PrefetchRange>,
}

impl IoPlan {
    pub fn new(ranges: Vec<PrefetchRange>) -> Self {
        Self { ranges }
    }

    pub fn ranges(&self) -> &[PrefetchRange] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// Submission outcome of an [IoPlan].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoPlanState {
    /// Every range was scheduled; fetches run in the background.
    Submitted,
    /// Scheduling stopped at the first failing range. Ranges scheduled
    /// before the failure keep running.
    Failed,
}

/// Result of submitting an [IoPlan]. Not a completion outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoPlanExecution {
    pub state: IoPlanState,
}
