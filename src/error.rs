//! Error type shared across the crate.

use std::sync::Arc;

use crate::client::ObjectUri;

/// Errors surfaced by the physical I/O layer.
///
/// The type is `Clone` so that a single failed fetch, stored inside the
/// block it belongs to, can be handed to every reader waiting on that
/// block.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A caller-supplied argument was rejected at the call boundary.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The backing store failed to serve a range or metadata request.
    /// Transient by assumption: the affected block is refetched on the
    /// next access.
    #[error("fetch for {uri} failed: {source}")]
    Fetch {
        /// Object the failed request was issued against.
        uri: ObjectUri,
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// An operation was attempted on a closed component.
    #[error("{0} is closed")]
    Closed(&'static str),

    /// Internal bookkeeping contradiction, e.g. a block missing right
    /// after a synchronous availability call. Not retryable.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn invalid_arg(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub(crate) fn fetch(
        uri: &ObjectUri,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Fetch {
            uri: uri.clone(),
            source: Arc::new(source),
        }
    }
}
