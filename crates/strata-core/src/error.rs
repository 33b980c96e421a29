//! Error taxonomy.

use thiserror::Error;

/// Errors surfaced by provider clients.
///
/// These are produced by SDK adapters and are never rewritten by the core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The provider has no such resource
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Credentials lack access
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Transport failure
    #[error("Network error: {0}")]
    Network(String),

    /// Rate limit or quota exhausted
    #[error("Quota exceeded: {0}")]
    Quota(String),

    /// Any other provider failure
    #[error("{0}")]
    Other(String),
}

/// Filesystem-level errors.
#[derive(Debug, Error)]
pub enum FsError {
    /// No entry with this name exists in the current listing
    #[error("No such entry: {0}")]
    NotFound(String),

    /// The entry does not implement the requested operation
    #[error("Operation {op} not supported on {entry}")]
    Unsupported {
        /// Requested operation
        op: &'static str,
        /// Entry the operation was requested on
        entry: String,
    },

    /// Failure reported by the provider, passed through verbatim
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A cascading delete stopped partway
    #[error("Failed to delete {key} after removing {deleted} objects: {source}")]
    PartialDelete {
        /// Key whose deletion failed
        key: String,
        /// Number of objects removed before the failure
        deleted: usize,
        /// The provider failure
        #[source]
        source: ProviderError,
    },

    /// An entry document could not be encoded
    #[error("Failed to encode document: {0}")]
    Encode(#[from] serde_json::Error),

    /// The operation context was cancelled
    #[error("Operation cancelled")]
    Cancelled,
}

impl FsError {
    /// Creates an unsupported-operation error.
    pub fn unsupported(op: &'static str, entry: impl Into<String>) -> Self {
        FsError::Unsupported {
            op,
            entry: entry.into(),
        }
    }

    /// Returns true for the "no such entry" outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            FsError::NotFound(_) | FsError::Provider(ProviderError::NotFound(_))
        )
    }

    /// Translates the error into the errno reported to the mount layer.
    pub fn errno(&self) -> i32 {
        match self {
            FsError::NotFound(_) => libc::ENOENT,
            FsError::Unsupported { .. } => libc::ENOTSUP,
            FsError::Cancelled => libc::EINTR,
            FsError::Encode(_) => libc::EIO,
            FsError::Provider(err) | FsError::PartialDelete { source: err, .. } => match err {
                ProviderError::NotFound(_) => libc::ENOENT,
                ProviderError::PermissionDenied(_) => libc::EACCES,
                _ => libc::EIO,
            },
        }
    }
}
