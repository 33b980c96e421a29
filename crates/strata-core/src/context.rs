//! Cancellable operation context.
//!
//! Every provider call made on behalf of a filesystem request is bound to an
//! [`OpContext`]. Cancelling the context aborts the in-flight call and the
//! caller sees [`FsError::Cancelled`] rather than a provider failure.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::{FsError, ProviderError};

/// Operation context carried through one filesystem request.
#[derive(Debug, Clone, Default)]
pub struct OpContext {
    token: CancellationToken,
}

impl OpContext {
    /// Creates a fresh, uncancelled context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context that is cancelled together with `parent`.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    /// Cancels the context and everything derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns true once the context has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Fails fast if the context is already cancelled.
    pub fn check(&self) -> Result<(), FsError> {
        if self.is_cancelled() {
            Err(FsError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Runs a provider call, aborting it if the context is cancelled.
    ///
    /// Provider errors are passed through unchanged.
    pub async fn run<T, F>(&self, call: F) -> Result<T, FsError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(FsError::Cancelled),
            result = call => result.map_err(FsError::Provider),
        }
    }
}
