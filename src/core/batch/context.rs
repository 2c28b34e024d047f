//! Per-request cancellation and deadline

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a context stopped accepting work
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    #[error("context cancelled")]
    Cancelled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Deadline plus cancellation signal for one batch
///
/// Every attempt and every backoff sleep of a batch runs under the same
/// context, so the deadline bounds the whole retry sequence.
#[derive(Debug, Clone)]
pub struct RequestContext {
    deadline: Instant,
    cancel: CancellationToken,
}

impl RequestContext {
    /// Context with its own cancellation token
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::child_of(&CancellationToken::new(), timeout)
    }

    /// Context cancelled together with `parent`
    pub fn child_of(parent: &CancellationToken, timeout: Duration) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            cancel: parent.child_token(),
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Reason the context is done, if it is
    pub fn err(&self) -> Option<ContextError> {
        if self.cancel.is_cancelled() {
            Some(ContextError::Cancelled)
        } else if Instant::now() >= self.deadline {
            Some(ContextError::DeadlineExceeded)
        } else {
            None
        }
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Drive `fut` until it completes or the context ends
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, ContextError>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ContextError::Cancelled),
            _ = tokio::time::sleep_until(self.deadline) => Err(ContextError::DeadlineExceeded),
            output = fut => Ok(output),
        }
    }

    /// Sleep for `duration`, waking early if the context ends
    pub async fn sleep(&self, duration: Duration) -> Result<(), ContextError> {
        self.run(tokio::time::sleep(duration)).await
    }
}
