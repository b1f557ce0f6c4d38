//! Per-call cancellation and deadline handling
//!
//! A [`CallContext`] travels with every lookup. Cancellation is cooperative:
//! the client calls [`CallContext::checkpoint`] immediately before and after
//! each network round-trip, and bounds every request by the time left.

use crate::error::{Error, Result};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Cancellation token plus optional deadline for one lookup call
#[derive(Clone, Debug, Default)]
pub struct CallContext {
    cancel_token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    /// A context that is never cancelled and has no deadline
    pub fn new() -> Self {
        Self::default()
    }

    /// A context whose deadline is `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().deadline_at(Instant::now() + timeout)
    }

    /// Set an absolute deadline
    #[must_use]
    pub fn deadline_at(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Tie this context to a caller-owned cancellation token
    #[must_use]
    pub fn with_cancel_token(mut self, cancel_token: CancellationToken) -> Self {
        self.cancel_token = cancel_token;
        self
    }

    /// The token observed by this context; cancelling it cancels the call
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel_token
    }

    /// The deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline (`None` when there is no deadline)
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Fail with a cancellation-class error if the call was cancelled or ran out of time
    pub fn checkpoint(&self) -> Result<()> {
        if self.cancel_token.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if let Some(deadline) = self.deadline
            && Instant::now() >= deadline
        {
            return Err(Error::DeadlineExceeded);
        }
        Ok(())
    }

    /// Timeout for the next request: `limit`, or the time left if that is shorter
    pub fn request_timeout(&self, limit: Duration) -> Duration {
        self.remaining().map_or(limit, |left| left.min(limit))
    }

    /// Set the request's timeout from [`request_timeout`](Self::request_timeout).
    ///
    /// A per-request timeout replaces the client-wide one, so `limit` must be
    /// the configured per-request limit.
    pub(crate) fn bound(
        &self,
        request: reqwest::RequestBuilder,
        limit: Duration,
    ) -> reqwest::RequestBuilder {
        request.timeout(self.request_timeout(limit))
    }

    /// Translate a transport error, reporting deadline-driven timeouts as such
    pub(crate) fn classify(&self, err: reqwest::Error) -> Error {
        if err.is_timeout()
            && let Err(expired) = self.checkpoint()
        {
            return expired;
        }
        Error::Network(err)
    }
}
