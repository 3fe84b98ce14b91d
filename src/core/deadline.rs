//! Deadline budgets threaded through every operation that can block.
//!
//! A [`Deadline`] pairs an expiry instant with a cancellation token. Nested
//! operations derive a [`Deadline::child`] whose expiry never outlives the
//! parent and whose token is cancelled whenever the parent's is.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::core::error::QuoteError;

#[derive(Debug, Clone)]
pub struct Deadline {
    expires_at: Instant,
    budget: Duration,
    token: CancellationToken,
}

impl Deadline {
    /// Starts a new root deadline that expires `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self {
            expires_at: Instant::now() + budget,
            budget,
            token: CancellationToken::new(),
        }
    }

    /// Derives a nested deadline with at most `budget`, bounded by the time
    /// this deadline has left. Cancelling `self` cancels the child.
    pub fn child(&self, budget: Duration) -> Self {
        let budget = budget.min(self.remaining());
        Self {
            expires_at: Instant::now() + budget,
            budget,
            token: self.token.child_token(),
        }
    }

    /// The effective budget this deadline was created with.
    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns a guard that cancels this deadline (and all children) when
    /// dropped, e.g. when a request handler future is abandoned.
    pub fn cancel_on_drop(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }

    /// Runs `fut` until it completes, the deadline passes, or the deadline is
    /// cancelled, whichever happens first.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, QuoteError>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(QuoteError::Cancelled),
            out = tokio::time::timeout_at(self.expires_at, fut) => {
                out.map_err(|_| QuoteError::DeadlineExceeded { budget: self.budget })
            }
        }
    }
}
