//! Retry policy for transport attempts.
//!
//! The transport consults a [`Retrier`] after every failed attempt. The
//! stock [`RetryPolicy`] only looks at how many attempts were made: it
//! permits a retry while `attempts_so_far < retry_count`, never waits
//! between attempts, and treats every error kind alike.

use std::time::Duration;

use crate::error::TransportError;

/// Outcome of a retry decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDecision {
    /// Whether to attempt the request again.
    pub retry: bool,
    /// How long to wait before the next attempt.
    pub delay: Duration,
}

impl RetryDecision {
    /// Give up and report the last error.
    pub const STOP: RetryDecision = RetryDecision {
        retry: false,
        delay: Duration::ZERO,
    };

    /// Retry right away.
    pub const IMMEDIATELY: RetryDecision = RetryDecision {
        retry: true,
        delay: Duration::ZERO,
    };
}

/// Decides whether a failed transport attempt is tried again.
pub trait Retrier: Send + Sync {
    /// Called after a failed attempt.
    ///
    /// `attempts_so_far` counts the retries already made, so it is `0`
    /// after the first attempt fails.
    fn should_retry(&self, attempts_so_far: u32, last_error: &TransportError) -> RetryDecision;
}

/// Count-based retry policy with no backoff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    retry_count: u32,
}

impl RetryPolicy {
    /// A policy that allows up to `retry_count` retries after the first attempt.
    pub fn new(retry_count: u32) -> Self {
        Self { retry_count }
    }

    /// A policy that never retries.
    pub fn never() -> Self {
        Self::new(0)
    }

    /// Maximum number of retries.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }
}

impl Retrier for RetryPolicy {
    fn should_retry(&self, attempts_so_far: u32, _last_error: &TransportError) -> RetryDecision {
        if attempts_so_far < self.retry_count {
            RetryDecision::IMMEDIATELY
        } else {
            RetryDecision::STOP
        }
    }
}
