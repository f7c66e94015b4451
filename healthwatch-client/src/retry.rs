//! One-shot reconnect timer owned by the connection driver.

use std::future::pending;
use std::pin::Pin;
use std::time::Duration;

use tokio::time::{sleep, Instant, Sleep};

/// A cancellable delayed action.
///
/// At most one deadline exists at a time: [`arm`](RetryTimer::arm) on an
/// armed timer leaves the existing deadline alone. The timer disarms itself
/// when it fires.
#[derive(Debug)]
pub struct RetryTimer {
    interval: Duration,
    deadline: Option<Pin<Box<Sleep>>>,
}

impl RetryTimer {
    /// Create a disarmed timer with the given period.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
        }
    }

    /// Schedule a firing one interval from now, unless one is pending.
    ///
    /// Returns `true` if a new deadline was scheduled.
    pub fn arm(&mut self) -> bool {
        if self.deadline.is_some() {
            return false;
        }
        self.deadline = Some(Box::pin(sleep(self.interval)));
        true
    }

    /// Drop any pending deadline.
    ///
    /// Returns `true` if a deadline was pending.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// Whether a firing is pending.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// When the pending firing is due.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline.as_ref().map(|sleep| sleep.deadline())
    }

    /// The configured period.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Resolve when the pending deadline passes; never resolves while
    /// disarmed. Cancel-safe: dropping the future keeps the deadline.
    pub async fn fired(&mut self) {
        match self.deadline.as_mut() {
            Some(deadline) => {
                deadline.as_mut().await;
                self.deadline = None;
            }
            None => pending().await,
        }
    }
}
