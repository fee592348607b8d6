//! Caller-supplied deadline and cancellation signal.

use crate::{Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Deadline and cancellation signal threaded through every adapter call.
///
/// Adapters check the deadline at entry and between chunk transfers, so a
/// large blob upload observes cancellation without finishing the whole
/// payload first. The default is no deadline and no cancellation.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use lodestore::storage::Deadline;
///
/// let unbounded = Deadline::none();
/// assert!(unbounded.check("load_dataset").is_ok());
///
/// let tight = Deadline::within(Duration::ZERO);
/// assert!(tight.check("load_dataset").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Deadline {
    at: Option<Instant>,
    cancel: Option<Arc<AtomicBool>>,
}

impl Deadline {
    /// No deadline, no cancellation.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            at: None,
            cancel: None,
        }
    }

    /// Expires `timeout` from now.
    #[must_use]
    pub fn within(timeout: Duration) -> Self {
        Self {
            at: Instant::now().checked_add(timeout),
            cancel: None,
        }
    }

    /// Attaches a cancellation flag; setting it to `true` cancels every
    /// operation still carrying this deadline.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Whether the deadline has passed or cancellation was requested.
    #[must_use]
    pub fn expired(&self) -> bool {
        if let Some(flag) = &self.cancel {
            if flag.load(Ordering::Relaxed) {
                return true;
            }
        }
        self.at.is_some_and(|at| Instant::now() >= at)
    }

    /// Time remaining, if a deadline is set. `None` means unbounded.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.at.map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Fails with [`Error::Cancelled`] when expired or cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] naming `operation` once the deadline has
    /// passed or the cancellation flag is set.
    pub fn check(&self, operation: &str) -> Result<()> {
        if self.expired() {
            return Err(Error::Cancelled {
                operation: operation.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_never_expires() {
        let deadline = Deadline::none();
        assert!(!deadline.expired());
        assert!(deadline.remaining().is_none());
        assert!(deadline.check("op").is_ok());
    }

    #[test]
    fn test_zero_timeout_expires_immediately() {
        let deadline = Deadline::within(Duration::ZERO);
        assert!(deadline.expired());
        let err = deadline.check("blob_put").unwrap_err();
        assert!(matches!(err, Error::Cancelled { ref operation } if operation == "blob_put"));
    }

    #[test]
    fn test_generous_timeout_does_not_expire() {
        let deadline = Deadline::within(Duration::from_secs(3600));
        assert!(!deadline.expired());
        assert!(deadline.remaining().is_some());
    }

    #[test]
    fn test_cancel_flag_trips_deadline() {
        let flag = Arc::new(AtomicBool::new(false));
        let deadline = Deadline::none().with_cancel_flag(Arc::clone(&flag));
        assert!(deadline.check("op").is_ok());

        flag.store(true, Ordering::Relaxed);
        assert!(deadline.expired());
        assert!(deadline.check("op").is_err());
    }
}
