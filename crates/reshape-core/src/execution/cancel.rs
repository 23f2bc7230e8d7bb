//! Cooperative query cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::operators::OperatorError;

/// A shared flag checked by long-running operators.
///
/// Clones share the same flag, so a token handed to a session can be
/// cancelled from another thread while a query runs.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Clears a previous cancellation request.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::Release);
    }

    /// Returns true once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Returns `Err(Cancelled)` if cancellation has been requested.
    pub fn check(&self) -> Result<(), OperatorError> {
        if self.is_cancelled() {
            Err(OperatorError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_flag() {
        let token = CancellationToken::new();
        let other = token.clone();
        assert!(token.check().is_ok());

        other.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(OperatorError::Cancelled)));

        token.reset();
        assert!(!other.is_cancelled());
    }
}
