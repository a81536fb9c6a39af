//! Trailing-edge debounce for typed input.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Lets only the last of a burst of calls through.
///
/// Each call to [`Debouncer::settle`] waits out the delay and then reports
/// whether it is still the most recent call.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    generation: AtomicU64,
}

impl Debouncer {
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: AtomicU64::new(0),
        }
    }

    /// Wait for the input to go quiet. `false` means a later call superseded
    /// this one and it should do nothing.
    pub async fn settle(&self) -> bool {
        let mine = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        tokio::time::sleep(self.delay).await;
        self.generation.load(Ordering::Acquire) == mine
    }

    /// Supersede every waiting call.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_only_last_call_settles() {
        let debouncer = Arc::new(Debouncer::new(Duration::from_millis(300)));

        let first = tokio::spawn({
            let debouncer = Arc::clone(&debouncer);
            async move { debouncer.settle().await }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        let second = tokio::spawn({
            let debouncer = Arc::clone(&debouncer);
            async move { debouncer.settle().await }
        });

        assert!(!first.await.unwrap_or(true));
        assert!(second.await.unwrap_or(false));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel() {
        let debouncer = Arc::new(Debouncer::new(Duration::from_millis(300)));
        let pending = tokio::spawn({
            let debouncer = Arc::clone(&debouncer);
            async move { debouncer.settle().await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        debouncer.cancel();

        assert!(!pending.await.unwrap_or(true));
    }
}
