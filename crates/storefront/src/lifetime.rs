//! View lifetimes and owned background tasks.
//!
//! A [`Lifetime`] stands for a mounted view. Work started on behalf of the
//! view runs through a [`LifetimeToken`], and its result is thrown away if
//! the view is gone by the time the response arrives. Timers are held in a
//! [`TaskHandle`], which aborts the task when dropped.

use std::future::Future;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Owner of a cancellation signal. Ends when dropped.
#[derive(Debug)]
pub struct Lifetime {
    tx: watch::Sender<bool>,
}

impl Default for Lifetime {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifetime {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// A token observing this lifetime.
    #[must_use]
    pub fn token(&self) -> LifetimeToken {
        LifetimeToken {
            rx: self.tx.subscribe(),
        }
    }

    /// End the lifetime. Pending [`LifetimeToken::run`] calls resolve to `None`.
    pub fn end(&self) {
        self.tx.send_replace(true);
    }

    #[must_use]
    pub fn is_ended(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Drop for Lifetime {
    fn drop(&mut self) {
        self.end();
    }
}

/// Cheap handle observing a [`Lifetime`].
#[derive(Debug, Clone)]
pub struct LifetimeToken {
    rx: watch::Receiver<bool>,
}

impl LifetimeToken {
    #[must_use]
    pub fn is_ended(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the lifetime has ended.
    pub async fn ended(&self) {
        let mut rx = self.rx.clone();
        // A dropped sender also means the lifetime is over
        let _ = rx.wait_for(|ended| *ended).await;
    }

    /// Drive `fut` unless the lifetime ends first.
    ///
    /// Returns `None` when the lifetime ended before or while `fut` ran, in
    /// which case the caller must not apply the result.
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        if self.is_ended() {
            return None;
        }
        tokio::select! {
            biased;
            () = self.ended() => None,
            output = fut => (!self.is_ended()).then_some(output),
        }
    }

    /// Spawn `fut` as a task that stops when the lifetime ends or the
    /// returned handle is dropped.
    pub fn spawn<F>(&self, fut: F) -> TaskHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.clone();
        TaskHandle::spawn(async move {
            token.run(fut).await;
        })
    }
}

/// A spawned task that is aborted when the handle is dropped.
#[derive(Debug)]
pub struct TaskHandle {
    handle: JoinHandle<()>,
}

impl TaskHandle {
    pub fn spawn<F>(fut: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            handle: tokio::spawn(fut),
        }
    }

    /// Whether the task has stopped.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the task now.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
