//! Single-assignment result cell.
//!
//! A [`Promise`] bridges the read task, which completes it, and the caller
//! task, which waits on it. The first `resolve` or `reject` wins; later calls
//! are ignored.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

use super::error::{ClientError, ClientResult};

type Callback<T> = Box<dyn FnOnce(ClientResult<T>) + Send>;

struct State<T> {
    outcome: Option<ClientResult<T>>,
    callbacks: Vec<Callback<T>>,
}

struct Inner<T> {
    state: Mutex<State<T>>,
    notify: Notify,
}

/// Shared, single-assignment result cell.
///
/// Cloning yields another handle to the same cell.
pub struct Promise<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("complete", &self.is_complete())
            .finish()
    }
}

impl<T: Clone + Send + 'static> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Promise<T> {
    /// Check whether a value or failure has been set.
    pub fn is_complete(&self) -> bool {
        self.inner.state.lock().outcome.is_some()
    }
}

impl<T: Clone + Send + 'static> Promise<T> {
    /// Create an empty promise.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    outcome: None,
                    callbacks: Vec::new(),
                }),
                notify: Notify::new(),
            }),
        }
    }

    /// Complete with a value. Returns `false` if already complete.
    pub fn resolve(&self, value: T) -> bool {
        self.complete(Ok(value))
    }

    /// Complete with a failure. Returns `false` if already complete.
    pub fn reject(&self, error: ClientError) -> bool {
        self.complete(Err(error))
    }

    fn complete(&self, outcome: ClientResult<T>) -> bool {
        let callbacks = {
            let mut state = self.inner.state.lock();
            if state.outcome.is_some() {
                return false;
            }
            state.outcome = Some(outcome.clone());
            std::mem::take(&mut state.callbacks)
        };

        self.inner.notify.notify_waiters();
        for callback in callbacks {
            callback(outcome.clone());
        }
        true
    }

    /// Current outcome without waiting.
    pub fn try_get(&self) -> Option<ClientResult<T>> {
        self.inner.state.lock().outcome.clone()
    }

    /// Register a callback run exactly once with the outcome.
    ///
    /// Runs immediately on the calling task if the promise is already
    /// complete, otherwise on the task that completes it.
    pub fn on_complete<F>(&self, callback: F)
    where
        F: FnOnce(ClientResult<T>) + Send + 'static,
    {
        let outcome = {
            let mut state = self.inner.state.lock();
            match &state.outcome {
                Some(outcome) => outcome.clone(),
                None => {
                    state.callbacks.push(Box::new(callback));
                    return;
                }
            }
        };
        callback(outcome);
    }

    /// Wait until the promise is complete.
    pub async fn wait(&self) -> ClientResult<T> {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(outcome) = self.try_get() {
                return outcome;
            }
            notified.await;
        }
    }

    /// Wait at most `timeout` for the promise to complete.
    pub async fn wait_timeout(&self, timeout: Duration) -> ClientResult<T> {
        match tokio::time::timeout(timeout, self.wait()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ClientError::timeout(format!(
                "no response within {:?}",
                timeout
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_resolve_then_wait() {
        let promise = Promise::new();
        assert!(promise.resolve(5));
        assert_eq!(promise.wait().await, Ok(5));
        assert_eq!(promise.wait_timeout(Duration::from_millis(1)).await, Ok(5));
    }

    #[tokio::test]
    async fn test_first_writer_wins() {
        let promise = Promise::new();
        assert!(promise.reject(ClientError::ConnectionClosed));
        assert!(!promise.resolve(1));
        assert!(!promise.reject(ClientError::EmptyResult));
        assert_eq!(promise.wait().await, Err(ClientError::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_wait_wakes_on_resolve() {
        let promise: Promise<&'static str> = Promise::new();
        let waiter = {
            let promise = promise.clone();
            tokio::spawn(async move { promise.wait().await })
        };

        tokio::task::yield_now().await;
        promise.resolve("done");
        assert_eq!(waiter.await.unwrap(), Ok("done"));
    }

    #[tokio::test]
    async fn test_wait_timeout() {
        let promise: Promise<u8> = Promise::new();
        let started = std::time::Instant::now();
        let result = promise.wait_timeout(Duration::from_millis(20)).await;
        assert!(matches!(result, Err(ClientError::Timeout(_))));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(!promise.is_complete());
    }

    #[test]
    fn test_on_complete_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let promise = Promise::new();

        let counter = Arc::clone(&calls);
        promise.on_complete(move |outcome| {
            assert_eq!(outcome, Ok(3));
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        promise.resolve(3);
        promise.resolve(4);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let counter = Arc::clone(&calls);
        promise.on_complete(move |outcome| {
            assert_eq!(outcome, Ok(3));
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
