//! Single-flight deduplication of concurrent identical fetches.
//!
//! When several callers ask for the same key while a fetch is already
//! in flight, only the first caller (the leader) executes the producer;
//! everyone else waits on the same settlement — success or failure —
//! delivered over a oneshot channel. The pending entry is cleared when
//! the leader settles, even if its future is dropped mid-fetch.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use crate::error::SourceError;

type Waiters<T> = Vec<oneshot::Sender<Result<T, SourceError>>>;

/// Per-key single-flight fetch table.
#[derive(Debug)]
pub struct RequestCoalescer<T> {
    pending: Arc<Mutex<HashMap<String, Waiters<T>>>>,
}

impl<T: Clone> Default for RequestCoalescer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> RequestCoalescer<T> {
    pub fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run `fetch` for `key` unless one is already in flight; either
    /// way, resolve to that single fetch's result.
    pub async fn coalesce<F, Fut>(&self, key: &str, fetch: F) -> Result<T, SourceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        // Atomic check-and-register: either join the in-flight fetch
        // or claim leadership for this key.
        let receiver = {
            let mut pending = self.lock();
            match pending.get_mut(key) {
                Some(waiters) => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    Some(rx)
                }
                None => {
                    pending.insert(key.to_owned(), Vec::new());
                    None
                }
            }
        };

        if let Some(rx) = receiver {
            return match rx.await {
                Ok(result) => result,
                Err(_) => Err(SourceError::internal(
                    "coalesced fetch settled without a result",
                )),
            };
        }

        // Leader path. The guard clears the pending entry if this
        // future is dropped before settling, so joiners fail fast
        // instead of waiting forever.
        let guard = PendingGuard {
            pending: Arc::clone(&self.pending),
            key: key.to_owned(),
            armed: true,
        };

        let result = fetch().await;

        let waiters = guard.settle();
        for waiter in waiters {
            let _ = waiter.send(result.clone());
        }

        result
    }

    /// Number of keys currently in flight.
    pub fn in_flight(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Waiters<T>>> {
        self.pending.lock().expect("coalescer lock is not poisoned")
    }
}

struct PendingGuard<T> {
    pending: Arc<Mutex<HashMap<String, Waiters<T>>>>,
    key: String,
    armed: bool,
}

impl<T> PendingGuard<T> {
    fn settle(mut self) -> Waiters<T> {
        self.armed = false;
        self.pending
            .lock()
            .expect("coalescer lock is not poisoned")
            .remove(&self.key)
            .unwrap_or_default()
    }
}

impl<T> Drop for PendingGuard<T> {
    fn drop(&mut self) {
        if self.armed {
            if let Ok(mut pending) = self.pending.lock() {
                // Dropping the waiters' senders wakes every joiner
                // with a recv error.
                pending.remove(&self.key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn concurrent_callers_trigger_exactly_one_fetch() {
        let coalescer = Arc::new(RequestCoalescer::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let fetch = |calls: Arc<AtomicUsize>| async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok(String::from("payload"))
        };

        let (a, b, c) = tokio::join!(
            coalescer.coalesce("quote:NSE:RELIANCE", || fetch(Arc::clone(&calls))),
            coalescer.coalesce("quote:NSE:RELIANCE", || fetch(Arc::clone(&calls))),
            coalescer.coalesce("quote:NSE:RELIANCE", || fetch(Arc::clone(&calls))),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1, "single upstream call");
        assert_eq!(a.expect("leader result"), "payload");
        assert_eq!(b.expect("joined result"), "payload");
        assert_eq!(c.expect("joined result"), "payload");
        assert_eq!(coalescer.in_flight(), 0, "pending entry cleared");
    }

    #[tokio::test]
    async fn failure_propagates_to_every_joined_caller() {
        let coalescer = Arc::new(RequestCoalescer::<String>::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let fetch = |calls: Arc<AtomicUsize>| async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Err(SourceError::unavailable("upstream down"))
        };

        let (a, b) = tokio::join!(
            coalescer.coalesce("quote:NSE:TCS", || fetch(Arc::clone(&calls))),
            coalescer.coalesce("quote:NSE:TCS", || fetch(Arc::clone(&calls))),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            a.expect_err("leader failure").message(),
            "upstream down"
        );
        assert_eq!(
            b.expect_err("joined failure").message(),
            "upstream down"
        );
    }

    #[tokio::test]
    async fn distinct_keys_fetch_independently() {
        let coalescer = RequestCoalescer::new();
        let calls = AtomicUsize::new(0);

        let (a, b) = tokio::join!(
            coalescer.coalesce("quote:NSE:INFY", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(1)
            }),
            coalescer.coalesce("quote:NSE:WIPRO", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(2)
            }),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(a.expect("infy"), 1);
        assert_eq!(b.expect("wipro"), 2);
    }

    #[tokio::test]
    async fn sequential_calls_each_fetch() {
        let coalescer = RequestCoalescer::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let result = coalescer
                .coalesce("quote:NSE:SBIN", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await;
            assert_eq!(result.expect("fetch"), 7);
        }

        assert_eq!(
            calls.load(Ordering::SeqCst),
            2,
            "no pending entry between sequential calls"
        );
    }
}
