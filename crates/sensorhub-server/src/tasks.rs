//! Per-message task pool.
//!
//! Every inbound message runs on its own tokio task so a slow sink never
//! stalls the broker event loop. The pool is unbounded unless built with
//! [`TaskPool::bounded`], in which case each task waits for a semaphore
//! permit after it has been spawned; the event loop itself never waits.
//!
//! Shutdown does not drain: tasks still running when the runtime stops are
//! dropped.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct TaskPool {
    limit: Option<Arc<Semaphore>>,
    in_flight: Arc<AtomicUsize>,
}

/// Decrements the in-flight count when the task finishes or is dropped.
struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

impl TaskPool {
    /// Spawn without limit.
    pub fn unbounded() -> Self {
        Self {
            limit: None,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// At most `max_in_flight` tasks run their body at once. Zero is treated
    /// as one.
    pub fn bounded(max_in_flight: usize) -> Self {
        Self {
            limit: Some(Arc::new(Semaphore::new(max_in_flight.max(1)))),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Run `work` on a new task.
    pub fn spawn<F>(&self, work: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        let guard = InFlightGuard(self.in_flight.clone());
        let limit = self.limit.clone();

        tokio::spawn(async move {
            let _guard = guard;
            let _permit = match limit {
                // A closed semaphore only happens on teardown; run anyway.
                Some(sem) => sem.acquire_owned().await.ok(),
                None => None,
            };
            work.await;
        })
    }

    /// Tasks spawned and not yet finished, including those waiting for a
    /// permit.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    pub fn is_bounded(&self) -> bool {
        self.limit.is_some()
    }
}

impl Default for TaskPool {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_unbounded_runs_everything() {
        let pool = TaskPool::unbounded();
        let counter = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..50)
            .map(|_| {
                let counter = counter.clone();
                pool.spawn(async move {
                    counter.fetch_add(1, Ordering::Relaxed);
                })
            })
            .collect();
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(counter.load(Ordering::Relaxed), 50);
        assert_eq!(pool.in_flight(), 0);
        assert!(!pool.is_bounded());
    }

    #[tokio::test]
    async fn test_in_flight_tracks_running_tasks() {
        let pool = TaskPool::unbounded();
        let (tx, rx) = oneshot::channel::<()>();
        let handle = pool.spawn(async move {
            let _ = rx.await;
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(pool.in_flight(), 1);
        tx.send(()).unwrap();
        handle.await.unwrap();
        assert_eq!(pool.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_bounded_limits_concurrency() {
        let pool = TaskPool::bounded(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let running = running.clone();
                let peak = peak.clone();
                pool.spawn(async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for h in handles {
            h.await.unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(pool.in_flight(), 0);
    }
}
