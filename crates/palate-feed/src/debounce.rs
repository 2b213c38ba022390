//! Cancel-and-restart timer for search input
//!
//! Each `schedule` aborts the pending timer and starts a new one, so only
//! the last action within a quiet period runs. The action itself is spawned
//! detached once the timer fires: a later keystroke can cancel a timer but
//! never a query that has already started.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Single-shot, restartable delay
#[derive(Debug)]
pub struct Debouncer {
    quiet: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
    generation: Arc<AtomicU64>,
}

impl Debouncer {
    /// Create a debouncer with the given quiet period
    #[must_use]
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: Mutex::new(None),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Run `action` after the quiet period unless rescheduled first
    pub fn schedule<F>(&self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let ticket = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let generation = Arc::clone(&self.generation);
        let quiet = self.quiet;

        let timer = tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            // A restart between wake-up and here loses the race cleanly.
            if generation.load(Ordering::Acquire) == ticket {
                tokio::spawn(action);
            }
        });

        if let Some(previous) = self.pending.lock().replace(timer) {
            previous.abort();
        }
    }

    /// Drop the pending action, if any; returns whether one was pending
    pub fn cancel(&self) -> bool {
        self.generation.fetch_add(1, Ordering::AcqRel);
        match self.pending.lock().take() {
            Some(timer) => {
                let was_pending = !timer.is_finished();
                timer.abort();
                was_pending
            }
            None => false,
        }
    }

    /// Whether a timer is still counting down
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|timer| !timer.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(timer) = self.pending.get_mut().take() {
            timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter_action(counter: &Arc<AtomicUsize>) -> impl Future<Output = ()> + Send + 'static {
        let counter = Arc::clone(counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn burst_runs_once() {
        let debouncer = Debouncer::new(Duration::from_millis(500));
        let runs = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            debouncer.schedule(counter_action(&runs));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn spaced_calls_each_run() {
        let debouncer = Debouncer::new(Duration::from_millis(500));
        let runs = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            debouncer.schedule(counter_action(&runs));
            tokio::time::sleep(Duration::from_millis(700)).await;
        }
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_action() {
        let debouncer = Debouncer::new(Duration::from_millis(500));
        let runs = Arc::new(AtomicUsize::new(0));

        debouncer.schedule(counter_action(&runs));
        assert!(debouncer.is_pending());
        assert!(debouncer.cancel());
        assert!(!debouncer.cancel());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }
}
