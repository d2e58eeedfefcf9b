use std::{
    future::Future,
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use tokio::task::AbortHandle;

/// Single-slot deadline timer keyed by a generation counter.
///
/// Every [`arm`](Self::arm) and [`close`](Self::close) bumps the generation. A callback
/// receives the generation it was armed with and must check [`is_current`](Self::is_current)
/// under the engine lock before mutating anything, so a superseded timer that is already
/// running stays inert. Once closed, the timer never arms again.
#[derive(Debug, Default)]
pub struct RoundTimer {
    generation: AtomicU64,
    closed: AtomicBool,
    pending: Mutex<Option<AbortHandle>>,
}

impl RoundTimer {
    /// Open timer with nothing armed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `fire` after `delay`, superseding any previously armed callback. Returns the
    /// armed generation, or `None` when the timer is closed.
    ///
    /// The previous task is not aborted here: arming usually happens from inside that very task.
    pub fn arm<F, Fut>(&self, delay: Duration, fire: F) -> Option<u64>
    where
        F: FnOnce(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_closed() {
            return None;
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            fire(generation).await;
        });
        *pending = Some(task.abort_handle());
        Some(generation)
    }

    /// Permanently shut the timer: the armed callback is invalidated and aborted if it has not
    /// completed, and later [`arm`](Self::arm) calls do nothing.
    pub fn close(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        self.closed.store(true, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = pending.take() {
            handle.abort();
        }
    }

    /// Whether [`close`](Self::close) was called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Whether `generation` is still the armed one on an open timer.
    pub fn is_current(&self, generation: u64) -> bool {
        !self.is_closed() && self.generation.load(Ordering::SeqCst) == generation
    }
}

/// Seconds since the Unix epoch for a deadline `remaining` from now.
pub fn unix_deadline(remaining: Duration) -> i64 {
    (SystemTime::now() + remaining)
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::mpsc;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn armed_timer_fires_with_current_generation() {
        let timer = Arc::new(RoundTimer::new());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let armed = timer
            .arm(Duration::from_secs(10), move |generation| async move {
                let _ = tx.send(generation);
            })
            .unwrap();

        tokio::time::advance(Duration::from_secs(11)).await;
        let fired = rx.recv().await.unwrap();
        assert_eq!(fired, armed);
        assert!(timer.is_current(fired));
    }

    #[tokio::test(start_paused = true)]
    async fn closed_timer_never_fires() {
        let timer = RoundTimer::new();
        let (tx, mut rx) = mpsc::unbounded_channel::<u64>();

        let armed = timer.arm(Duration::from_secs(10), move |generation| async move {
            let _ = tx.send(generation);
        });
        timer.close();

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(rx.try_recv().is_err());
        assert!(!timer.is_current(armed.unwrap()));
    }

    #[tokio::test(start_paused = true)]
    async fn closed_timer_refuses_to_arm_again() {
        let timer = RoundTimer::new();
        let (tx, mut rx) = mpsc::unbounded_channel::<u64>();
        timer.close();

        let armed = timer.arm(Duration::from_secs(1), move |generation| async move {
            let _ = tx.send(generation);
        });

        assert_eq!(armed, None);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
        assert!(timer.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_timer_sees_stale_generation() {
        let timer = RoundTimer::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let first_tx = tx.clone();
        let first = timer.arm(Duration::from_secs(1), move |generation| async move {
            let _ = first_tx.send(generation);
        });
        let second = timer.arm(Duration::from_secs(5), move |generation| async move {
            let _ = tx.send(generation);
        });
        let (first, second) = (first.unwrap(), second.unwrap());

        assert_eq!(rx.recv().await, Some(first));
        assert!(!timer.is_current(first));
        assert_eq!(rx.recv().await, Some(second));
        assert!(timer.is_current(second));
    }
}
