//! Debounced save scheduling with a staleness ceiling.
//!
//! # Responsibility
//! - Collapse bursts of mutations into one save after a quiet period.
//! - Force a save when writes never go quiet long enough.
//!
//! # Invariants
//! - At most one debounce timer is pending per scheduler.
//! - Cancelling a timer never cancels a save that already started.
//! - The last-attempt timestamp only moves forward.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Something the scheduler can persist.
pub trait Persist: Send + Sync + 'static {
    /// Runs one save attempt to completion.
    fn persist(self: Arc<Self>) -> impl Future<Output = ()> + Send;
}

struct SchedulerState {
    pending: Option<JoinHandle<()>>,
    last_attempt: Instant,
}

/// Per-board save timer.
pub struct PersistenceScheduler {
    debounce: Duration,
    staleness_ceiling: Duration,
    runtime: Handle,
    state: Mutex<SchedulerState>,
}

impl PersistenceScheduler {
    /// Creates an idle scheduler whose staleness clock starts now.
    pub fn new(debounce: Duration, staleness_ceiling: Duration, runtime: Handle) -> Self {
        Self {
            debounce,
            staleness_ceiling,
            runtime,
            state: Mutex::new(SchedulerState {
                pending: None,
                last_attempt: Instant::now(),
            }),
        }
    }

    /// Notes that a mutation happened and `target` needs saving.
    ///
    /// Replaces any pending debounce timer. When the previous attempt started
    /// longer ago than the staleness ceiling, a save is also started right away.
    pub fn trigger<T: Persist>(&self, target: &Arc<T>) {
        let mut state = self.state.lock();

        if let Some(pending) = state.pending.take() {
            pending.abort();
        }

        let debounced = Arc::clone(target);
        let delay = self.debounce;
        let runtime = self.runtime.clone();
        state.pending = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            // Detached: a later trigger aborts this task, not the save.
            runtime.spawn(debounced.persist());
        }));

        if state.last_attempt.elapsed() > self.staleness_ceiling {
            state.last_attempt = Instant::now();
            self.runtime.spawn(Arc::clone(target).persist());
        }
    }

    /// Records that a save attempt is starting.
    pub fn mark_attempt(&self) {
        let mut state = self.state.lock();
        let now = Instant::now();
        if now > state.last_attempt {
            state.last_attempt = now;
        }
    }

    /// Drops the pending debounce timer, if any.
    pub fn cancel(&self) {
        if let Some(pending) = self.state.lock().pending.take() {
            pending.abort();
        }
    }

    #[cfg(test)]
    fn has_pending(&self) -> bool {
        self.state
            .lock()
            .pending
            .as_ref()
            .is_some_and(|pending| !pending.is_finished())
    }

    #[cfg(test)]
    fn last_attempt(&self) -> Instant {
        self.state.lock().last_attempt
    }
}

impl Drop for PersistenceScheduler {
    fn drop(&mut self) {
        if let Some(pending) = self.state.get_mut().pending.take() {
            pending.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Persist, PersistenceScheduler};
    use std::future::Future;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::runtime::Handle;

    #[derive(Default)]
    struct CountingTarget {
        saves: AtomicUsize,
    }

    impl Persist for CountingTarget {
        fn persist(self: Arc<Self>) -> impl Future<Output = ()> + Send {
            async move {
                self.saves.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn scheduler() -> PersistenceScheduler {
        PersistenceScheduler::new(
            Duration::from_secs(2),
            Duration::from_secs(60),
            Handle::current(),
        )
    }

    async fn settle(duration: Duration) {
        tokio::time::sleep(duration).await;
        tokio::task::yield_now().await;
    }

    #[tokio::test(start_paused = true)]
    async fn burst_produces_one_save_after_quiet_period() {
        let scheduler = scheduler();
        let target = Arc::new(CountingTarget::default());

        for _ in 0..5 {
            scheduler.trigger(&target);
            settle(Duration::from_millis(500)).await;
        }
        assert_eq!(target.saves.load(Ordering::SeqCst), 0);
        assert!(scheduler.has_pending());

        settle(Duration::from_millis(1600)).await;
        assert_eq!(target.saves.load(Ordering::SeqCst), 1);

        settle(Duration::from_secs(10)).await;
        assert_eq!(target.saves.load(Ordering::SeqCst), 1);
        assert!(!scheduler.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn continuous_writes_hit_staleness_ceiling() {
        let scheduler = scheduler();
        let target = Arc::new(CountingTarget::default());

        for _ in 0..65 {
            settle(Duration::from_secs(1)).await;
            scheduler.trigger(&target);
        }
        settle(Duration::ZERO).await;
        assert_eq!(target.saves.load(Ordering::SeqCst), 1);

        settle(Duration::from_secs(3)).await;
        assert_eq!(target.saves.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_timer() {
        let scheduler = scheduler();
        let target = Arc::new(CountingTarget::default());

        scheduler.trigger(&target);
        scheduler.cancel();
        settle(Duration::from_secs(5)).await;
        assert_eq!(target.saves.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn mark_attempt_moves_clock_forward() {
        let scheduler = scheduler();
        let before = scheduler.last_attempt();
        tokio::time::advance(Duration::from_secs(3)).await;
        scheduler.mark_attempt();
        assert_eq!(scheduler.last_attempt() - before, Duration::from_secs(3));
    }
}
