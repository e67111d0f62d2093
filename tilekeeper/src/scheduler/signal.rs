//! Restart/resume signal shared between dirty-tile producers and the
//! prerender scheduler.
//!
//! A producer calls [`RestartSignal::resume`] after inserting new dirty
//! tiles. The scheduler observes it in two places:
//!
//! - between dispatches, where a pending restart makes the current pass drop
//!   its priority snapshot and take a fresh one
//! - while idle, where the same call wakes the suspended loop
//!
//! Any number of `resume` calls made before the scheduler looks collapse into
//! a single restart and a single wake-up.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::Notify;

/// Idempotent restart flag plus wake-up for the scheduling loop.
#[derive(Debug, Default)]
pub struct RestartSignal {
    /// Set by producers, consumed once by the scheduler.
    restart_requested: AtomicBool,
    /// Wakes the scheduler when it is waiting for work.
    wake: Notify,
    /// Number of `resume` calls, for diagnostics.
    fired: AtomicU64,
}

impl RestartSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the scheduler to recompute its priority view.
    ///
    /// Interrupts a pass in progress and wakes an idle scheduler.
    pub fn resume(&self) {
        self.fired.fetch_add(1, Ordering::Relaxed);
        self.restart_requested.store(true, Ordering::Release);
        // notify_one stores at most one permit, so repeated calls before the
        // scheduler waits still produce a single wake-up.
        self.wake.notify_one();
    }

    /// Consume a pending restart request.
    ///
    /// Returns `true` at most once per batch of `resume` calls.
    pub fn take_restart(&self) -> bool {
        self.restart_requested.swap(false, Ordering::AcqRel)
    }

    /// Discard any restart request made before the pass that is starting now.
    ///
    /// Must be called before the pass takes its snapshot, so a request that
    /// lands after the snapshot is still observed.
    pub fn begin_pass(&self) {
        self.restart_requested.store(false, Ordering::Release);
    }

    /// Suspend until the next `resume`, or return at once if one is pending.
    pub async fn wait(&self) {
        self.wake.notified().await;
    }

    /// Total number of `resume` calls so far.
    pub fn fired_count(&self) -> u64 {
        self.fired.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_restart_is_consumed_once() {
        let signal = RestartSignal::new();
        assert!(!signal.take_restart());

        signal.resume();
        signal.resume();
        signal.resume();

        assert!(signal.take_restart());
        assert!(!signal.take_restart());
        assert_eq!(signal.fired_count(), 3);
    }

    #[test]
    fn test_begin_pass_clears_stale_request() {
        let signal = RestartSignal::new();
        signal.resume();
        signal.begin_pass();
        assert!(!signal.take_restart());
    }

    #[tokio::test]
    async fn test_resume_before_wait_is_not_lost() {
        let signal = RestartSignal::new();
        signal.resume();

        tokio::time::timeout(Duration::from_secs(1), signal.wait())
            .await
            .expect("pending resume should complete the wait immediately");
    }

    #[tokio::test]
    async fn test_pending_wakes_collapse_to_one() {
        let signal = RestartSignal::new();
        signal.resume();
        signal.resume();

        signal.wait().await;
        let second = tokio::time::timeout(Duration::from_millis(50), signal.wait()).await;
        assert!(second.is_err(), "two resumes must not leave two wake-ups");
    }

    #[tokio::test]
    async fn test_resume_wakes_waiting_task() {
        let signal = Arc::new(RestartSignal::new());
        let waiter = {
            let signal = Arc::clone(&signal);
            tokio::spawn(async move { signal.wait().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        signal.resume();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
    }
}
