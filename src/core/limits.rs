//! Run limits: external cancellation and wall-clock deadline
//!
//! Both the orchestration loop and the dispatcher's whole-batch backoff wait
//! through [`RunLimits::sleep_until`], so a cancelled or expired run stops at
//! the next wait instead of finishing its backoff schedule.

use tokio::sync::watch;
use tokio::time::Instant;

/// Why a run stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interruption {
    /// The shutdown signal fired
    Cancelled,
    /// The run deadline elapsed
    DeadlineExceeded,
}

enum Wake {
    Timer,
    Signal,
    SenderGone,
}

/// Cancellation signal plus optional deadline for one run
#[derive(Debug, Default)]
pub struct RunLimits {
    shutdown: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

impl RunLimits {
    pub fn new(shutdown: Option<watch::Receiver<bool>>, deadline: Option<Instant>) -> Self {
        Self { shutdown, deadline }
    }

    /// No signal and no deadline
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Current interruption, cancellation taking precedence
    pub fn check(&self) -> Option<Interruption> {
        let cancelled = self
            .shutdown
            .as_ref()
            .map(|rx| *rx.borrow())
            .unwrap_or(false);
        if cancelled {
            return Some(Interruption::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Interruption::DeadlineExceeded),
            _ => None,
        }
    }

    /// Sleeps until `wake_at` unless the run is interrupted first
    ///
    /// Wakes no later than the deadline. A `false` value sent on the signal
    /// does not end the sleep early. Once the sender is dropped the signal is
    /// ignored for the rest of the run.
    pub async fn sleep_until(&mut self, wake_at: Instant) -> Option<Interruption> {
        let until = self.deadline.map_or(wake_at, |d| d.min(wake_at));

        loop {
            if let Some(interruption) = self.check() {
                return Some(interruption);
            }

            let Some(rx) = self.shutdown.as_mut() else {
                tokio::time::sleep_until(until).await;
                break;
            };

            let wake = tokio::select! {
                _ = tokio::time::sleep_until(until) => Wake::Timer,
                changed = rx.changed() => {
                    if changed.is_ok() { Wake::Signal } else { Wake::SenderGone }
                }
            };

            match wake {
                Wake::Timer => break,
                Wake::Signal => continue,
                Wake::SenderGone => self.shutdown = None,
            }
        }

        self.check()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_unbounded_never_interrupts() {
        assert_eq!(RunLimits::unbounded().check(), None);
    }

    #[test]
    fn test_cancellation_wins_over_deadline() {
        let (_tx, rx) = watch::channel(true);
        let limits = RunLimits::new(Some(rx), Some(Instant::now()));
        assert_eq!(limits.check(), Some(Interruption::Cancelled));
    }

    #[tokio::test]
    async fn test_sleep_returns_on_signal() {
        let (tx, rx) = watch::channel(false);
        let mut limits = RunLimits::new(Some(rx), None);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let _ = tx.send(true);
        });

        let far = Instant::now() + Duration::from_secs(30);
        let outcome = tokio::time::timeout(Duration::from_secs(5), limits.sleep_until(far))
            .await
            .unwrap();
        assert_eq!(outcome, Some(Interruption::Cancelled));
    }

    #[tokio::test]
    async fn test_false_signal_keeps_sleeping() {
        let (tx, rx) = watch::channel(false);
        let mut limits = RunLimits::new(Some(rx), None);
        let _ = tx.send(false);

        let start = Instant::now();
        let outcome = limits.sleep_until(start + Duration::from_millis(30)).await;
        assert_eq!(outcome, None);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_sleep_stops_at_deadline() {
        let deadline = Instant::now() + Duration::from_millis(10);
        let mut limits = RunLimits::new(None, Some(deadline));

        let far = Instant::now() + Duration::from_secs(30);
        let outcome = tokio::time::timeout(Duration::from_secs(5), limits.sleep_until(far))
            .await
            .unwrap();
        assert_eq!(outcome, Some(Interruption::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_dropped_sender_is_ignored() {
        let (tx, rx) = watch::channel(false);
        drop(tx);
        let mut limits = RunLimits::new(Some(rx), None);

        let outcome = limits
            .sleep_until(Instant::now() + Duration::from_millis(5))
            .await;
        assert_eq!(outcome, None);
        assert!(limits.shutdown.is_none());
    }
}
