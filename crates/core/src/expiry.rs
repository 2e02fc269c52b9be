//! Delayed removal of finished job records.
//!
//! Each armed timer is a spawned task that sleeps for the configured delay and
//! then reports an [`ExpiredJob`] on a channel. The owner of the job table
//! applies the removal on its own timeline after checking, via
//! [`ExpiryManager::acknowledge`], that the timer is still the current one for
//! that key. A timer that was cancelled or replaced in the meantime is ignored.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::debug;

use crate::job::JobKey;

/// Notification that an expiry timer elapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiredJob {
    pub key: JobKey,
    generation: u64,
}

/// What [`ExpiryManager::schedule`] decided for a delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryDecision {
    /// Negative (or non-representable) delay: the record is kept until cleared.
    Never,
    /// Zero delay: the caller must remove the record right away.
    Immediate,
    /// A timer was armed.
    Armed,
}

#[derive(Debug)]
struct ArmedTimer {
    generation: u64,
    handle: AbortHandle,
}

/// Cancelable per-key expiry timers. At most one timer exists per key.
#[derive(Debug)]
pub struct ExpiryManager {
    timers: HashMap<JobKey, ArmedTimer>,
    next_generation: u64,
    fired_tx: mpsc::UnboundedSender<ExpiredJob>,
}

impl ExpiryManager {
    pub fn new(fired_tx: mpsc::UnboundedSender<ExpiredJob>) -> Self {
        Self {
            timers: HashMap::new(),
            next_generation: 0,
            fired_tx,
        }
    }

    /// Creates a manager together with the receiver of fired timers.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ExpiredJob>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Schedules removal of `key` after `delay_secs` seconds.
    ///
    /// Any timer already armed for the key is cancelled first. Arming a timer
    /// requires a running tokio runtime.
    pub fn schedule(&mut self, key: &str, delay_secs: f64) -> ExpiryDecision {
        self.cancel(key);

        if delay_secs == 0.0 {
            return ExpiryDecision::Immediate;
        }

        let delay = match Duration::try_from_secs_f64(delay_secs) {
            Ok(delay) => delay,
            Err(_) => return ExpiryDecision::Never,
        };

        self.next_generation += 1;
        let fired = ExpiredJob {
            key: key.to_string(),
            generation: self.next_generation,
        };
        let tx = self.fired_tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(fired);
        });

        debug!("Armed expiry for {} in {:.1}s", key, delay_secs);
        self.timers.insert(
            key.to_string(),
            ArmedTimer {
                generation: self.next_generation,
                handle: task.abort_handle(),
            },
        );
        ExpiryDecision::Armed
    }

    /// Cancels the timer for `key`, if any. Idempotent.
    pub fn cancel(&mut self, key: &str) -> bool {
        match self.timers.remove(key) {
            Some(timer) => {
                timer.handle.abort();
                debug!("Cancelled expiry for {}", key);
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, timer) in self.timers.drain() {
            timer.handle.abort();
        }
    }

    /// Consumes a fired notification.
    ///
    /// Returns true only if it belongs to the timer currently armed for its
    /// key; the caller should then remove the record.
    pub fn acknowledge(&mut self, fired: &ExpiredJob) -> bool {
        match self.timers.get(&fired.key) {
            Some(timer) if timer.generation == fired.generation => {
                self.timers.remove(&fired.key);
                true
            }
            _ => false,
        }
    }

    pub fn is_armed(&self, key: &str) -> bool {
        self.timers.contains_key(key)
    }

    pub fn armed_count(&self) -> usize {
        self.timers.len()
    }
}

impl Drop for ExpiryManager {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_negative_delay_never_arms() {
        let (mut expiry, mut rx) = ExpiryManager::channel();
        assert_eq!(expiry.schedule("a", -1.0), ExpiryDecision::Never);
        assert!(!expiry.is_armed("a"));

        tokio::time::advance(Duration::from_secs(3600)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_delay_is_immediate() {
        let (mut expiry, _rx) = ExpiryManager::channel();
        assert_eq!(expiry.schedule("a", 0.0), ExpiryDecision::Immediate);
        assert!(!expiry.is_armed("a"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_positive_delay_fires_once() {
        let (mut expiry, mut rx) = ExpiryManager::channel();
        assert_eq!(expiry.schedule("a", 5.0), ExpiryDecision::Armed);
        assert!(expiry.is_armed("a"));

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(rx.try_recv().is_err());

        let fired = rx.recv().await.unwrap();
        assert_eq!(fired.key, "a");
        assert!(expiry.acknowledge(&fired));
        assert!(!expiry.is_armed("a"));

        // A second acknowledgement of the same timer is stale
        assert!(!expiry.acknowledge(&fired));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_firing() {
        let (mut expiry, mut rx) = ExpiryManager::channel();
        expiry.schedule("a", 1.0);
        assert!(expiry.cancel("a"));
        assert!(!expiry.cancel("a"));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_replaces_previous_timer() {
        let (mut expiry, mut rx) = ExpiryManager::channel();
        expiry.schedule("a", 1.0);
        expiry.schedule("a", 10.0);
        assert_eq!(expiry.armed_count(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(rx.try_recv().is_err());

        let fired = rx.recv().await.unwrap();
        assert!(expiry.acknowledge(&fired));
    }

    #[tokio::test(start_paused = true)]
    async fn test_negative_reschedule_cancels_armed_timer() {
        let (mut expiry, mut rx) = ExpiryManager::channel();
        expiry.schedule("a", 1.0);
        assert_eq!(expiry.schedule("a", -1.0), ExpiryDecision::Never);
        assert!(!expiry.is_armed("a"));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_notification_is_rejected() {
        let (mut expiry, mut rx) = ExpiryManager::channel();
        expiry.schedule("a", 1.0);
        let fired = rx.recv().await.unwrap();

        // Re-armed before the notification was handled
        expiry.schedule("a", 30.0);
        assert!(!expiry.acknowledge(&fired));
        assert!(expiry.is_armed("a"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all() {
        let (mut expiry, mut rx) = ExpiryManager::channel();
        expiry.schedule("a", 1.0);
        expiry.schedule("b", 2.0);
        expiry.cancel_all();
        assert_eq!(expiry.armed_count(), 0);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_infinite_delay_never_arms() {
        let (mut expiry, _rx) = ExpiryManager::channel();
        assert_eq!(expiry.schedule("a", f64::INFINITY), ExpiryDecision::Never);
        assert_eq!(expiry.schedule("a", f64::NAN), ExpiryDecision::Never);
    }
}
