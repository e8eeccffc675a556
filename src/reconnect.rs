use std::time::Duration;

use serde::{Deserialize, Serialize};


pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    // Same delay before every attempt.
    #[default]
    Fixed,
    // Delay multiplied by the attempt number: delay, 2*delay, 3*delay, ...
    Linear,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    #[serde(with = "humantime_serde")]
    pub delay: Duration,
    // Consecutive attempts without a successful open. `None` means try forever.
    pub max_attempts: Option<u32>,
    pub backoff: Backoff,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy {
            delay: DEFAULT_RECONNECT_DELAY,
            max_attempts: None,
            backoff: Backoff::Fixed,
        }
    }
}

impl ReconnectPolicy {
    // Delay before the given attempt (1-based), or `None` if the policy gives up.
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 {
            return Some(Duration::ZERO);
        }
        if let Some(max_attempts) = self.max_attempts {
            if attempt > max_attempts {
                return None;
            }
        }
        Some(match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Linear => self.delay.saturating_mul(attempt),
        })
    }
}

#[must_use]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ReconnectDecision {
    // Schedule exactly one reconnect after the delay.
    After { attempt: u32, delay: Duration },
    // A reconnect is already scheduled. Nothing to do.
    AlreadyPending,
    GiveUp { attempts: u32 },
}

// Counts consecutive failed connections and makes sure at most one reconnect is pending.
#[derive(Clone, Debug)]
pub struct ReconnectTracker {
    policy: ReconnectPolicy,
    attempts: u32,
    pending: bool,
}

impl ReconnectTracker {
    pub fn new(policy: ReconnectPolicy) -> Self {
        ReconnectTracker { policy, attempts: 0, pending: false }
    }

    pub fn policy(&self) -> &ReconnectPolicy { &self.policy }
    pub fn attempts(&self) -> u32 { self.attempts }
    pub fn is_pending(&self) -> bool { self.pending }

    pub fn on_unclean_close(&mut self) -> ReconnectDecision {
        if self.pending {
            return ReconnectDecision::AlreadyPending;
        }
        let attempt = self.attempts + 1;
        match self.policy.delay_for_attempt(attempt) {
            Some(delay) => {
                self.attempts = attempt;
                self.pending = true;
                ReconnectDecision::After { attempt, delay }
            }
            None => ReconnectDecision::GiveUp { attempts: self.attempts },
        }
    }

    // The timer fired. Returns false if nothing was pending.
    pub fn take_pending(&mut self) -> bool { std::mem::replace(&mut self.pending, false) }

    pub fn on_open(&mut self) { self.attempts = 0; }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_fixed_five_seconds_forever() {
        let policy = ReconnectPolicy::default();
        for attempt in [1, 2, 10, 1000] {
            assert_eq!(policy.delay_for_attempt(attempt), Some(Duration::from_secs(5)));
        }
    }

    #[test]
    fn linear_backoff_and_limit() {
        let policy = ReconnectPolicy {
            delay: Duration::from_millis(500),
            max_attempts: Some(3),
            backoff: Backoff::Linear,
        };
        assert_eq!(policy.delay_for_attempt(1), Some(Duration::from_millis(500)));
        assert_eq!(policy.delay_for_attempt(2), Some(Duration::from_millis(1000)));
        assert_eq!(policy.delay_for_attempt(3), Some(Duration::from_millis(1500)));
        assert_eq!(policy.delay_for_attempt(4), None);
    }

    #[test]
    fn one_pending_reconnect_at_a_time() {
        let mut tracker = ReconnectTracker::new(ReconnectPolicy::default());
        assert_eq!(tracker.on_unclean_close(), ReconnectDecision::After {
            attempt: 1,
            delay: DEFAULT_RECONNECT_DELAY
        });
        assert_eq!(tracker.on_unclean_close(), ReconnectDecision::AlreadyPending);
        assert!(tracker.take_pending());
        assert!(!tracker.take_pending());
        assert_eq!(tracker.on_unclean_close(), ReconnectDecision::After {
            attempt: 2,
            delay: DEFAULT_RECONNECT_DELAY
        });
    }

    #[test]
    fn open_resets_attempts() {
        let policy = ReconnectPolicy { max_attempts: Some(1), ..ReconnectPolicy::default() };
        let mut tracker = ReconnectTracker::new(policy);
        assert!(matches!(tracker.on_unclean_close(), ReconnectDecision::After { attempt: 1, .. }));
        assert!(tracker.take_pending());
        assert_eq!(tracker.on_unclean_close(), ReconnectDecision::GiveUp { attempts: 1 });
        tracker.on_open();
        assert!(matches!(tracker.on_unclean_close(), ReconnectDecision::After { attempt: 1, .. }));
    }

    #[test]
    fn policy_from_yaml_like_json() {
        let policy: ReconnectPolicy =
            serde_json::from_str(r#"{"delay": "2s", "backoff": "linear"}"#).unwrap();
        assert_eq!(policy, ReconnectPolicy {
            delay: Duration::from_secs(2),
            max_attempts: None,
            backoff: Backoff::Linear,
        });
    }
}
