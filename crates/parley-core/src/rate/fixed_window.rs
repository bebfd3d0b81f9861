//! Fixed-window request counter keyed by client identity.
//!
//! Time is cut into consecutive windows of equal length starting at the
//! gate's epoch. Each client may make `quota` requests per window; the
//! count resets when the clock crosses into the next window, not on a
//! sliding basis. State is process-local and lost on restart.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

use super::{RateDecision, RateGate};

/// Checks between sweeps of windows that have already ended.
const PRUNE_EVERY: u64 = 1024;

#[derive(Debug, Clone, Copy)]
struct WindowCount {
    index: u64,
    count: u32,
}

/// In-memory fixed-window rate gate.
///
/// `DashMap` shard locks make the increment-and-compare for one client
/// atomic; different clients rarely contend.
#[derive(Debug)]
pub struct FixedWindowRateGate {
    quota: u32,
    window: Duration,
    epoch: Instant,
    windows: DashMap<String, WindowCount>,
    checks: AtomicU64,
}

impl FixedWindowRateGate {
    /// Create a gate admitting `quota` requests per `window` per client.
    pub fn new(quota: u32, window: Duration) -> Self {
        Self::starting_at(quota, window, Instant::now())
    }

    /// Create a gate whose first window begins at `epoch`.
    pub fn starting_at(quota: u32, window: Duration, epoch: Instant) -> Self {
        Self {
            quota,
            window: window.max(Duration::from_millis(1)),
            epoch,
            windows: DashMap::new(),
            checks: AtomicU64::new(0),
        }
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    /// Same as [`RateGate::check`] with an explicit clock reading.
    pub fn check_at(&self, client: &str, now: Instant) -> RateDecision {
        let index = self.window_index(now);

        let decision = {
            let mut entry = self
                .windows
                .entry(client.to_string())
                .or_insert(WindowCount { index, count: 0 });

            if entry.index != index {
                entry.index = index;
                entry.count = 0;
            }

            if entry.count < self.quota {
                entry.count += 1;
                RateDecision::Admitted {
                    remaining: self.quota - entry.count,
                }
            } else {
                RateDecision::Limited {
                    retry_after: self.window_end(index).saturating_duration_since(now),
                }
            }
        };

        if self.checks.fetch_add(1, Ordering::Relaxed) % PRUNE_EVERY == PRUNE_EVERY - 1 {
            self.prune(index);
        }

        decision
    }

    fn window_index(&self, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.epoch);
        (elapsed.as_nanos() / self.window.as_nanos()) as u64
    }

    fn window_end(&self, index: u64) -> Instant {
        let nanos = self.window.as_nanos() * u128::from(index + 1);
        self.epoch + Duration::from_nanos(nanos.min(u128::from(u64::MAX)) as u64)
    }

    /// Drop counters for windows that have already ended.
    fn prune(&self, current: u64) {
        let before = self.windows.len();
        self.windows.retain(|_, w| w.index >= current);
        let removed = before.saturating_sub(self.windows.len());
        if removed > 0 {
            debug!(removed, "Pruned expired rate windows");
        }
    }
}

impl RateGate for FixedWindowRateGate {
    fn check(&self, client: &str) -> RateDecision {
        self.check_at(client, Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn gate(epoch: Instant) -> FixedWindowRateGate {
        FixedWindowRateGate::starting_at(5, Duration::from_secs(60), epoch)
    }

    #[test]
    fn test_admits_up_to_quota_then_limits() {
        let t0 = Instant::now();
        let gate = gate(t0);
        let now = t0 + Duration::from_secs(1);

        for expected_remaining in (0..5).rev() {
            assert_eq!(
                gate.check_at("10.0.0.1", now),
                RateDecision::Admitted {
                    remaining: expected_remaining
                }
            );
        }

        match gate.check_at("10.0.0.1", now) {
            RateDecision::Limited { retry_after } => {
                assert_eq!(retry_after, Duration::from_secs(59));
            }
            other => panic!("expected Limited, got {other:?}"),
        }
    }

    #[test]
    fn test_readmits_after_window_elapses() {
        let t0 = Instant::now();
        let gate = gate(t0);

        for _ in 0..5 {
            assert!(gate.check_at("a", t0 + Duration::from_secs(10)).is_admitted());
        }
        assert!(!gate.check_at("a", t0 + Duration::from_secs(59)).is_admitted());

        // Next fixed window starts at t0 + 60s.
        assert!(gate.check_at("a", t0 + Duration::from_secs(60)).is_admitted());
    }

    #[test]
    fn test_window_is_fixed_not_sliding() {
        let t0 = Instant::now();
        let gate = gate(t0);

        // Burst at the end of window 0 ...
        for _ in 0..5 {
            assert!(gate.check_at("a", t0 + Duration::from_secs(58)).is_admitted());
        }
        // ... does not carry over into window 1, two seconds later.
        for _ in 0..5 {
            assert!(gate.check_at("a", t0 + Duration::from_secs(61)).is_admitted());
        }
        assert!(!gate.check_at("a", t0 + Duration::from_secs(62)).is_admitted());
    }

    #[test]
    fn test_clients_are_counted_independently() {
        let t0 = Instant::now();
        let gate = gate(t0);

        for _ in 0..5 {
            gate.check_at("a", t0);
        }
        assert!(!gate.check_at("a", t0).is_admitted());
        assert!(gate.check_at("b", t0).is_admitted());
        assert_eq!(gate.tracked_clients(), 2);
    }

    #[test]
    fn test_prune_drops_expired_windows() {
        let t0 = Instant::now();
        let gate = gate(t0);
        gate.check_at("old", t0);
        gate.check_at("fresh", t0 + Duration::from_secs(120));

        gate.prune(gate.window_index(t0 + Duration::from_secs(120)));
        assert_eq!(gate.tracked_clients(), 1);
    }

    #[test]
    fn test_concurrent_checks_never_exceed_quota() {
        let gate = Arc::new(FixedWindowRateGate::new(5, Duration::from_secs(3600)));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let gate = Arc::clone(&gate);
                std::thread::spawn(move || gate.check("shared").is_admitted())
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(admitted, 5);
    }
}
