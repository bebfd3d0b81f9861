//! Per-client admission control.

pub mod fixed_window;

pub use fixed_window::FixedWindowRateGate;

use std::time::Duration;

/// Outcome of a rate gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// Request admitted; `remaining` further requests fit in this window.
    Admitted { remaining: u32 },
    /// Quota exhausted until the current window ends.
    Limited { retry_after: Duration },
}

impl RateDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, RateDecision::Admitted { .. })
    }
}

/// Admission control capability, injected into the HTTP layer.
///
/// Implementations carry their own internal synchronization: `check`
/// must count and compare atomically for a given client.
pub trait RateGate: Send + Sync {
    /// Count one request for `client` and decide whether to admit it.
    fn check(&self, client: &str) -> RateDecision;
}
