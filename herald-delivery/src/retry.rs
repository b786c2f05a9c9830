//! Retry policy for delivery attempts on a single profile.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Per-profile retry configuration.
///
/// The backoff between attempts on one profile grows linearly with the
/// attempt index, so the recorded delays are strictly increasing and
/// fully deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Attempts allowed against one reachable profile before failing
    /// over to the next.
    ///
    /// Default: 3
    #[serde(default = "defaults::max_attempts_per_profile")]
    pub max_attempts_per_profile: u32,

    /// Base delay between attempts; attempt `n` waits `n * base`.
    ///
    /// Default: 500 ms
    #[serde(default = "defaults::base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts_per_profile: defaults::max_attempts_per_profile(),
            base_delay_ms: defaults::base_delay_ms(),
        }
    }
}

impl RetryPolicy {
    /// `true` if another attempt fits in this profile's budget.
    /// `completed` is the number of attempts already executed.
    #[must_use]
    pub const fn should_retry(&self, completed: u32) -> bool {
        completed < self.max_attempts_per_profile
    }

    /// The wait before the attempt following attempt number `completed`
    /// (1-based).
    #[must_use]
    pub const fn backoff_delay(&self, completed: u32) -> Duration {
        Duration::from_millis(self.base_delay_ms * completed as u64)
    }
}

mod defaults {
    pub const fn max_attempts_per_profile() -> u32 {
        3
    }

    pub const fn base_delay_ms() -> u64 {
        500
    }
}
