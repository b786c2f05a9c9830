//! Attempt records and the terminal delivery result.

use std::time::Duration;

use crate::error::{DeliveryError, FailureKind};
use crate::profile::TransportProfile;

/// The record of one executed delivery attempt.
///
/// Created once per attempt, appended to the result's log in execution
/// order, and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptOutcome {
    /// The profile the attempt ran against.
    pub profile: TransportProfile,
    /// `None` means the message was accepted.
    pub failure: Option<DeliveryError>,
    /// Wall-clock time from connect start to connection release.
    pub elapsed: Duration,
}

impl AttemptOutcome {
    /// Records an accepted submission.
    #[must_use]
    pub const fn delivered(profile: TransportProfile, elapsed: Duration) -> Self {
        Self {
            profile,
            failure: None,
            elapsed,
        }
    }

    /// Records a classified failure.
    #[must_use]
    pub const fn failed(
        profile: TransportProfile,
        error: DeliveryError,
        elapsed: Duration,
    ) -> Self {
        Self {
            profile,
            failure: Some(error),
            elapsed,
        }
    }

    /// `true` if the message was accepted on this attempt.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    /// The failure kind, if the attempt failed.
    #[must_use]
    pub fn kind(&self) -> Option<FailureKind> {
        self.failure.as_ref().map(DeliveryError::kind)
    }
}

/// The terminal value of one `deliver` call, fully owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryResult {
    /// The profile that accepted the message, if any.
    pub used_profile: Option<TransportProfile>,
    /// Every attempt in true execution order.
    pub attempts: Vec<AttemptOutcome>,
    /// Total time across probes, attempts, and backoff waits.
    pub elapsed: Duration,
}

impl DeliveryResult {
    /// `true` if some profile accepted the message.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.used_profile.is_some()
    }

    /// The most informative failure: the last outcome that got past the
    /// network layer. `None` when nothing did.
    #[must_use]
    pub fn last_meaningful_failure(&self) -> Option<&AttemptOutcome> {
        self.attempts
            .iter()
            .rev()
            .find(|outcome| !matches!(outcome.kind(), Some(FailureKind::Unreachable) | None))
    }

    /// `true` when delivery failed without ever reaching a server.
    #[must_use]
    pub fn network_unavailable(&self) -> bool {
        !self.succeeded()
            && !self.attempts.is_empty()
            && self
                .attempts
                .iter()
                .all(|outcome| matches!(outcome.kind(), Some(FailureKind::Unreachable)))
    }
}
