//! Failover orchestration across the transport profile catalog.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{DeliveryError, FailureKind};
use crate::executor::AttemptExecutor;
use crate::outcome::{AttemptOutcome, DeliveryResult};
use crate::probe::Prober;
use crate::profile::TransportProfile;
use crate::retry::RetryPolicy;
use crate::types::{Message, SenderIdentity};

/// Consecutive `Unknown` outcomes tolerated on one profile before
/// failing over, regardless of the remaining retry budget.
const UNKNOWN_ATTEMPT_CAP: u32 = 2;

/// Sequences probes, attempts, retries, and profile switches for one
/// message.
///
/// Decision policy per profile, in catalog order:
///
/// - probe first: an unreachable profile is recorded once and skipped
///   without consuming any retry budget;
/// - a reachable profile gets up to the policy's attempt budget, with
///   linear backoff between attempts;
/// - `AuthRejected` and `RecipientRejected` abort the entire delivery,
///   since no transport switch repairs them;
/// - the first accepted submission ends the run — a message is sent at
///   most once.
///
/// The prober and executor are injected so the policy is testable
/// without network I/O.
pub struct FailoverController {
    prober: Arc<dyn Prober>,
    executor: Arc<dyn AttemptExecutor>,
    policy: RetryPolicy,
    probe_timeout: Duration,
}

impl FailoverController {
    #[must_use]
    pub fn new(
        prober: Arc<dyn Prober>,
        executor: Arc<dyn AttemptExecutor>,
        policy: RetryPolicy,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            prober,
            executor,
            policy,
            probe_timeout,
        }
    }

    /// Delivers `message` using the first profile that accepts it.
    ///
    /// The returned result carries every executed attempt in order;
    /// expected failures never surface as errors, only as outcomes.
    pub async fn deliver(
        &self,
        profiles: &[TransportProfile],
        sender: &SenderIdentity,
        message: &Message,
    ) -> DeliveryResult {
        let started = Instant::now();
        let mut attempts = Vec::new();

        if profiles.is_empty() {
            tracing::warn!("delivery requested with an empty transport profile catalog");
        }

        for profile in profiles {
            let probe_started = Instant::now();
            let reachable = self
                .prober
                .probe(&profile.host, profile.port, self.probe_timeout)
                .await;

            if !reachable {
                tracing::info!(profile = %profile, "profile unreachable, skipping");
                attempts.push(AttemptOutcome::failed(
                    profile.clone(),
                    DeliveryError::Unreachable(format!(
                        "{} not reachable within {:?}",
                        profile.address(),
                        self.probe_timeout
                    )),
                    probe_started.elapsed(),
                ));
                continue;
            }

            let mut consecutive_unknown = 0;

            for attempt in 1..=self.policy.max_attempts_per_profile {
                let outcome = self.executor.attempt(profile, sender, message).await;
                let failure = outcome.failure.clone();
                attempts.push(outcome);

                let Some(error) = failure else {
                    tracing::info!(
                        profile = %profile,
                        attempt,
                        total_attempts = attempts.len(),
                        "delivery succeeded"
                    );
                    return DeliveryResult {
                        used_profile: Some(profile.clone()),
                        attempts,
                        elapsed: started.elapsed(),
                    };
                };

                if error.is_fatal() {
                    tracing::error!(
                        profile = %profile,
                        kind = %error.kind(),
                        %error,
                        "fatal failure, aborting delivery"
                    );
                    return DeliveryResult {
                        used_profile: None,
                        attempts,
                        elapsed: started.elapsed(),
                    };
                }

                if error.kind() == FailureKind::Unknown {
                    consecutive_unknown += 1;
                    if consecutive_unknown >= UNKNOWN_ATTEMPT_CAP {
                        tracing::warn!(
                            profile = %profile,
                            "repeated uncategorized failures, failing over"
                        );
                        break;
                    }
                } else {
                    consecutive_unknown = 0;
                }

                if self.policy.should_retry(attempt) {
                    let delay = self.policy.backoff_delay(attempt);
                    tracing::debug!(
                        profile = %profile,
                        attempt,
                        kind = %error.kind(),
                        ?delay,
                        "transient failure, retrying after backoff"
                    );
                    tokio::time::sleep(delay).await;
                } else {
                    tracing::info!(
                        profile = %profile,
                        kind = %error.kind(),
                        "retry budget exhausted, failing over"
                    );
                }
            }
        }

        DeliveryResult {
            used_profile: None,
            attempts,
            elapsed: started.elapsed(),
        }
    }
}
