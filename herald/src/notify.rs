//! The notification request handler: validation, message construction,
//! delivery, and outcome mapping.

use std::sync::Arc;
use std::time::Duration;

use herald_delivery::{
    DeliveryResult, FailoverController, FailureKind, Message, SenderIdentity, SmtpExecutor,
    TcpProber, TransportProfile,
};
use thiserror::Error;

use crate::config::{Config, ConfigError};

/// A validated status-change notification request.
///
/// The body arrives pre-rendered from the templating collaborator and
/// is transmitted as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusNotification {
    /// Recipient mailbox.
    pub recipient: String,
    /// Procurement request identifier.
    pub request_id: String,
    /// The status the request changed to.
    pub new_status: String,
    /// Pre-rendered HTML body.
    pub body_html: String,
}

impl StatusNotification {
    /// The subject line for this notification.
    #[must_use]
    pub fn subject(&self) -> String {
        format!("Procurement Request #{} Status Update", self.request_id)
    }

    /// Rejects empty fields and syntactically hopeless recipients.
    ///
    /// Only a basic shape check; full addr-spec validation stays with
    /// the caller that accepted the request.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), NotifyError> {
        for (field, value) in [
            ("recipient", &self.recipient),
            ("request_id", &self.request_id),
            ("new_status", &self.new_status),
            ("body_html", &self.body_html),
        ] {
            if value.trim().is_empty() {
                return Err(NotifyError::MissingField(field));
            }
        }

        let valid = self
            .recipient
            .split_once('@')
            .is_some_and(|(local, domain)| {
                !local.is_empty() && !domain.is_empty() && !domain.contains(char::is_whitespace)
            });
        if !valid {
            return Err(NotifyError::InvalidRecipient(self.recipient.clone()));
        }

        Ok(())
    }

    fn message(&self) -> Message {
        Message {
            subject: self.subject(),
            body_html: self.body_html.clone(),
            recipient: self.recipient.clone(),
        }
    }
}

/// Problems with the notification request itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("recipient address is not valid: {0}")]
    InvalidRecipient(String),
}

/// What happened to a notification, for the boundary surface to
/// translate (the core never formats user-facing prose).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// The message was accepted by `profile`.
    Delivered { profile: String, attempts: usize },
    /// The provider rejected this deployment's credentials; retrying
    /// is pointless until configuration changes.
    ConfigurationError { detail: String },
    /// No configured server was reachable at all.
    NetworkUnavailable,
    /// Every path was exhausted; the most informative failure follows.
    Failed { kind: FailureKind, detail: String },
}

impl From<DeliveryResult> for NotifyOutcome {
    fn from(result: DeliveryResult) -> Self {
        let attempts = result.attempts.len();
        if let Some(profile) = result.used_profile {
            return Self::Delivered {
                profile: profile.name,
                attempts,
            };
        }

        match result
            .last_meaningful_failure()
            .and_then(|outcome| outcome.failure.as_ref())
        {
            Some(failure) if failure.kind() == FailureKind::AuthRejected => {
                Self::ConfigurationError {
                    detail: failure.detail().to_string(),
                }
            }
            Some(failure) => Self::Failed {
                kind: failure.kind(),
                detail: failure.detail().to_string(),
            },
            None => Self::NetworkUnavailable,
        }
    }
}

/// The handler: owns the shared read-only delivery state and serves
/// independent notification requests concurrently.
pub struct Notifier {
    controller: FailoverController,
    profiles: Vec<TransportProfile>,
    sender: SenderIdentity,
}

impl Notifier {
    /// Wires the production prober and executor from validated
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] before any network I/O if the sender
    /// identity or profile catalog is unusable.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let sender = config.sender_identity()?;

        let executor = SmtpExecutor::new(config.delivery.timeouts.clone())
            .accept_invalid_certs(config.delivery.accept_invalid_certs);
        let controller = FailoverController::new(
            Arc::new(TcpProber),
            Arc::new(executor),
            config.delivery.retry.clone(),
            Duration::from_millis(config.delivery.probe_timeout_ms),
        );

        Ok(Self {
            controller,
            profiles: config.transports.clone(),
            sender,
        })
    }

    /// Validates the request, builds the message, and delivers it.
    ///
    /// # Errors
    ///
    /// Returns a [`NotifyError`] for an invalid request; delivery
    /// failures are reported through the outcome, never as errors.
    pub async fn send(&self, notification: &StatusNotification) -> Result<NotifyOutcome, NotifyError> {
        notification.validate()?;

        tracing::info!(
            recipient = %notification.recipient,
            request_id = %notification.request_id,
            new_status = %notification.new_status,
            "sending status notification"
        );

        let message = notification.message();
        let result = self
            .controller
            .deliver(&self.profiles, &self.sender, &message)
            .await;

        Ok(NotifyOutcome::from(result))
    }
}
