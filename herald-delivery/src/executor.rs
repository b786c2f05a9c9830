//! Single-attempt SMTP transaction execution.
//!
//! One attempt is the complete connect → secure → authenticate →
//! submit → quit cycle against a single transport profile. Every step
//! runs under its own deadline, every failure is classified into the
//! closed taxonomy, and the connection is released on every exit path.

use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use herald_smtp::{ClientError, MessageBuilder, SmtpClient};

use crate::error::DeliveryError;
use crate::outcome::AttemptOutcome;
use crate::profile::{Security, TransportProfile};
use crate::types::{Message, SenderIdentity, SmtpTimeouts};

/// Executes one end-to-end delivery attempt.
///
/// A trait so the failover controller's retry and abort decisions are
/// testable without performing real network I/O.
#[async_trait]
pub trait AttemptExecutor: Send + Sync {
    /// Runs one full transaction and reports what happened.
    ///
    /// Never returns an error: every failure mode is folded into the
    /// outcome's classification.
    async fn attempt(
        &self,
        profile: &TransportProfile,
        sender: &SenderIdentity,
        message: &Message,
    ) -> AttemptOutcome;
}

/// The production executor, speaking SMTP over the profile's channel.
#[derive(Debug, Clone)]
pub struct SmtpExecutor {
    timeouts: SmtpTimeouts,
    accept_invalid_certs: bool,
}

impl SmtpExecutor {
    #[must_use]
    pub const fn new(timeouts: SmtpTimeouts) -> Self {
        Self {
            timeouts,
            accept_invalid_certs: false,
        }
    }

    /// Accept invalid TLS certificates. Test servers only.
    #[must_use]
    pub const fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Establishes the profile's channel: immediate TLS for
    /// [`Security::Tls`], plain TCP (upgraded later) for
    /// [`Security::StartTls`].
    async fn connect(&self, profile: &TransportProfile) -> Result<SmtpClient, DeliveryError> {
        let window = Duration::from_secs(self.timeouts.connect_secs);

        let connected = match profile.security {
            Security::Tls => {
                tokio::time::timeout(
                    window,
                    SmtpClient::connect_tls(&profile.host, profile.port, self.accept_invalid_certs),
                )
                .await
            }
            Security::StartTls => {
                tokio::time::timeout(window, SmtpClient::connect(&profile.host, profile.port))
                    .await
                    .map(|result| {
                        result.map(|client| client.accept_invalid_certs(self.accept_invalid_certs))
                    })
            }
        };

        match connected {
            Err(_) => Err(DeliveryError::Timeout(format!(
                "connect to {} timed out after {window:?}",
                profile.address()
            ))),
            Ok(Err(ClientError::Io(error))) => Err(DeliveryError::Unreachable(format!(
                "connect to {} failed: {error}",
                profile.address()
            ))),
            Ok(Err(error)) => Err(error.into()),
            Ok(Ok(client)) => Ok(client),
        }
    }

    /// The transaction proper; any `Err` is the classified reason this
    /// attempt failed.
    async fn transmit(
        &self,
        profile: &TransportProfile,
        sender: &SenderIdentity,
        message: &Message,
    ) -> Result<(), DeliveryError> {
        let mut client = self.connect(profile).await?;

        let greeting = step(
            self.timeouts.connect_secs,
            "greeting",
            client.read_greeting(),
        )
        .await?;
        if greeting.code != 220 {
            return Err(DeliveryError::Protocol(format!(
                "unexpected greeting: {} {}",
                greeting.code,
                greeting.message()
            )));
        }

        let helo_domain = sender.domain().to_string();
        let ehlo = step(self.timeouts.ehlo_secs, "EHLO", client.ehlo(&helo_domain)).await?;
        if !ehlo.is_success() {
            return Err(DeliveryError::Protocol(format!(
                "server rejected EHLO: {}",
                ehlo.message()
            )));
        }

        if profile.security == Security::StartTls {
            self.upgrade_channel(&mut client, &helo_domain).await?;
        }

        let auth = step(
            self.timeouts.auth_secs,
            "AUTH",
            client.auth_login(&sender.address, &sender.secret),
        )
        .await?;
        if !auth.is_success() {
            let detail = format!("{} {}", auth.code, auth.message());
            return Err(if auth.is_permanent_error() {
                DeliveryError::AuthRejected(detail)
            } else {
                DeliveryError::Protocol(format!("unexpected AUTH reply: {detail}"))
            });
        }

        let mail = step(
            self.timeouts.mail_from_secs,
            "MAIL FROM",
            client.mail_from(&sender.address),
        )
        .await?;
        if !mail.is_success() {
            return Err(DeliveryError::Protocol(format!(
                "server rejected MAIL FROM: {} {}",
                mail.code,
                mail.message()
            )));
        }

        let rcpt = step(
            self.timeouts.rcpt_to_secs,
            "RCPT TO",
            client.rcpt_to(&message.recipient),
        )
        .await?;
        if !rcpt.is_success() {
            let detail = format!(
                "server rejected recipient {}: {} {}",
                message.recipient,
                rcpt.code,
                rcpt.message()
            );
            return Err(if rcpt.is_permanent_error() {
                DeliveryError::RecipientRejected(detail)
            } else {
                DeliveryError::Protocol(detail)
            });
        }

        let data = step(self.timeouts.data_secs, "DATA", client.data()).await?;
        if !data.is_intermediate() {
            return Err(DeliveryError::Protocol(format!(
                "server rejected DATA: {} {}",
                data.code,
                data.message()
            )));
        }

        let payload = MessageBuilder::new()
            .from(sender.address.as_str())
            .to(message.recipient.as_str())
            .subject(message.subject.as_str())
            .body_html(message.body_html.as_str())
            .build();

        let accepted = step(
            self.timeouts.data_secs,
            "message payload",
            client.send_payload(&payload),
        )
        .await?;
        if !accepted.is_success() {
            return Err(DeliveryError::Protocol(format!(
                "server rejected message: {} {}",
                accepted.code,
                accepted.message()
            )));
        }

        // The message is accepted; a QUIT hiccup must not fail the
        // attempt, or a retry would send it twice.
        let quit_window = Duration::from_secs(self.timeouts.quit_secs);
        match tokio::time::timeout(quit_window, client.quit()).await {
            Ok(Ok(_)) => {}
            Ok(Err(error)) => {
                tracing::warn!(profile = %profile, %error, "QUIT failed after accepted delivery");
            }
            Err(_) => {
                tracing::warn!(profile = %profile, timeout = ?quit_window, "QUIT timed out after accepted delivery");
            }
        }

        Ok(())
    }

    /// STARTTLS upgrade plus the post-upgrade EHLO (RFC 3207).
    async fn upgrade_channel(
        &self,
        client: &mut SmtpClient,
        helo_domain: &str,
    ) -> Result<(), DeliveryError> {
        let window = Duration::from_secs(self.timeouts.starttls_secs);
        let upgraded = match tokio::time::timeout(window, client.starttls()).await {
            Err(_) => {
                return Err(DeliveryError::Timeout(format!(
                    "STARTTLS timed out after {window:?}"
                )));
            }
            Ok(Err(error)) => {
                return Err(DeliveryError::HandshakeFailed(format!(
                    "STARTTLS failed: {error}"
                )));
            }
            Ok(Ok(response)) => response,
        };
        if !upgraded.is_success() {
            return Err(DeliveryError::HandshakeFailed(format!(
                "server rejected STARTTLS: {} {}",
                upgraded.code,
                upgraded.message()
            )));
        }

        let ehlo = step(
            self.timeouts.ehlo_secs,
            "EHLO after STARTTLS",
            client.ehlo(helo_domain),
        )
        .await?;
        if !ehlo.is_success() {
            return Err(DeliveryError::Protocol(format!(
                "server rejected EHLO after STARTTLS: {}",
                ehlo.message()
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl AttemptExecutor for SmtpExecutor {
    async fn attempt(
        &self,
        profile: &TransportProfile,
        sender: &SenderIdentity,
        message: &Message,
    ) -> AttemptOutcome {
        let started = Instant::now();
        tracing::debug!(profile = %profile, recipient = %message.recipient, "starting delivery attempt");

        // The client is owned by `transmit`; dropping it on any exit
        // path closes the socket, so nothing leaks on failure.
        match self.transmit(profile, sender, message).await {
            Ok(()) => {
                let elapsed = started.elapsed();
                tracing::info!(profile = %profile, ?elapsed, "message accepted");
                AttemptOutcome::delivered(profile.clone(), elapsed)
            }
            Err(error) => {
                let elapsed = started.elapsed();
                tracing::debug!(profile = %profile, kind = %error.kind(), %error, "attempt failed");
                AttemptOutcome::failed(profile.clone(), error, elapsed)
            }
        }
    }
}

/// Runs one protocol step under its deadline, classifying a timeout as
/// [`DeliveryError::Timeout`] and any client error via its fallback
/// conversion.
async fn step<T, F>(secs: u64, what: &str, operation: F) -> Result<T, DeliveryError>
where
    F: Future<Output = herald_smtp::Result<T>>,
{
    let window = Duration::from_secs(secs);
    match tokio::time::timeout(window, operation).await {
        Err(_) => Err(DeliveryError::Timeout(format!(
            "{what} timed out after {window:?}"
        ))),
        Ok(Err(error)) => Err(error.into()),
        Ok(Ok(value)) => Ok(value),
    }
}
