//! The closed failure taxonomy for delivery attempts.
//!
//! Every way an attempt can fail collapses into one [`DeliveryError`]
//! variant, so the failover controller and the boundary component can
//! match exhaustively instead of chasing an open-ended error hierarchy.
//! The variants split into three policy classes:
//!
//! - `AuthRejected` and `RecipientRejected` are fatal for the entire
//!   delivery: no transport change fixes bad credentials or a bad
//!   destination address.
//! - `Unreachable` from a probe skips the profile without spending a
//!   retry slot.
//! - Everything else is transient for the current profile: retry with
//!   backoff, then fail over.

use herald_smtp::ClientError;
use thiserror::Error;

/// Discriminant-only view of [`DeliveryError`], for policy decisions
/// and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Unreachable,
    HandshakeFailed,
    AuthRejected,
    RecipientRejected,
    Protocol,
    Timeout,
    Unknown,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            Self::Unreachable => "unreachable",
            Self::HandshakeFailed => "handshake-failed",
            Self::AuthRejected => "auth-rejected",
            Self::RecipientRejected => "recipient-rejected",
            Self::Protocol => "protocol-error",
            Self::Timeout => "timeout",
            Self::Unknown => "unknown",
        };
        f.write_str(tag)
    }
}

/// A classified delivery failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The transport-layer connection could not be established.
    #[error("server unreachable: {0}")]
    Unreachable(String),

    /// Secure-channel negotiation failed.
    #[error("TLS negotiation failed: {0}")]
    HandshakeFailed(String),

    /// The server rejected the sender's credentials.
    #[error("credentials rejected: {0}")]
    AuthRejected(String),

    /// The server rejected the destination address.
    #[error("recipient rejected: {0}")]
    RecipientRejected(String),

    /// The server answered with unexpected or invalid protocol data.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A step exceeded its allotted time.
    #[error("timed out: {0}")]
    Timeout(String),

    /// Anything that fits no other category.
    #[error("delivery failed: {0}")]
    Unknown(String),
}

impl DeliveryError {
    /// The variant's [`FailureKind`].
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Unreachable(_) => FailureKind::Unreachable,
            Self::HandshakeFailed(_) => FailureKind::HandshakeFailed,
            Self::AuthRejected(_) => FailureKind::AuthRejected,
            Self::RecipientRejected(_) => FailureKind::RecipientRejected,
            Self::Protocol(_) => FailureKind::Protocol,
            Self::Timeout(_) => FailureKind::Timeout,
            Self::Unknown(_) => FailureKind::Unknown,
        }
    }

    /// The human-oriented detail string.
    #[must_use]
    pub fn detail(&self) -> &str {
        match self {
            Self::Unreachable(detail)
            | Self::HandshakeFailed(detail)
            | Self::AuthRejected(detail)
            | Self::RecipientRejected(detail)
            | Self::Protocol(detail)
            | Self::Timeout(detail)
            | Self::Unknown(detail) => detail,
        }
    }

    /// `true` if no retry and no transport switch can help.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::AuthRejected(_) | Self::RecipientRejected(_))
    }

    /// `true` if the current profile deserves another try.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        !self.is_fatal()
    }
}

/// Fallback classification for client errors that reach the caller
/// without step-specific handling.
///
/// The attempt executor classifies most failures at the step where they
/// occur (an AUTH 535 means something different from an RCPT 550); this
/// conversion covers the mechanical cases that mean the same thing
/// everywhere.
impl From<ClientError> for DeliveryError {
    fn from(error: ClientError) -> Self {
        match error {
            // TLS problems are handshake failures wherever they surface.
            ClientError::TlsError(detail) => Self::HandshakeFailed(detail),

            // Malformed replies and unexpected codes are protocol trouble.
            ClientError::ParseError(detail) => Self::Protocol(detail),
            ClientError::Utf8Error(e) => Self::Protocol(format!("reply not UTF-8: {e}")),
            ClientError::SmtpError { code, message } => {
                Self::Protocol(format!("unexpected reply: {code} {message}"))
            }

            // Mid-session I/O trouble has no better category.
            ClientError::Io(e) => Self::Unknown(format!("I/O error: {e}")),
            ClientError::ConnectionClosed => {
                Self::Unknown("connection closed unexpectedly".to_string())
            }
        }
    }
}
