//! Shared value types for the delivery core.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The authenticated sender account.
///
/// Loaded once at startup and immutable for the process lifetime. The
/// secret never appears in logs: `Debug` redacts it, and the type has
/// no `Display`.
#[derive(Clone, PartialEq, Eq)]
pub struct SenderIdentity {
    /// Mailbox used for AUTH and as the envelope sender.
    pub address: String,
    /// Account secret used for AUTH.
    pub secret: String,
}

impl SenderIdentity {
    #[must_use]
    pub const fn new(address: String, secret: String) -> Self {
        Self { address, secret }
    }

    /// The domain part of the sender address, used as the EHLO name.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.address
            .split_once('@')
            .map_or("localhost", |(_, domain)| domain)
    }
}

impl fmt::Debug for SenderIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenderIdentity")
            .field("address", &self.address)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// One notification message, owned by the request that built it.
///
/// Dropped after the delivery attempt completes, successfully or not;
/// nothing retains it across requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Subject line.
    pub subject: String,
    /// Pre-rendered HTML body, transmitted as-is.
    pub body_html: String,
    /// Recipient mailbox (envelope and To header).
    pub recipient: String,
}

/// Per-step timeouts for one delivery attempt.
///
/// Every network operation in the transaction runs under its own
/// deadline so a stalled server surfaces as a `Timeout` failure rather
/// than an indefinite block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpTimeouts {
    /// Connection establishment (and the TLS handshake for implicit
    /// TLS profiles).
    ///
    /// Default: 30 seconds
    #[serde(default = "defaults::connect_secs")]
    pub connect_secs: u64,

    /// EHLO exchange.
    ///
    /// Default: 30 seconds
    #[serde(default = "defaults::ehlo_secs")]
    pub ehlo_secs: u64,

    /// STARTTLS command and channel upgrade.
    ///
    /// Default: 30 seconds
    #[serde(default = "defaults::starttls_secs")]
    pub starttls_secs: u64,

    /// AUTH exchange.
    ///
    /// Default: 30 seconds
    #[serde(default = "defaults::auth_secs")]
    pub auth_secs: u64,

    /// MAIL FROM exchange.
    ///
    /// Default: 30 seconds
    #[serde(default = "defaults::mail_from_secs")]
    pub mail_from_secs: u64,

    /// RCPT TO exchange.
    ///
    /// Default: 30 seconds
    #[serde(default = "defaults::rcpt_to_secs")]
    pub rcpt_to_secs: u64,

    /// DATA command and payload transmission.
    ///
    /// Longer than the others to accommodate large bodies.
    /// Default: 120 seconds
    #[serde(default = "defaults::data_secs")]
    pub data_secs: u64,

    /// QUIT exchange.
    ///
    /// Default: 10 seconds
    #[serde(default = "defaults::quit_secs")]
    pub quit_secs: u64,
}

impl Default for SmtpTimeouts {
    fn default() -> Self {
        Self {
            connect_secs: defaults::connect_secs(),
            ehlo_secs: defaults::ehlo_secs(),
            starttls_secs: defaults::starttls_secs(),
            auth_secs: defaults::auth_secs(),
            mail_from_secs: defaults::mail_from_secs(),
            rcpt_to_secs: defaults::rcpt_to_secs(),
            data_secs: defaults::data_secs(),
            quit_secs: defaults::quit_secs(),
        }
    }
}

mod defaults {
    pub const fn connect_secs() -> u64 {
        30
    }
    pub const fn ehlo_secs() -> u64 {
        30
    }
    pub const fn starttls_secs() -> u64 {
        30
    }
    pub const fn auth_secs() -> u64 {
        30
    }
    pub const fn mail_from_secs() -> u64 {
        30
    }
    pub const fn rcpt_to_secs() -> u64 {
        30
    }
    pub const fn data_secs() -> u64 {
        120
    }
    pub const fn quit_secs() -> u64 {
        10
    }
}
