//! Process-wide configuration, loaded once at startup.

use std::path::Path;

use herald_delivery::{RetryPolicy, Security, SenderIdentity, SmtpTimeouts, TransportProfile};
use serde::Deserialize;
use thiserror::Error;

/// Environment variable consulted when `[sender].secret` is absent, so
/// the secret can stay out of the configuration file.
pub const SENDER_SECRET_ENV: &str = "HERALD_SENDER_SECRET";

/// Configuration problems, all detected before any network I/O.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Read(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("sender address is not configured")]
    MissingSenderAddress,

    #[error("sender secret is not configured (set [sender].secret or HERALD_SENDER_SECRET)")]
    MissingSenderSecret,

    #[error("no transport profiles are configured")]
    NoTransportProfiles,
}

/// Top-level configuration document.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sender: SenderConfig,

    /// Ordered transport profile catalog; trial order is list order.
    #[serde(default = "defaults::transports", rename = "transport")]
    pub transports: Vec<TransportProfile>,

    #[serde(default)]
    pub delivery: DeliveryConfig,
}

/// The `[sender]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SenderConfig {
    /// Mailbox used for AUTH and as the envelope sender.
    #[serde(default)]
    pub address: String,

    /// Account secret; falls back to [`SENDER_SECRET_ENV`] when unset.
    #[serde(default)]
    pub secret: Option<String>,
}

/// The `[delivery]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Reachability probe window per profile.
    ///
    /// Default: 3000 ms
    #[serde(default = "defaults::probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    #[serde(default)]
    pub timeouts: SmtpTimeouts,

    /// Accept invalid TLS certificates. Test servers only.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            probe_timeout_ms: defaults::probe_timeout_ms(),
            timeouts: SmtpTimeouts::default(),
            accept_invalid_certs: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sender: SenderConfig::default(),
            transports: defaults::transports(),
            delivery: DeliveryConfig::default(),
        }
    }
}

impl Config {
    /// Reads and parses the configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not parse.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Checks everything delivery needs before any network I/O:
    /// sender address, a resolvable secret, a non-empty profile list.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sender_identity()?;
        if self.transports.is_empty() {
            return Err(ConfigError::NoTransportProfiles);
        }
        Ok(())
    }

    /// Builds the immutable sender identity, consulting the
    /// environment for the secret when the file omits it.
    ///
    /// # Errors
    ///
    /// Returns an error if the address or secret is missing.
    pub fn sender_identity(&self) -> Result<SenderIdentity, ConfigError> {
        self.sender_identity_from(|name| std::env::var(name).ok())
    }

    fn sender_identity_from(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<SenderIdentity, ConfigError> {
        let address = self.sender.address.trim();
        if address.is_empty() {
            return Err(ConfigError::MissingSenderAddress);
        }

        let secret = self
            .sender
            .secret
            .clone()
            .filter(|secret| !secret.is_empty())
            .or_else(|| env(SENDER_SECRET_ENV))
            .filter(|secret| !secret.is_empty())
            .ok_or(ConfigError::MissingSenderSecret)?;

        Ok(SenderIdentity::new(address.to_string(), secret))
    }
}

mod defaults {
    use super::{Security, TransportProfile};

    pub const fn probe_timeout_ms() -> u64 {
        3000
    }

    /// The provider endpoints this service has always used: STARTTLS
    /// submission first, implicit TLS as the fallback path for
    /// networks that interfere with the upgrade.
    pub fn transports() -> Vec<TransportProfile> {
        vec![
            TransportProfile {
                name: "submission-starttls".to_string(),
                host: "smtp.gmail.com".to_string(),
                port: 587,
                security: Security::StartTls,
            },
            TransportProfile {
                name: "submission-tls".to_string(),
                host: "smtp.gmail.com".to_string(),
                port: 465,
                security: Security::Tls,
            },
        ]
    }
}
