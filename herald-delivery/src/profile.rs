//! Transport profile catalog.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How the secure channel is established for a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Security {
    /// Connect in plaintext, then upgrade via STARTTLS (port 587 model).
    StartTls,
    /// TLS handshake immediately on connect (port 465 model).
    Tls,
}

/// One candidate delivery configuration.
///
/// Profiles are defined once at process start; the configured order is
/// the trial order, most-likely-to-succeed first. They are never
/// mutated afterwards, so concurrent deliveries can share the catalog
/// freely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportProfile {
    /// Short identifier used in logs and diagnostics.
    pub name: String,
    /// Server hostname or address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Secure-channel establishment mode.
    pub security: Security,
}

impl TransportProfile {
    /// The `host:port` pair as a connect target.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for TransportProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.address())
    }
}
