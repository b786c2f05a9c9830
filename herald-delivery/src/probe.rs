//! Cheap reachability probing ahead of full delivery attempts.

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;

/// Reachability check for a transport endpoint.
///
/// A trait so the failover controller can be exercised without opening
/// real sockets.
#[async_trait]
pub trait Prober: Send + Sync {
    /// `true` iff a transport-layer connection to `host:port` can be
    /// established within `timeout`.
    async fn probe(&self, host: &str, port: u16, timeout: Duration) -> bool;
}

/// Probes by opening and immediately closing a TCP connection.
///
/// All failure modes — refusal, DNS errors, timeouts — fold into
/// `false`; probing never raises. Knowing a path is dead lets the
/// controller skip the profile without paying for a TLS handshake and
/// an authentication round-trip.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpProber;

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, host: &str, port: u16, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(stream)) => {
                // Scoped acquisition: the probe connection never outlives
                // the check.
                drop(stream);
                true
            }
            Ok(Err(error)) => {
                tracing::debug!(host, port, %error, "probe failed");
                false
            }
            Err(_) => {
                tracing::debug!(host, port, ?timeout, "probe timed out");
                false
            }
        }
    }
}
