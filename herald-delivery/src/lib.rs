//! Failover delivery core for outbound notification mail.
//!
//! This crate owns the path from "a rendered message and a recipient" to
//! "delivered, or a diagnosable failure":
//!
//! - An ordered catalog of transport profiles (server, port, encryption
//!   mode) describing the candidate ways to reach the provider
//! - A cheap connectivity probe that rules out dead network paths before
//!   paying for a full handshake
//! - A single-attempt executor running the complete
//!   connect → secure → authenticate → submit → quit transaction
//! - A closed failure taxonomy every caller can match exhaustively
//! - The failover controller that sequences probes, retries, and
//!   profile switches, and records every attempt in order

mod controller;
mod error;
mod executor;
mod outcome;
mod probe;
mod profile;
mod retry;
mod types;

pub use controller::FailoverController;
pub use error::{DeliveryError, FailureKind};
pub use executor::{AttemptExecutor, SmtpExecutor};
pub use outcome::{AttemptOutcome, DeliveryResult};
pub use probe::{Prober, TcpProber};
pub use profile::{Security, TransportProfile};
pub use retry::RetryPolicy;
pub use types::{Message, SenderIdentity, SmtpTimeouts};
