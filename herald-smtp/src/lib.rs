//! SMTP submission client used by the herald delivery core.
//!
//! This crate speaks just enough client-side SMTP to hand a finished
//! message to a submission server:
//!
//! - Plain TCP, implicit TLS, and STARTTLS-upgraded connections
//! - Reply parsing (including multi-line replies)
//! - EHLO, STARTTLS, AUTH LOGIN, MAIL FROM, RCPT TO, DATA, QUIT
//! - MIME message construction for an HTML notification body
//!
//! It deliberately knows nothing about retries, failover, or failure
//! classification; callers sequence the commands and decide what a given
//! reply means for their delivery policy.

mod client;
mod connection;
mod error;
mod message;
mod response;

pub use client::SmtpClient;
pub use error::{ClientError, Result};
pub use message::MessageBuilder;
pub use response::Response;
