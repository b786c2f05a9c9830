//! Error types for the SMTP client.

use std::io;

use thiserror::Error;

/// Errors that can occur while talking to an SMTP server.
#[derive(Error, Debug)]
pub enum ClientError {
    /// IO error during a network operation.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The server sent something that does not parse as an SMTP reply.
    #[error("failed to parse SMTP reply: {0}")]
    ParseError(String),

    /// The server answered with an error status code.
    #[error("SMTP error: {code} - {message}")]
    SmtpError { code: u16, message: String },

    /// TLS negotiation or certificate handling failed.
    #[error("TLS error: {0}")]
    TlsError(String),

    /// The server closed the connection mid-session.
    #[error("connection closed unexpectedly")]
    ConnectionClosed,

    /// Reply bytes were not valid UTF-8.
    #[error("UTF-8 error: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),
}

/// Specialized `Result` type for SMTP client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
