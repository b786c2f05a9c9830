//! Boundary crate for the herald notifier: process-wide configuration
//! and the notification request handler.
//!
//! The delivery machinery lives in `herald-delivery`; this crate loads
//! the configuration once at startup, validates inbound notification
//! requests, and maps delivery results to typed outcomes for whatever
//! surface (CLI today) fronts the service.

pub mod config;
pub mod notify;

pub use config::{Config, ConfigError};
pub use notify::{Notifier, NotifyError, NotifyOutcome, StatusNotification};
