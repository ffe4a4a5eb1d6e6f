//! # Beacon Event System Errors
//!
//! Defines error types specific to the event bus.
//!
//! [`EventSystemError`] covers usage errors (operating on a disposed bus, a
//! watcher touching cancellation state), subscriber callback failures and
//! bus configuration problems.
use std::path::PathBuf;

use crate::event::bus::BusId;
use thiserror::Error;

/// Error type returned by subscriber callbacks
pub type SubscriberError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum EventSystemError {
    #[error("Event bus {bus} is disposed")]
    BusDisposed { bus: BusId },

    #[error("Watcher subscriber '{subscriber}' changed the cancellation state of event '{event}'")]
    WatcherMutatedCancellation {
        subscriber: String,
        event: String,
    },

    #[error("Subscriber '{subscriber}' failed while handling event '{event}': {source}")]
    SubscriberFailed {
        subscriber: String,
        event: String,
        #[source]
        source: SubscriberError,
    },

    #[error("Failed to parse {format} event bus configuration: {reason}")]
    ConfigParse {
        format: String, // e.g., "json", "toml"
        reason: String,
    },

    #[error("Failed to serialize event bus configuration to {format}: {reason}")]
    ConfigSerialize { format: String, reason: String },

    #[error("Unknown or unsupported config format for path: {}", path.display())]
    UnsupportedConfigFormat { path: PathBuf },

    #[error("I/O error during '{operation}' on path '{}': {source}", path.display())]
    Io {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EventSystemError {
    /// True for errors caused by misuse of the bus rather than by a subscriber or config.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            EventSystemError::BusDisposed { .. } | EventSystemError::WatcherMutatedCancellation { .. }
        )
    }
}

/// Shorthand for Result with the event system error type
pub type Result<T> = std::result::Result<T, EventSystemError>;
