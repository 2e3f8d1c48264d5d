//! Error types for the spooler

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Transport error taxonomy
///
/// Failures are classified into these kinds once, at the transport boundary.
/// The queue's retry predicate matches on the kind; nothing downstream
/// inspects error messages.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum TransportError {
    /// Network connection error (refused, reset, unreachable)
    #[error("Connection failed: {0}")]
    Connection(String),

    /// IO error while writing the payload
    #[error("IO error: {0}")]
    Io(String),

    /// Timeout waiting for the transport
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Delivery failed for an unclassified reason
    #[error("Send failed: {0}")]
    Other(String),

    /// No transport configured for this queue
    #[error("No transport configured")]
    NotConfigured,

    /// Transport exists but is not connected to its back end
    #[error("Not connected: {0}")]
    NotConnected(String),

    /// Invalid transport configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

impl TransportError {
    /// Whether a failed send is worth retrying.
    ///
    /// Configuration-level failures never resolve on their own; everything
    /// else is treated as transient.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::NotConfigured | Self::NotConnected(_) | Self::InvalidConfig(_)
        )
    }
}

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;
