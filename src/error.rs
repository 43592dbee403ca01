//! Core error types and result handling
//!
//! The taxonomy separates three failure classes so callers can react
//! differently to each:
//!
//! | Type | Layer | Caller reaction |
//! |------|-------|-----------------|
//! | [`LinkError`] | device / transport | fall back to simulation |
//! | [`StoreError`] | persistence | warn, keep displaying |
//! | [`CycleError`] | orchestration | surface with the carried reading |
//!
//! None of these is fatal to a long-running poller.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::reading::Reading;

/// Result type for meter link operations
pub type LinkResult<T> = Result<T, LinkError>;

/// Result type for sample store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from the pure register decoder.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The register payload is shorter than the three mandatory quantities.
    #[error("malformed response: need at least {needed} registers, got {got}")]
    MalformedResponse { needed: usize, got: usize },
}

/// Errors from one `acquire()` transaction against the meter.
///
/// `Unreachable` means the device is absent; `ReadFailed` and `Decode` mean
/// the device is present but the transaction or its payload went wrong.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LinkError {
    /// TCP connect failed or timed out.
    #[error("meter unreachable at {endpoint}: {reason}")]
    Unreachable { endpoint: String, reason: String },

    /// Connected, but the read transaction failed (I/O, framing, timeout,
    /// or a device exception response).
    #[error("register read failed: {reason}")]
    ReadFailed { reason: String },

    /// Connected and answered, but the payload was undecodable.
    #[error("register decode failed: {0}")]
    Decode(#[from] DecodeError),
}

impl LinkError {
    /// Create an unreachable error
    pub fn unreachable(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        Self::Unreachable {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a read failure error
    pub fn read_failed(reason: impl Into<String>) -> Self {
        Self::ReadFailed {
            reason: reason.into(),
        }
    }

    /// True when the device did not answer at all
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }
}

/// Errors from the append-only sample store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Durability failure while writing or syncing the log
    #[error("sample store I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// Record-level failure while encoding or reading the log
    #[error("sample store record failure: {0}")]
    Csv(#[from] csv::Error),

    /// An append would break the monotonic-or-equal timestamp ordering
    #[error("append out of order: {offered} precedes last persisted {last}")]
    OutOfOrder {
        last: DateTime<Utc>,
        offered: DateTime<Utc>,
    },

    /// An existing log row could not be parsed at open
    #[error("corrupt record at line {line}: {reason}")]
    Corrupt { line: u64, reason: String },
}

/// Errors from one acquisition cycle.
#[derive(Debug, Error)]
pub enum CycleError {
    /// The sample was acquired (or simulated) but could not be persisted.
    /// The reading is carried so the caller can still display it.
    #[error("reading not persisted: {source}")]
    PersistFailure {
        reading: Reading,
        source: StoreError,
    },
}

impl CycleError {
    /// The reading the failed cycle still produced
    pub fn reading(&self) -> &Reading {
        match self {
            Self::PersistFailure { reading, .. } => reading,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::MalformedResponse { needed: 3, got: 1 };
        assert_eq!(
            err.to_string(),
            "malformed response: need at least 3 registers, got 1"
        );
    }

    #[test]
    fn test_link_error_classification() {
        let absent = LinkError::unreachable("10.0.0.7:502", "connection refused");
        assert!(absent.is_unreachable());

        let garbled = LinkError::read_failed("transaction id mismatch");
        assert!(!garbled.is_unreachable());

        let undecodable: LinkError = DecodeError::MalformedResponse { needed: 3, got: 2 }.into();
        assert!(!undecodable.is_unreachable());
    }

    #[test]
    fn test_store_error_wraps_io() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = StoreError::from(io);
        assert!(err.to_string().contains("disk full"));
    }
}
