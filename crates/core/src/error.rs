//! Error types for the transfer layer
//!
//! This module provides the canonical error type for all transfer-layer
//! operations. Usage errors are programming bugs and are fatal to the
//! offending call; transport and protocol errors surface through the
//! transaction's terminal status and error message.

use crate::buffer::BufferKind;
use thiserror::Error;

/// All transfer-layer errors
///
/// This is the canonical error type for transaction and connection
/// operations. Usage-error variants indicate misuse of the API by the
/// caller; they are never produced by transport activity.
#[derive(Debug, Error)]
pub enum Error {
    /// Transaction was started a second time
    #[error("transaction already started")]
    AlreadyStarted,

    /// Transaction was started with zero expected operations
    #[error("transaction must expect at least one operation")]
    NothingToTransfer,

    /// Transaction was closed a second time
    #[error("transaction already closed")]
    AlreadyClosed,

    /// Correlation tag was read before any completion set it
    #[error("correlation tag not set")]
    HeaderNotSet,

    /// Statistics were requested before the transaction stopped
    #[error("statistics unavailable: transaction has not stopped")]
    StatsBeforeStop,

    /// `respond` was invoked through a client-role connection
    #[error("respond requires a server-role connection")]
    NotServerRole,

    /// A message release was requested while no message is held
    #[error("no active message held")]
    NoActiveMessage,

    /// The held message is not of the kind the caller expected
    #[error("wrong buffer kind: expected {expected}, got {actual}")]
    WrongBufferKind {
        /// Kind the caller asked for
        expected: BufferKind,
        /// Kind of the message actually held
        actual: BufferKind,
    },

    /// A low-level operation or the aggregate transfer failed
    #[error("transport failure: {0}")]
    Transport(String),

    /// The completion protocol was violated by the remote or the transport
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// A caller-supplied completion callback failed
    #[error("completion callback failed: {0}")]
    Callback(String),

    /// Cleanup during close partially failed
    ///
    /// The transaction still reached a terminal status and waiters were
    /// woken; this error reports every cancellation or release failure
    /// encountered along the way.
    #[error("close failed with {} error(s): {}", .causes.len(), summarize(.causes))]
    CloseFailed {
        /// Every failure encountered while cancelling and releasing
        causes: Vec<Error>,
    },
}

/// Result type for transfer-layer operations
pub type Result<T> = std::result::Result<T, Error>;

fn summarize(causes: &[Error]) -> String {
    causes
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// Check if this error is a usage error (a programming bug in the caller)
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Error::AlreadyStarted
                | Error::NothingToTransfer
                | Error::AlreadyClosed
                | Error::HeaderNotSet
                | Error::StatsBeforeStop
                | Error::NotServerRole
                | Error::NoActiveMessage
                | Error::WrongBufferKind { .. }
        )
    }

    /// Check if this error originated at the transport level
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    /// Check if this error aggregates cleanup failures
    pub fn is_close_failure(&self) -> bool {
        matches!(self, Error::CloseFailed { .. })
    }
}
