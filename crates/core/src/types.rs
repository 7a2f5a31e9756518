//! Core identifier types for the transfer layer
//!
//! This module defines the fundamental identifiers used throughout the system:
//! - [`TransactionId`]: Unique identifier for a transfer transaction
//! - [`ExecutorId`]: Identifier for a remote peer (executor process)
//! - [`CorrelationTag`]: Protocol token matching a response to its request
//! - [`MessageKind`]: Semantic tag carried by every message

use serde::{Deserialize, Serialize};

/// Unique identifier for a transfer transaction
///
/// Transaction ids are scoped to the connection that created the
/// transaction; two connections may reuse the same numeric value. Ids are
/// allocated sequentially by the connection's registry and are never
/// recycled for the lifetime of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(u64);

impl TransactionId {
    /// Create a transaction id from a raw value
    pub fn new(raw: u64) -> Self {
        TransactionId(raw)
    }

    /// Get the raw numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tx-{}", self.0)
    }
}

/// Identifier for a remote executor process
///
/// Executors are the endpoints of the shuffle data plane. The id is
/// assigned by the cluster scheduler and embedded into every
/// [`CorrelationTag`] so a server can route a reply without a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutorId(u32);

impl ExecutorId {
    /// Create an executor id from a raw value
    pub fn new(raw: u32) -> Self {
        ExecutorId(raw)
    }

    /// Get the raw numeric value
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for ExecutorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "executor-{}", self.0)
    }
}

/// Protocol token matching a response to its originating request
///
/// A tag packs the sender's [`ExecutorId`] into the upper 32 bits and a
/// per-executor sequence number into the lower 32 bits. The packing is
/// part of the protocol: the receiving side recovers the peer identity
/// from the tag alone, without consulting a routing table.
///
/// # Examples
///
/// ```
/// use rdmalink_core::types::{CorrelationTag, ExecutorId};
///
/// let tag = CorrelationTag::compose(ExecutorId::new(7), 42);
/// assert_eq!(tag.executor_id(), ExecutorId::new(7));
/// assert_eq!(tag.sequence(), 42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationTag(u64);

impl CorrelationTag {
    /// Compose a tag from an executor id and a sequence number
    pub fn compose(executor: ExecutorId, sequence: u32) -> Self {
        CorrelationTag(((executor.as_u32() as u64) << 32) | sequence as u64)
    }

    /// Create a tag from its raw wire value
    pub fn from_raw(raw: u64) -> Self {
        CorrelationTag(raw)
    }

    /// Get the raw wire value
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Recover the executor id embedded in this tag
    pub fn executor_id(&self) -> ExecutorId {
        ExecutorId::new((self.0 >> 32) as u32)
    }

    /// Get the per-executor sequence number
    pub fn sequence(&self) -> u32 {
        self.0 as u32
    }
}

impl std::fmt::Display for CorrelationTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tag-{:#x}", self.0)
    }
}

/// Semantic kind of a message exchanged over the data plane
///
/// The kind is carried alongside the payload and recorded on the
/// transaction when a message completes. A server uses the recorded kind
/// when replying, so a reply always carries the kind the requester
/// expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// Request for one or more shuffle blocks
    BlockRequest,
    /// Reply carrying shuffle block data
    BlockReply,
    /// Control traffic (handshake follow-ups, teardown notices)
    Control,
}

impl MessageKind {
    /// Stable name for diagnostics and logging
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::BlockRequest => "block-request",
            MessageKind::BlockReply => "block-reply",
            MessageKind::Control => "control",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_round_trip() {
        let tag = CorrelationTag::compose(ExecutorId::new(19), 77);
        assert_eq!(tag.executor_id(), ExecutorId::new(19));
        assert_eq!(tag.sequence(), 77);
        assert_eq!(CorrelationTag::from_raw(tag.as_u64()), tag);
    }

    #[test]
    fn test_tag_executor_occupies_upper_bits() {
        let tag = CorrelationTag::compose(ExecutorId::new(1), 0);
        assert_eq!(tag.as_u64(), 1u64 << 32);
    }

    #[test]
    fn test_tag_sequence_does_not_leak_into_executor() {
        let tag = CorrelationTag::compose(ExecutorId::new(0), u32::MAX);
        assert_eq!(tag.executor_id(), ExecutorId::new(0));
        assert_eq!(tag.sequence(), u32::MAX);
    }

    #[test]
    fn test_display_formats() {
        assert_eq!(TransactionId::new(5).to_string(), "tx-5");
        assert_eq!(ExecutorId::new(3).to_string(), "executor-3");
        assert_eq!(MessageKind::BlockReply.to_string(), "block-reply");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Tag packing never mixes the executor and sequence halves
            #[test]
            fn prop_tag_packing_round_trips(executor in any::<u32>(), sequence in any::<u32>()) {
                let tag = CorrelationTag::compose(ExecutorId::new(executor), sequence);
                prop_assert_eq!(tag.executor_id().as_u32(), executor);
                prop_assert_eq!(tag.sequence(), sequence);
            }
        }
    }
}
