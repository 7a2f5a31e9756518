//! The owning-connection seam
//!
//! Every transaction is owned by exactly one connection. The transaction
//! core never talks to the transport directly; it drives the handful of
//! operations below and leaves handshaking, wire encoding, and endpoint
//! management to the connection implementation.

use crate::operation::LowLevelOp;
use crate::transaction::{CompletionCallback, Transaction};
use rdmalink_core::{CorrelationTag, ExecutorId, MessageBuffer, MessageKind, Result, TransactionId};
use std::sync::Arc;

/// Role a connection plays in the shuffle protocol
///
/// Clients originate block requests; servers answer them. The role gates
/// [`Transaction::respond`]: only a server-role connection may send a
/// reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionRole {
    /// Connection opened by a fetching executor
    Client,
    /// Connection accepted by a serving executor
    Server,
}

impl std::fmt::Display for ConnectionRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionRole::Client => f.write_str("client"),
            ConnectionRole::Server => f.write_str("server"),
        }
    }
}

/// Operations a transaction requires from its owning connection
///
/// # Thread Safety
///
/// All methods may be called from the transport progress thread, the
/// consumer thread, or whichever thread runs `close()`; implementations
/// must be safe under that concurrency.
pub trait Connection: Send + Sync {
    /// Role this connection plays in the protocol
    fn role(&self) -> ConnectionRole;

    /// Forget a transaction once it has reached a terminal status
    ///
    /// Called by the transaction's signal path. Removing an id that is
    /// already gone must be a no-op: the forced-error path and `close()`
    /// can both deregister the same transaction.
    fn remove_transaction(&self, id: TransactionId);

    /// Best-effort cancellation of one outstanding operation
    ///
    /// The transport is not obliged to honor the request; an operation
    /// already being processed may complete anyway. Errors are reported to
    /// the closer, which records them without aborting cleanup.
    fn cancel(&self, op: &Arc<dyn LowLevelOp>) -> Result<()>;

    /// Send a message to a peer, returning the transaction tracking it
    ///
    /// Used by [`Transaction::respond`] to answer a request. The returned
    /// transaction has already been started with the supplied callback.
    fn send(
        &self,
        peer: ExecutorId,
        kind: MessageKind,
        header: CorrelationTag,
        buffer: MessageBuffer,
        callback: CompletionCallback,
    ) -> Result<Arc<Transaction>>;

    /// Derive the peer identity from a correlation tag
    ///
    /// The default implementation uses the protocol's standard packing
    /// (executor id in the upper tag bits).
    fn extract_peer_id(&self, header: CorrelationTag) -> ExecutorId {
        header.executor_id()
    }
}
