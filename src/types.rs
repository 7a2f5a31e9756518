//! Public types for the rdmalink unified API.
//!
//! This module re-exports types from the member crates with a clean public
//! interface.

// Identifier newtypes
pub use rdmalink_core::{CorrelationTag, ExecutorId, TransactionId};

// Message tagging and payload handles
pub use rdmalink_core::{BufferKind, MessageBuffer, MessageKind};

// Callback signature for completion delivery
pub use rdmalink_transport::CompletionCallback;
