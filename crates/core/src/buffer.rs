//! Message buffer handles
//!
//! A [`MessageBuffer`] is the unit of payload ownership inside the transfer
//! layer. It is a cheap handle over shared bytes: cloning a buffer never
//! copies the payload, and dropping the last handle is what actually frees
//! the memory. The transfer layer itself never manages the underlying
//! refcount beyond holding or releasing its own handle.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Kind of memory backing a message buffer
///
/// Receives complete into transport-registered memory; everything else
/// lives on the ordinary heap. The kind travels with the handle so a
/// caller taking ownership can assert it got the memory class it expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BufferKind {
    /// Memory registered with the transport for zero-copy transfers
    Registered,
    /// Plain heap memory
    Heap,
}

impl BufferKind {
    /// Stable name for diagnostics and logging
    pub fn as_str(&self) -> &'static str {
        match self {
            BufferKind::Registered => "registered",
            BufferKind::Heap => "heap",
        }
    }
}

impl std::fmt::Display for BufferKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle to a message payload
///
/// # Ownership
///
/// The handle is reference-counted. A transaction holds at most one handle
/// as its active message; releasing it from the transaction transfers that
/// handle to the caller without touching the refcount of any other holder.
#[derive(Debug, Clone)]
pub struct MessageBuffer {
    kind: BufferKind,
    data: Arc<[u8]>,
}

impl MessageBuffer {
    /// Create a buffer handle over the given bytes
    pub fn new(kind: BufferKind, data: impl Into<Arc<[u8]>>) -> Self {
        MessageBuffer {
            kind,
            data: data.into(),
        }
    }

    /// Create a registered-memory buffer handle
    pub fn registered(data: impl Into<Arc<[u8]>>) -> Self {
        Self::new(BufferKind::Registered, data)
    }

    /// Create a heap buffer handle
    pub fn heap(data: impl Into<Arc<[u8]>>) -> Self {
        Self::new(BufferKind::Heap, data)
    }

    /// Kind of memory backing this buffer
    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow the payload bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}
