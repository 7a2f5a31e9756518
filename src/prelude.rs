//! Convenient imports for rdmalink.
//!
//! This module re-exports the most commonly used types so you can get
//! started with a single import:
//!
//! ```ignore
//! use rdmalink::prelude::*;
//!
//! let tx = registry.create(&conn);
//! tx.start(TransactionKind::Send, 1, |_| Ok(()))?;
//! ```

// Transaction machinery
pub use crate::{Transaction, TransactionKind, TransactionRegistry, TransactionStatus};

// Connection seam
pub use crate::{Connection, ConnectionRole, LowLevelOp};

// Error handling
pub use crate::{Error, Result};

// Core types
pub use crate::types::{
    BufferKind, CompletionCallback, CorrelationTag, ExecutorId, MessageBuffer, MessageKind,
    TransactionId,
};

// Statistics and wait tuning
pub use crate::{TransferStats, WaitOptions};
