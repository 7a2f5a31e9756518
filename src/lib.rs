//! # rdmalink
//!
//! Transfer-transaction core for an RDMA-capable shuffle transport.
//!
//! rdmalink tracks the lifecycle of one or more concurrent, asynchronous
//! network operations issued over a low-level transport and exposes a
//! single completion point once all of them finish or one fails. It is the
//! coordination layer between three concurrent actors: the transport
//! progress thread delivering completions, the consumer thread waiting on
//! the aggregate result, and the owning connection cancelling outstanding
//! work on shutdown.
//!
//! ## Quick Start
//!
//! ```ignore
//! use rdmalink::prelude::*;
//!
//! // `conn` implements Connection over your transport
//! let tx = registry.create(&conn);
//! tx.start(TransactionKind::Receive, 2, |t| {
//!     println!("transfer finished with {}", t.status());
//!     Ok(())
//! })?;
//!
//! // ... the progress thread drives completions ...
//!
//! tx.wait_for_completion();
//! let payload = tx.release_message(BufferKind::Registered)?;
//! println!("{}", tx.stats()?);
//! tx.close()?;
//! ```
//!
//! ## Status model
//!
//! `Success` means the transport finished favorably; the transaction is
//! only terminal (`Complete`, `Error`, or `Cancelled`) after `close()` has
//! cancelled or verified every outstanding operation and released held
//! resources. Waiters block until a terminal status.
//!
//! ## Crates
//!
//! - `rdmalink-core`: identifiers, tags, buffers, the error enum
//! - `rdmalink-transport`: the transaction machinery and connection seam

#![warn(missing_docs)]

mod types;

pub mod prelude;

// Re-export error handling
pub use rdmalink_core::{Error, Result};

// Re-export the transaction machinery
pub use rdmalink_transport::{
    Connection, ConnectionRole, LowLevelOp, Transaction, TransactionKind, TransactionRegistry,
    TransactionStatus, TransferStats, WaitOptions,
};

// Re-export core types
pub use types::*;
