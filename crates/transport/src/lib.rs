//! Transaction core of the rdmalink transfer layer
//!
//! This crate implements the transfer-transaction machinery:
//! - [`Transaction`]: aggregate lifecycle of concurrent sends/receives
//! - [`Connection`]: the seam to the owning connection implementation
//! - [`TransactionRegistry`]: per-connection id-keyed transaction table
//! - [`LowLevelOp`]: opaque handles to in-flight transport operations
//! - [`TransferStats`]: throughput snapshot of a stopped transaction
//!
//! Connection establishment, wire encoding, and endpoint management are
//! deliberately out of scope; implement [`Connection`] over the transport
//! of your choice and drive transactions through it.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod connection;
pub mod operation;
pub mod registry;
pub mod stats;
pub mod transaction;

pub use connection::{Connection, ConnectionRole};
pub use operation::LowLevelOp;
pub use registry::TransactionRegistry;
pub use stats::TransferStats;
pub use transaction::{
    CompletionCallback, Transaction, TransactionKind, TransactionStatus, WaitOptions,
};
