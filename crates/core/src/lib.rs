//! Core types for the rdmalink transfer layer
//!
//! This crate defines the vocabulary shared by every part of the system:
//! - Identifier newtypes: [`TransactionId`], [`ExecutorId`], [`CorrelationTag`]
//! - Message tagging: [`MessageKind`]
//! - Payload handles: [`MessageBuffer`], [`BufferKind`]
//! - The canonical [`Error`] enum and [`Result`] alias
//!
//! Nothing here performs I/O; the transaction machinery lives in
//! `rdmalink-transport`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod buffer;
pub mod error;
pub mod types;

pub use buffer::{BufferKind, MessageBuffer};
pub use error::{Error, Result};
pub use types::{CorrelationTag, ExecutorId, MessageKind, TransactionId};
