//! Low-level operation handles
//!
//! A transaction registers one opaque handle per in-flight send or receive
//! it has issued against the transport. The handle's only job is to answer
//! "is the transport done with this?" at close time; completion *counting*
//! is driven by the progress thread through the transaction itself, never
//! by polling handles.

/// Opaque handle to one in-flight transport operation
///
/// Implementations wrap whatever request object the underlying transport
/// hands back when a send or receive is posted. Handles are shared between
/// the transaction (for close-time verification and cancellation) and the
/// progress thread (which drives the real completion), so they must be
/// safely shareable across threads.
pub trait LowLevelOp: Send + Sync {
    /// Whether the transport has finished processing this operation
    ///
    /// "Finished" covers success, failure, and completed cancellation
    /// alike; an operation that is still queued or in flight returns
    /// `false`.
    fn is_complete(&self) -> bool;
}
