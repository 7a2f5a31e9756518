//! Transfer transactions
//!
//! A [`Transaction`] tracks one or more concurrent low-level operations
//! (sends and/or receives) issued over the transport and exposes a single
//! aggregate completion point. Three actors touch it concurrently:
//!
//! - the transport progress thread, which delivers completions and drives
//!   the dispatcher through [`Transaction::complete`],
//! - the consumer thread, which starts the transaction and blocks in
//!   [`Transaction::wait_for_completion`],
//! - the owning connection, which may cancel outstanding work at close.
//!
//! # Locking
//!
//! All status-bearing fields live in one state struct behind a single
//! `parking_lot::Mutex`, paired with the wait-gate condvar. Byte counters
//! and the pending-operation count are lock-free atomics: they are hot
//! path and independent of status transitions. The user callback is never
//! invoked while the state lock is held.
//!
//! # Status model
//!
//! `Success` is not terminal. It records that the aggregate low-level
//! transfer went through; the transaction only becomes terminal
//! (`Complete`, `Error`, or `Cancelled`) once `close()` has cancelled or
//! verified every registered operation and released held resources.

use crate::connection::{Connection, ConnectionRole};
use crate::operation::LowLevelOp;
use crate::stats::TransferStats;
use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use parking_lot::{Condvar, Mutex};
use rdmalink_core::{
    BufferKind, CorrelationTag, Error, MessageBuffer, MessageKind, Result, TransactionId,
};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Completion callback invoked once the aggregate transfer finishes
///
/// Runs on whichever thread delivers the final transport event, never on
/// the consumer thread. The callback reads status, header, and message off
/// the transaction it receives. An `Err` return (or a panic) is caught at
/// the boundary and forces the transaction into `Error`; nothing escapes
/// into the transport progress thread.
pub type CompletionCallback = Box<dyn Fn(&Transaction) -> Result<()> + Send + Sync>;

/// What a transaction transfers
///
/// Informational: recorded for diagnostics. The shape of the transfer is
/// fully described by the registered operations themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Send a request, then receive its reply, one callback for both
    Request,
    /// One or more sends
    Send,
    /// One or more receives
    Receive,
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionKind::Request => f.write_str("request"),
            TransactionKind::Send => f.write_str("send"),
            TransactionKind::Receive => f.write_str("receive"),
        }
    }
}

/// Observable state of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Created, not yet started
    NotStarted,
    /// Started, operations outstanding
    InProgress,
    /// Aggregate transfer succeeded; not yet closed
    Success,
    /// Closed after a successful transfer (terminal)
    Complete,
    /// Failed (terminal)
    Error,
    /// Cancelled (terminal)
    Cancelled,
}

impl TransactionStatus {
    /// Whether this status permits no further status-affecting operations
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Complete | TransactionStatus::Error | TransactionStatus::Cancelled
        )
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TransactionStatus::NotStarted => "not-started",
            TransactionStatus::InProgress => "in-progress",
            TransactionStatus::Success => "success",
            TransactionStatus::Complete => "complete",
            TransactionStatus::Error => "error",
            TransactionStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Wait-gate tuning
///
/// The blocking wait re-checks status on a bounded interval even without a
/// signal: a waiter that raced the close, or a transfer the transport
/// cannot cancel mid-flight, must not hang forever on a missed wakeup.
#[derive(Debug, Clone, Copy)]
pub struct WaitOptions {
    /// Upper bound on one condvar wait before re-checking status
    pub poll_interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        WaitOptions {
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl WaitOptions {
    /// Short poll interval, suitable for tests
    pub fn fast() -> Self {
        WaitOptions {
            poll_interval: Duration::from_millis(10),
        }
    }

    /// Explicit poll interval
    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        WaitOptions { poll_interval }
    }
}

/// Status-bearing fields, guarded by the one transaction lock
struct TxState {
    kind: Option<TransactionKind>,
    status: TransactionStatus,
    header: Option<CorrelationTag>,
    message_kind: Option<MessageKind>,
    active_message: Option<MessageBuffer>,
    error_message: Option<String>,
    had_error: bool,
    callback_invoked: bool,
    started: bool,
    closed: bool,
    start_time: Option<DateTime<Utc>>,
    stop_time: Option<DateTime<Utc>>,
}

impl TxState {
    fn new() -> Self {
        TxState {
            kind: None,
            status: TransactionStatus::NotStarted,
            header: None,
            message_kind: None,
            active_message: None,
            error_message: None,
            had_error: false,
            callback_invoked: false,
            started: false,
            closed: false,
            start_time: None,
            stop_time: None,
        }
    }
}

/// Decision taken by the dispatcher under the state lock, acted on after
/// the lock is released
enum DispatchAction {
    /// Spurious repeat on a known-bad transaction: drop it
    Ignore,
    /// Force the transaction into `Error` without running the callback
    ForceError(String),
    /// Run the user callback
    InvokeCallback,
}

/// A transfer transaction
///
/// Created by its owning connection's registry, started once, fed
/// completions by the progress thread, and closed exactly once. See the
/// module docs for the locking and status model.
pub struct Transaction {
    id: TransactionId,
    conn: Arc<dyn Connection>,
    state: Mutex<TxState>,
    done: Condvar,
    wait: WaitOptions,
    /// Operations still expected; decremented per completion, never negative
    pending: AtomicI64,
    /// Expected operation count, fixed at start
    total: AtomicU64,
    send_bytes: AtomicU64,
    receive_bytes: AtomicU64,
    /// Single-assignment callback slot, installed at start
    callback: OnceCell<CompletionCallback>,
    /// Handles to every issued low-level operation, enumerated at close
    operations: Mutex<SmallVec<[Arc<dyn LowLevelOp>; 4]>>,
}

impl Transaction {
    pub(crate) fn new(id: TransactionId, conn: Arc<dyn Connection>, wait: WaitOptions) -> Self {
        Transaction {
            id,
            conn,
            state: Mutex::new(TxState::new()),
            done: Condvar::new(),
            wait,
            pending: AtomicI64::new(0),
            total: AtomicU64::new(0),
            send_bytes: AtomicU64::new(0),
            receive_bytes: AtomicU64::new(0),
            callback: OnceCell::new(),
            operations: Mutex::new(SmallVec::new()),
        }
    }

    /// Identifier of this transaction, unique within its connection
    pub fn id(&self) -> TransactionId {
        self.id
    }

    // ========================================================================
    // Lifecycle: start / register / per-operation completion
    // ========================================================================

    /// Start the transaction
    ///
    /// Installs the completion callback and arms the pending-operation
    /// counter. May be called at most once, only before close, and only
    /// with a nonzero expected count; each violation is a usage error and
    /// leaves prior state untouched.
    pub fn start<F>(&self, kind: TransactionKind, expected_ops: u64, callback: F) -> Result<()>
    where
        F: Fn(&Transaction) -> Result<()> + Send + Sync + 'static,
    {
        let mut state = self.state.lock();
        if state.started {
            return Err(Error::AlreadyStarted);
        }
        if state.closed {
            return Err(Error::AlreadyClosed);
        }
        if expected_ops == 0 {
            return Err(Error::NothingToTransfer);
        }
        if self.callback.set(Box::new(callback)).is_err() {
            return Err(Error::AlreadyStarted);
        }
        state.started = true;
        state.kind = Some(kind);
        state.status = TransactionStatus::InProgress;
        state.start_time = Some(Utc::now());
        self.total.store(expected_ops, Ordering::Release);
        self.pending.store(expected_ops as i64, Ordering::Release);
        debug!(id = %self.id, %kind, expected_ops, "transaction started");
        Ok(())
    }

    /// Register a low-level operation issued on behalf of this transaction
    ///
    /// The handle is only consulted at close time, to verify completion or
    /// request cancellation; it plays no part in completion counting.
    pub fn register_operation(&self, op: Arc<dyn LowLevelOp>) {
        self.operations.lock().push(op);
    }

    /// Record that one registered operation finished, returning how many
    /// remain
    ///
    /// Called by the progress thread for every finished operation,
    /// successful or not. Driving the count below zero means a completion
    /// was delivered for an operation that was never expected; that is a
    /// bug in the transport driver and panics.
    pub fn operation_completed(&self) -> u64 {
        let prev = self.pending.fetch_sub(1, Ordering::AcqRel);
        if prev <= 0 {
            panic!("pending operation count underflow on {}", self.id);
        }
        (prev - 1) as u64
    }

    /// Operations still outstanding
    pub fn pending_operations(&self) -> u64 {
        self.pending.load(Ordering::Acquire).max(0) as u64
    }

    /// Expected operation count fixed at start
    pub fn total_operations(&self) -> u64 {
        self.total.load(Ordering::Acquire)
    }

    /// Number of registered low-level operation handles
    pub fn registered_operations(&self) -> usize {
        self.operations.lock().len()
    }

    // ========================================================================
    // Byte accounting
    // ========================================================================

    /// Add to the sent-byte counter
    ///
    /// Safe under concurrent calls from multiple completion threads.
    pub fn add_send_bytes(&self, bytes: u64) {
        self.send_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Add to the received-byte counter
    pub fn add_receive_bytes(&self, bytes: u64) {
        self.receive_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Total bytes sent so far
    pub fn send_bytes(&self) -> u64 {
        self.send_bytes.load(Ordering::Relaxed)
    }

    /// Total bytes received so far
    pub fn receive_bytes(&self) -> u64 {
        self.receive_bytes.load(Ordering::Relaxed)
    }

    // ========================================================================
    // Completion dispatch
    // ========================================================================

    /// Deliver the aggregate outcome of a wave of operations
    ///
    /// The single transport-facing mutation entry point: records whatever
    /// fields the wave produced, then drives the completion dispatcher
    /// with `outcome`. On the first favorable delivery the stop time is
    /// recorded before the user callback runs, so the callback can read
    /// final statistics.
    ///
    /// A second effective delivery is a protocol violation and forces the
    /// transaction into `Error`, unless it is already cancelled or errored,
    /// in which case the repeat is dropped without a duplicate user-visible
    /// error.
    pub fn complete(
        &self,
        outcome: TransactionStatus,
        message_kind: Option<MessageKind>,
        header: Option<CorrelationTag>,
        message: Option<MessageBuffer>,
        error_message: Option<String>,
    ) {
        let action = {
            let mut state = self.state.lock();
            if let Some(tag) = header {
                state.header = Some(tag);
            }
            if let Some(buf) = message {
                state.active_message = Some(buf);
            }
            if let Some(kind) = message_kind {
                state.message_kind = Some(kind);
            }
            if let Some(msg) = error_message {
                state.error_message = Some(msg);
            }
            self.dispatch(&mut state, outcome)
        };
        self.run_action(action);
    }

    /// Deliver a favorable aggregate outcome
    pub fn complete_success(
        &self,
        kind: MessageKind,
        header: CorrelationTag,
        message: Option<MessageBuffer>,
    ) {
        self.complete(
            TransactionStatus::Success,
            Some(kind),
            Some(header),
            message,
            None,
        );
    }

    /// Deliver an unfavorable aggregate outcome
    pub fn complete_with_error(&self, message: impl Into<String>) {
        self.complete(
            TransactionStatus::Error,
            None,
            None,
            None,
            Some(message.into()),
        );
    }

    /// Deliver a cancelled outcome
    pub fn complete_cancelled(&self, kind: MessageKind, header: CorrelationTag) {
        self.complete(
            TransactionStatus::Cancelled,
            Some(kind),
            Some(header),
            None,
            None,
        );
    }

    /// Dispatcher core, runs under the state lock
    fn dispatch(&self, state: &mut TxState, outcome: TransactionStatus) -> DispatchAction {
        if state.callback_invoked {
            if state.status == TransactionStatus::Cancelled || state.had_error {
                debug!(id = %self.id, %outcome, "dropping spurious completion");
                return DispatchAction::Ignore;
            }
            state.had_error = true;
            let reason = format!("completion delivered more than once for {}", self.id);
            state.error_message = Some(reason.clone());
            return DispatchAction::ForceError(reason);
        }
        state.callback_invoked = true;

        match outcome {
            TransactionStatus::Success => {
                state.status = TransactionStatus::Success;
                // stop the clock before the callback can ask for stats
                state.stop_time = Some(Utc::now());
            }
            TransactionStatus::Cancelled => {
                state.status = TransactionStatus::Cancelled;
            }
            TransactionStatus::Error => {
                // terminal status is decided at close time
                state.had_error = true;
            }
            other => {
                state.had_error = true;
                state.error_message =
                    Some(format!("transport delivered invalid outcome {}", other));
            }
        }

        if !state.started || state.closed || state.status == TransactionStatus::Complete {
            let reason = format!(
                "completion delivered in inconsistent state {} for {}",
                state.status, self.id
            );
            state.had_error = true;
            state.error_message = Some(reason.clone());
            return DispatchAction::ForceError(reason);
        }
        DispatchAction::InvokeCallback
    }

    /// Act on a dispatch decision with the state lock released
    fn run_action(&self, action: DispatchAction) {
        match action {
            DispatchAction::Ignore => {}
            DispatchAction::ForceError(reason) => {
                error!(id = %self.id, %reason, "forcing transaction into error state");
                self.signal_error(reason);
            }
            DispatchAction::InvokeCallback => {
                let Some(cb) = self.callback.get() else {
                    // start() installs the callback before any operation is
                    // issued; a delivery without one is a driver bug
                    self.signal_error(format!("no completion callback installed on {}", self.id));
                    return;
                };
                match catch_unwind(AssertUnwindSafe(|| cb(self))) {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        error!(id = %self.id, error = %e, "completion callback failed");
                        self.signal_error(format!("completion callback failed: {}", e));
                    }
                    Err(_) => {
                        error!(id = %self.id, "completion callback panicked");
                        self.signal_error("completion callback panicked".to_string());
                    }
                }
            }
        }
    }

    /// Shared terminal-error signal path
    ///
    /// Same sequence the closer uses: set status under the lock, wake
    /// waiters, then ask the connection to forget this transaction, so a
    /// transaction that dies before `close()` never strands a waiter or
    /// lingers in the table.
    fn signal_error(&self, reason: String) {
        {
            let mut state = self.state.lock();
            state.had_error = true;
            if state.error_message.is_none() {
                state.error_message = Some(reason);
            }
            state.status = TransactionStatus::Error;
            self.done.notify_all();
        }
        self.conn.remove_transaction(self.id);
    }

    // ========================================================================
    // Wait gate
    // ========================================================================

    /// Block until the transaction reaches a terminal status
    ///
    /// Re-checks on a bounded interval (see [`WaitOptions`]) so a waiter
    /// that raced the close cannot hang on a missed signal. Blocks
    /// indefinitely if the transaction is never completed or closed; for a
    /// bounded wait use [`Transaction::wait_for_completion_timeout`].
    pub fn wait_for_completion(&self) -> TransactionStatus {
        let mut state = self.state.lock();
        while !state.status.is_terminal() {
            let _ = self.done.wait_for(&mut state, self.wait.poll_interval);
        }
        state.status
    }

    /// Block until terminal status or until `limit` elapses
    ///
    /// Returns `None` if the transaction is still running when the limit
    /// expires; the transaction itself is unaffected.
    pub fn wait_for_completion_timeout(&self, limit: Duration) -> Option<TransactionStatus> {
        let deadline = Instant::now() + limit;
        let mut state = self.state.lock();
        while !state.status.is_terminal() {
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let step = (deadline - now).min(self.wait.poll_interval);
            let _ = self.done.wait_for(&mut state, step);
        }
        Some(state.status)
    }

    // ========================================================================
    // Close
    // ========================================================================

    /// Finalize the transaction
    ///
    /// Cancels or verifies every registered operation, releases any held
    /// message, transitions to a terminal status, wakes waiters, and
    /// deregisters from the owning connection. Terminal bookkeeping runs
    /// unconditionally; cleanup failures are aggregated and returned as
    /// [`Error::CloseFailed`] afterwards.
    ///
    /// Safe to call from the thread that delivered the terminal
    /// completion. Calling close a second time is a usage error.
    pub fn close(&self) -> Result<TransactionStatus> {
        // the closed guard is taken at entry so racing closers fail
        // deterministically instead of double-cancelling
        let had_error = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(Error::AlreadyClosed);
            }
            state.closed = true;
            state.had_error
        };

        let mut failures: Vec<Error> = Vec::new();
        let mut incomplete = 0usize;

        let ops: Vec<Arc<dyn LowLevelOp>> = self.operations.lock().iter().cloned().collect();
        for op in &ops {
            if op.is_complete() {
                continue;
            }
            if had_error {
                // best-effort: the transport may refuse, or the operation
                // may complete before the cancel lands
                if let Err(e) = self.conn.cancel(op) {
                    warn!(id = %self.id, error = %e, "cancellation failed during close");
                    if failures.is_empty() {
                        failures.push(e);
                    }
                }
            } else {
                incomplete += 1;
            }
        }

        let terminal = {
            let mut state = self.state.lock();
            if incomplete > 0 {
                // no prior error, yet work is still in flight: the caller
                // closed too early
                state.had_error = true;
                if state.error_message.is_none() {
                    state.error_message = Some(format!(
                        "{} operation(s) still incomplete at close",
                        incomplete
                    ));
                }
                warn!(id = %self.id, incomplete, "closed with incomplete operations");
            }
            if !failures.is_empty() {
                state.had_error = true;
            }
            // detach our handle on the active message; the payload's
            // lifetime is the caller's concern
            state.active_message = None;

            let terminal = if state.had_error {
                TransactionStatus::Error
            } else if state.status == TransactionStatus::Cancelled {
                TransactionStatus::Cancelled
            } else {
                TransactionStatus::Complete
            };
            state.status = terminal;
            self.done.notify_all();
            terminal
        };
        self.conn.remove_transaction(self.id);

        if failures.is_empty() {
            debug!(id = %self.id, status = %terminal, "transaction closed");
            Ok(terminal)
        } else {
            let err = Error::CloseFailed { causes: failures };
            error!(id = %self.id, error = %err, "transaction closed with cleanup failures");
            Err(err)
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Current status
    pub fn status(&self) -> TransactionStatus {
        self.state.lock().status
    }

    /// Kind recorded at start, if started
    pub fn kind(&self) -> Option<TransactionKind> {
        self.state.lock().kind
    }

    /// Diagnostic message recorded on failure, if any
    pub fn error_message(&self) -> Option<String> {
        self.state.lock().error_message.clone()
    }

    /// Correlation tag recorded by a completion
    ///
    /// Reading the tag before any completion set it is a usage error.
    pub fn header(&self) -> Result<CorrelationTag> {
        self.state.lock().header.ok_or(Error::HeaderNotSet)
    }

    /// Kind of the last completed message, if any
    pub fn message_kind(&self) -> Option<MessageKind> {
        self.state.lock().message_kind
    }

    /// Whether the transaction has been closed
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Whether the stop time has been recorded
    pub fn is_stopped(&self) -> bool {
        self.state.lock().stop_time.is_some()
    }

    /// Take ownership of the held message buffer
    ///
    /// The transaction holds at most one message. Release transfers the
    /// handle to the caller exactly once; asking for a kind other than
    /// what is held fails and leaves the message in place.
    pub fn release_message(&self, expected: BufferKind) -> Result<MessageBuffer> {
        let mut state = self.state.lock();
        match state.active_message.take() {
            None => Err(Error::NoActiveMessage),
            Some(buf) if buf.kind() != expected => {
                let actual = buf.kind();
                state.active_message = Some(buf);
                Err(Error::WrongBufferKind { expected, actual })
            }
            Some(buf) => Ok(buf),
        }
    }

    /// Throughput statistics for a stopped transaction
    ///
    /// Requires the stop time to have been recorded (a favorable aggregate
    /// completion); asking earlier is a usage error.
    pub fn stats(&self) -> Result<TransferStats> {
        let (start, stop) = {
            let state = self.state.lock();
            match (state.start_time, state.stop_time) {
                (Some(start), Some(stop)) => (start, stop),
                _ => return Err(Error::StatsBeforeStop),
            }
        };
        let elapsed_ms = (stop - start).num_milliseconds();
        Ok(TransferStats::new(
            elapsed_ms,
            self.send_bytes(),
            self.receive_bytes(),
        ))
    }

    // ========================================================================
    // Respond
    // ========================================================================

    /// Reply to the peer that originated this transaction's request
    ///
    /// Sends `buffer` tagged with this transaction's recorded message kind
    /// and correlation tag, to the peer embedded in the tag, through the
    /// owning connection. Returns the new transaction tracking the send.
    ///
    /// Only valid on a server-role connection, and only after a completion
    /// has recorded the tag and kind to echo back.
    pub fn respond<F>(&self, buffer: MessageBuffer, callback: F) -> Result<Arc<Transaction>>
    where
        F: Fn(&Transaction) -> Result<()> + Send + Sync + 'static,
    {
        if self.conn.role() != ConnectionRole::Server {
            return Err(Error::NotServerRole);
        }
        let (kind, header) = {
            let state = self.state.lock();
            (state.message_kind, state.header)
        };
        let header = header.ok_or(Error::HeaderNotSet)?;
        let kind = kind.ok_or_else(|| {
            Error::Protocol(format!("respond on {} before any completed message", self.id))
        })?;
        let peer = self.conn.extract_peer_id(header);
        debug!(id = %self.id, %peer, %kind, "responding");
        self.conn.send(peer, kind, header, buffer, Box::new(callback))
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("kind", &state.kind)
            .field("status", &state.status)
            .field("pending", &self.pending.load(Ordering::Acquire))
            .field("closed", &state.closed)
            .finish()
    }
}
