//! End-to-end exercise of the public facade
//!
//! Uses only `rdmalink::prelude::*`, the way downstream code does: an
//! in-process loopback connection implements the seam, a request
//! transaction completes, and the server responds through it.

use rdmalink::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};

/// Loopback connection: sends complete immediately in-process
struct LoopConnection {
    role: ConnectionRole,
    registry: TransactionRegistry,
    me: OnceLock<Weak<LoopConnection>>,
    sent: AtomicUsize,
}

impl LoopConnection {
    fn new(role: ConnectionRole) -> Arc<Self> {
        let conn = Arc::new(LoopConnection {
            role,
            registry: TransactionRegistry::with_wait_options(WaitOptions::fast()),
            me: OnceLock::new(),
            sent: AtomicUsize::new(0),
        });
        conn.me.set(Arc::downgrade(&conn)).ok();
        conn
    }

    fn create_transaction(self: &Arc<Self>) -> Arc<Transaction> {
        let conn: Arc<dyn Connection> = Arc::clone(self) as Arc<dyn Connection>;
        self.registry.create(&conn)
    }
}

impl Connection for LoopConnection {
    fn role(&self) -> ConnectionRole {
        self.role
    }

    fn remove_transaction(&self, id: TransactionId) {
        self.registry.remove(id);
    }

    fn cancel(&self, _op: &Arc<dyn LowLevelOp>) -> Result<()> {
        Ok(())
    }

    fn send(
        &self,
        _peer: ExecutorId,
        kind: MessageKind,
        header: CorrelationTag,
        buffer: MessageBuffer,
        callback: CompletionCallback,
    ) -> Result<Arc<Transaction>> {
        let me = self
            .me
            .get()
            .and_then(Weak::upgrade)
            .expect("connection alive during send");
        let conn: Arc<dyn Connection> = me;
        let tx = self.registry.create(&conn);
        tx.start(TransactionKind::Send, 1, move |t| callback(t))?;
        tx.add_send_bytes(buffer.len() as u64);
        self.sent.fetch_add(1, Ordering::AcqRel);
        tx.operation_completed();
        tx.complete_success(kind, header, None);
        Ok(tx)
    }
}

#[test]
fn test_client_lifecycle_through_facade() {
    let conn = LoopConnection::new(ConnectionRole::Client);
    let tx = conn.create_transaction();

    tx.start(TransactionKind::Receive, 1, |t| {
        assert_eq!(t.status(), TransactionStatus::Success);
        Ok(())
    })
    .unwrap();

    let tag = CorrelationTag::compose(ExecutorId::new(2), 1);
    tx.add_receive_bytes(4096);
    tx.operation_completed();
    tx.complete_success(
        MessageKind::BlockReply,
        tag,
        Some(MessageBuffer::registered(vec![7u8; 16])),
    );

    let payload = tx.release_message(BufferKind::Registered).unwrap();
    assert_eq!(payload.len(), 16);

    let stats = tx.stats().unwrap();
    assert_eq!(stats.receive_bytes, 4096);

    assert_eq!(tx.close().unwrap(), TransactionStatus::Complete);
    assert_eq!(tx.wait_for_completion(), TransactionStatus::Complete);
    assert!(conn.registry.is_empty());
}

#[test]
fn test_server_responds_through_facade() {
    let conn = LoopConnection::new(ConnectionRole::Server);
    let rx = conn.create_transaction();

    rx.start(TransactionKind::Receive, 1, |_| Ok(())).unwrap();

    // an incoming request from executor 5 lands on the server
    let request_tag = CorrelationTag::compose(ExecutorId::new(5), 42);
    rx.operation_completed();
    rx.complete_success(
        MessageKind::BlockRequest,
        request_tag,
        Some(MessageBuffer::heap(b"fetch block 42".to_vec())),
    );

    let reply = rx
        .respond(MessageBuffer::registered(vec![0u8; 64]), |_| Ok(()))
        .unwrap();
    assert_eq!(conn.sent.load(Ordering::Acquire), 1);
    assert_eq!(reply.status(), TransactionStatus::Success);
    assert_eq!(reply.header().unwrap(), request_tag);
    assert_eq!(reply.send_bytes(), 64);

    assert_eq!(reply.close().unwrap(), TransactionStatus::Complete);
    rx.release_message(BufferKind::Heap).unwrap();
    assert_eq!(rx.close().unwrap(), TransactionStatus::Complete);
}

#[test]
fn test_respond_rejected_on_client_role() {
    let conn = LoopConnection::new(ConnectionRole::Client);
    let tx = conn.create_transaction();
    tx.start(TransactionKind::Request, 1, |_| Ok(())).unwrap();
    tx.operation_completed();
    tx.complete_success(
        MessageKind::BlockReply,
        CorrelationTag::compose(ExecutorId::new(1), 1),
        None,
    );

    let err = tx
        .respond(MessageBuffer::heap(vec![0u8]), |_| Ok(()))
        .unwrap_err();
    assert!(matches!(err, Error::NotServerRole));
    tx.close().unwrap();
}
