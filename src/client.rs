//! The sending side of a connection, as seen by the state store.
//!
//! Each connection owns its socket's read half exclusively and hands the state store the sending
//! side of an unbounded channel instead of the write half directly; the connection's own writer
//! task drains that channel onto the socket. The Notify Service only ever needs to push an item
//! into a queue this way, never to wait on a peer's socket while holding the store's lock.

use std::sync::Arc;
use tokio::sync::mpsc;

/// One outgoing record, queued for a connection's writer task.
///
/// An `Arc<str>` so that broadcasting the same line to every member of a channel clones a
/// refcount rather than the string.
pub type MessageQueueItem = Arc<str>;

/// The sending half of a connection's outgoing queue.
///
/// `send` returning `Err` means the connection's writer task (and therefore the connection
/// itself) has already gone away; every call site swallows that (a per-recipient send error must
/// never block notification of the rest).
pub type MessageQueue = mpsc::UnboundedSender<MessageQueueItem>;

pub fn queue_item(line: impl Into<String>) -> MessageQueueItem {
    let mut s = line.into();
    s.push('\n');
    Arc::from(s)
}
