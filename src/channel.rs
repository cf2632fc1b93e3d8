//! Per-channel runtime state: the active set, the FIFO waiting queue, and each member's status.

use crate::client::MessageQueue;
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::time::Instant;
use tokio::sync::oneshot;

/// The lifecycle state of one member record.
///
/// `InQueue -> InChannel` on promotion, `InChannel -> Muted(t) -> InChannel` once `now >= t`, and
/// any state -> `Disconnected` (terminal) via [`crate::state::StateInner::disconnect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberStatus {
    InChannel,
    InQueue,
    Muted(InstantEq),
    Disconnected,
}

/// Wraps [`Instant`] with a bitwise `Eq`/`PartialEq`, since `Instant` does not implement them.
///
/// Only used so `MemberStatus` can derive equality in tests; deadline comparisons elsewhere use
/// `Instant::now() >= deadline` directly.
#[derive(Debug, Clone, Copy)]
pub struct InstantEq(pub Instant);

impl PartialEq for InstantEq {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl Eq for InstantEq {}

/// One seated or queued member.
pub struct MemberRecord {
    pub addr: SocketAddr,
    pub queue: MessageQueue,
    pub status: MemberStatus,
    /// Forces the connection's reader task to stop waiting on the socket. Only `/empty` uses
    /// this: unlike `/kick`, it closes the connection itself rather than waiting for the client
    /// to echo an acknowledgement.
    pub kill: Option<oneshot::Sender<()>>,
}

impl MemberRecord {
    pub fn new(addr: SocketAddr, queue: MessageQueue, status: MemberStatus, kill: oneshot::Sender<()>) -> Self {
        Self { addr, queue, status, kill: Some(kill) }
    }
}

/// Runtime state of one configured channel.
///
/// Invariants (enforced by [`crate::state::StateInner`], which is the only code allowed to mutate
/// this type): every username in `active` or `waiting` has a matching entry in `members`; no
/// username appears in both `active` and `waiting`; `active.len() <= capacity`; `waiting` is
/// non-empty only while `active.len() == capacity`.
#[derive(Default)]
pub struct ChannelState {
    pub active: Vec<String>,
    pub waiting: VecDeque<String>,
    pub members: HashMap<String, MemberRecord>,
}

impl ChannelState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_member(&self, user: &str) -> bool {
        self.members.contains_key(user)
    }

    pub fn position_in_queue(&self, user: &str) -> Option<usize> {
        self.waiting.iter().position(|u| u == user)
    }
}
