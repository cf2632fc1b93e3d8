//! Shared state and the API connection handlers and the admin console use to mutate it.
//!
//! `mod.rs` holds the public API, the admission/notify/disconnect machinery, and the send
//! utilities; `commands.rs` holds the handlers for the in-channel user commands (`/list`,
//! `/switch`, `/send`, `/whisper`, plain chat); `admin.rs` holds the handlers for the
//! admin-console commands (`/kick`, `/empty`, `/mute`).

use crate::channel::{ChannelState, InstantEq, MemberRecord, MemberStatus};
use crate::client::{queue_item, MessageQueue};
use crate::config::ChannelTable;
use crate::lines;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, Mutex};

mod admin;
mod commands;
#[cfg(test)]
mod test;

pub use admin::AdminError;
pub use commands::CommandError;

/// Why a connection went away. Threaded through [`StateInner::disconnect`] so the right leave
/// notice (or none) gets broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    Quit,
    Kicked,
    Empty,
    Afk,
    Abrupt,
}

/// The outcome of [`State::admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The username was already taken in this channel.
    Duplicate,
    /// Seated directly.
    Seated,
    /// Queued, with `n` users ahead.
    Queued(usize),
}

/// A handle to a connection's kill switch, given to the state store alongside its
/// [`MessageQueue`] so that `/empty` can force-close a connection rather than wait for the client
/// to cooperate (unlike `/kick`, which relies on the client echoing `$Quit-kicked`).
pub type KillSwitch = oneshot::Sender<()>;

/// State of the chat network: the channel table (read-only) plus the mutable per-channel runtime
/// state and the address index, all behind one lock.
///
/// This is just an `Arc` to the real data, so it is cheap to clone and every clone shares the
/// same underlying store.
#[derive(Clone)]
pub struct State(Arc<Mutex<StateInner>>);

impl State {
    pub fn new(table: ChannelTable) -> Self {
        Self(Arc::new(Mutex::new(StateInner::new(table))))
    }

    /// Admits `username` into the channel at `channel_index`.
    pub async fn admit(
        &self,
        addr: SocketAddr,
        channel_index: usize,
        username: &str,
        queue: MessageQueue,
        kill: KillSwitch,
    ) -> Admission {
        self.0.lock().await.admit(addr, channel_index, username, queue, kill)
    }

    /// Renders `/list`-style records for every configured channel onto `out`.
    pub async fn list(&self, out: &mut Vec<String>) {
        self.0.lock().await.list(out);
    }

    /// Dispatches a plain chat line from `addr`.
    pub async fn chat(&self, addr: &SocketAddr, line: &str) {
        self.0.lock().await.cmd_chat(addr, line);
    }

    /// Dispatches `/switch <target>`.
    pub async fn switch(&self, addr: &SocketAddr, target: &str) {
        let _ = self.0.lock().await.cmd_switch(addr, target);
    }

    /// Dispatches `/send <user> <path>`.
    pub async fn send_file(&self, addr: &SocketAddr, target: &str, path: &str) {
        let _ = self.0.lock().await.cmd_send(addr, target, path);
    }

    /// Dispatches `/whisper <user> <text>`.
    pub async fn whisper(&self, addr: &SocketAddr, target: &str, text: &str) {
        let _ = self.0.lock().await.cmd_whisper(addr, target, text);
    }

    /// The peer sent `$Quit` or `$Quit-kicked`.
    pub async fn quit(&self, addr: &SocketAddr, kicked: bool) {
        let reason = if kicked { DisconnectReason::Kicked } else { DisconnectReason::Quit };
        self.0.lock().await.disconnect(addr, reason);
    }

    /// The peer's idle deadline elapsed.
    pub async fn afk(&self, addr: &SocketAddr) {
        self.0.lock().await.afk(addr);
    }

    /// The peer's socket errored or hit EOF without a `$Quit`.
    pub async fn abrupt(&self, addr: &SocketAddr) {
        self.0.lock().await.disconnect(addr, DisconnectReason::Abrupt);
    }

    /// `/kick <channel> <user>`.
    pub async fn admin_kick(&self, channel: &str, user: &str) -> Result<(), AdminError> {
        self.0.lock().await.admin_kick(channel, user)
    }

    /// `/empty <channel>`.
    pub async fn admin_empty(&self, channel: &str) -> Result<(), AdminError> {
        self.0.lock().await.admin_empty(channel)
    }

    /// `/mute <channel> <user> <duration>`.
    pub async fn admin_mute(&self, channel: &str, user: &str, duration: u64) -> Result<(), AdminError> {
        self.0.lock().await.admin_mute(channel, user, duration)
    }
}

/// The actual shared data (state) of the chat server.
pub(crate) struct StateInner {
    table: ChannelTable,
    channels: Vec<ChannelState>,
    /// Maps a connected peer's address to the channel it is in and the username it registered
    /// with, so a handler can recover its identity after the initial `$User:` record.
    addr_index: HashMap<SocketAddr, (String, usize)>,
}

impl StateInner {
    fn new(table: ChannelTable) -> Self {
        let channels = table.iter().map(|_| ChannelState::new()).collect();
        Self { table, channels, addr_index: HashMap::new() }
    }

    fn channel_name(&self, index: usize) -> &str {
        &self.table.get(index).expect("channel index in range").name
    }

    /// Looks up the caller's `(username, channel_index)` from its address. Returns `None` if the
    /// connection already disconnected (idempotent no-op for every caller).
    fn identify(&self, addr: &SocketAddr) -> Option<(String, usize)> {
        self.addr_index.get(addr).cloned()
    }

    // --- Admission ----------------------------------------------------------------------------

    fn admit(
        &mut self,
        addr: SocketAddr,
        channel_index: usize,
        username: &str,
        queue: MessageQueue,
        kill: KillSwitch,
    ) -> Admission {
        let channel = &mut self.channels[channel_index];
        if channel.is_member(username) {
            return Admission::Duplicate;
        }

        self.addr_index.insert(addr, (username.to_owned(), channel_index));
        let channel = &mut self.channels[channel_index];
        let capacity = self.table.get(channel_index).expect("channel index in range").capacity;

        if channel.active.len() < capacity {
            channel.active.push(username.to_owned());
            channel.members.insert(
                username.to_owned(),
                MemberRecord::new(addr, queue, MemberStatus::InChannel, kill),
            );
            let name = self.channel_name(channel_index).to_owned();
            self.broadcast(channel_index, lines::joined(username, &name));
            Admission::Seated
        } else {
            let position = channel.waiting.len();
            channel.waiting.push_back(username.to_owned());
            channel.members.insert(
                username.to_owned(),
                MemberRecord::new(addr, queue, MemberStatus::InQueue, kill),
            );
            Admission::Queued(position)
        }
    }

    // --- Notify Service -----------------------------------------------------------------------

    /// Sends `msg` to every active member of `channel_index` and logs it to the server sink.
    fn broadcast(&self, channel_index: usize, msg: String) {
        log::info!("{}", msg);
        let item = queue_item(msg);
        let channel = &self.channels[channel_index];
        for user in &channel.active {
            if let Some(member) = channel.members.get(user) {
                let _ = member.queue.send(item.clone());
            }
        }
    }

    /// Like [`Self::broadcast`], but skips `excluded` and does not echo to the server sink (the
    /// caller has already logged it itself).
    fn broadcast_excluding(&self, channel_index: usize, msg: String, excluded: &str) {
        let item = queue_item(msg);
        let channel = &self.channels[channel_index];
        for user in &channel.active {
            if user == excluded {
                continue;
            }
            if let Some(member) = channel.members.get(user) {
                let _ = member.queue.send(item.clone());
            }
        }
    }

    /// Sends every waiter at or after `from_pos` their new (post-departure) queue position.
    fn notify_queue_from(&self, channel_index: usize, from_pos: usize) {
        let channel = &self.channels[channel_index];
        for (position, user) in channel.waiting.iter().enumerate().skip(from_pos) {
            if let Some(member) = channel.members.get(user) {
                let _ = member.queue.send(queue_item(format!("$02-InQueue: {}", position)));
            }
        }
    }

    /// Sends `msg` to one member directly, bypassing broadcast.
    fn send_to(&self, channel_index: usize, user: &str, msg: String) {
        let channel = &self.channels[channel_index];
        if let Some(member) = channel.members.get(user) {
            let _ = member.queue.send(queue_item(msg));
        }
    }

    /// Promotes waiters into empty seats, in FIFO order, until the channel is full or the queue
    /// is empty. Used by [`Self::disconnect`] (one seat at a time) and `/empty` (many seats at
    /// once after the active set was cleared).
    fn promote_waiting(&mut self, channel_index: usize) {
        let name = self.channel_name(channel_index).to_owned();
        let capacity = self.table.get(channel_index).expect("channel index in range").capacity;
        loop {
            let channel = &mut self.channels[channel_index];
            if channel.active.len() >= capacity {
                break;
            }
            let promoted = match channel.waiting.pop_front() {
                Some(user) => user,
                None => break,
            };
            channel.active.push(promoted.clone());
            if let Some(member) = channel.members.get_mut(&promoted) {
                member.status = MemberStatus::InChannel;
                let _ = member.queue.send(queue_item(format!("$02-JoinSuccess: {}", name)));
            }
            self.broadcast(channel_index, lines::joined(&promoted, &name));
        }
    }

    // --- Disconnect ---------------------------------------------------------------------------

    /// Idempotent: a connection whose address is no longer in `addr_index` has already been
    /// disconnected (by a previous call, or because admission never touched the store for it),
    /// and this is a no-op.
    fn disconnect(&mut self, addr: &SocketAddr, reason: DisconnectReason) {
        let (username, channel_index) = match self.addr_index.remove(addr) {
            Some(v) => v,
            None => return,
        };

        let status = match self.channels[channel_index].members.get(&username) {
            Some(member) => member.status,
            None => return,
        };
        self.channels[channel_index].members.remove(&username);

        match status {
            MemberStatus::InChannel | MemberStatus::Muted(_) => {
                self.channels[channel_index].active.retain(|u| u != &username);
                if !matches!(reason, DisconnectReason::Afk | DisconnectReason::Empty) {
                    self.broadcast(channel_index, lines::left(&username));
                }
                self.promote_waiting(channel_index);
            }
            MemberStatus::InQueue => {
                if let Some(position) = self.channels[channel_index].position_in_queue(&username) {
                    self.channels[channel_index].waiting.remove(position);
                    self.notify_queue_from(channel_index, position);
                }
            }
            MemberStatus::Disconnected => {}
        }
    }

    fn afk(&mut self, addr: &SocketAddr) {
        let (username, channel_index) = match self.identify(addr) {
            Some(v) => v,
            None => return,
        };
        let name = self.channel_name(channel_index).to_owned();
        self.broadcast_excluding(channel_index, lines::went_afk(&username, &name), &username);
        self.send_to(channel_index, &username, "$AFK".to_owned());
        self.disconnect(addr, DisconnectReason::Afk);
    }

    // --- /list -------------------------------------------------------------------------------

    fn list(&self, out: &mut Vec<String>) {
        for (index, descriptor) in self.table.iter().enumerate() {
            let channel = &self.channels[index];
            out.push(lines::list_entry(
                &descriptor.name,
                descriptor.port,
                channel.active.len(),
                descriptor.capacity,
                channel.waiting.len(),
            ));
        }
    }
}

/// Lazily resolves a mute: if the deadline has passed, flips the member back to `InChannel` and
/// returns `None` (not muted anymore); otherwise returns the remaining whole seconds.
fn resolve_mute(status: &mut MemberStatus) -> Option<u64> {
    if let MemberStatus::Muted(InstantEq(deadline)) = *status {
        let now = Instant::now();
        if now >= deadline {
            *status = MemberStatus::InChannel;
            None
        } else {
            Some((deadline - now).as_secs().max(1))
        }
    } else {
        None
    }
}

fn mute_deadline(duration: Duration) -> MemberStatus {
    MemberStatus::Muted(InstantEq(Instant::now() + duration))
}
