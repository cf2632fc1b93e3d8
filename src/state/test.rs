//! Testing utilities for `chatserver::state`: a small `simple_state`/`join`/`collect` harness for
//! exercising admission, promotion, mute sequencing, and disconnect directly against `StateInner`
//! without standing up real sockets.

use super::{Admission, DisconnectReason, StateInner};
use crate::client::MessageQueueItem;
use crate::config::{ChannelDescriptor, ChannelTable};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

type Queue = mpsc::UnboundedReceiver<MessageQueueItem>;

fn table() -> ChannelTable {
    ChannelTable::from_descriptors(vec![
        ChannelDescriptor { name: "lobby".to_owned(), port: 9000, capacity: 2 },
        ChannelDescriptor { name: "gym".to_owned(), port: 9001, capacity: 1 },
    ])
}

fn simple_state() -> StateInner {
    StateInner::new(table())
}

fn addr(n: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], n))
}

fn join(
    state: &mut StateInner,
    port: u16,
    channel_index: usize,
    username: &str,
) -> (Admission, Queue) {
    let (tx, rx) = mpsc::unbounded_channel();
    let (kill, _kill_rx) = oneshot::channel();
    let outcome = state.admit(addr(port), channel_index, username, tx, kill);
    (outcome, rx)
}

/// Like [`join`], but also hands back the kill-switch receiver, for tests that need to observe
/// `/empty` force-closing a connection rather than waiting for a client-echoed disconnect.
fn join_with_kill(
    state: &mut StateInner,
    port: u16,
    channel_index: usize,
    username: &str,
) -> (Admission, Queue, oneshot::Receiver<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let (kill, kill_rx) = oneshot::channel();
    let outcome = state.admit(addr(port), channel_index, username, tx, kill);
    (outcome, rx, kill_rx)
}

fn collect(queue: &mut Queue) -> Vec<String> {
    let mut out = Vec::new();
    loop {
        match queue.try_recv() {
            Ok(item) => out.push(item.as_ref().trim_end().to_owned()),
            Err(mpsc::error::TryRecvError::Empty) => return out,
            Err(mpsc::error::TryRecvError::Disconnected) => return out,
        }
    }
}

#[test]
fn capacity_one_second_client_queues() {
    let mut state = simple_state();
    let (out1, mut q1) = join(&mut state, 1, 1, "alice");
    assert_eq!(out1, Admission::Seated);
    assert_eq!(collect(&mut q1), vec!["[Server Message] alice has joined the channel \"gym\"."]);

    let (out2, _q2) = join(&mut state, 2, 1, "bob");
    assert_eq!(out2, Admission::Queued(0));
}

#[test]
fn promotion_on_departure_is_fifo() {
    let mut state = simple_state();
    let (_, mut q_alice) = join(&mut state, 1, 1, "alice");
    let (_, mut q_bob) = join(&mut state, 2, 1, "bob");

    state.disconnect(&addr(1), DisconnectReason::Quit);

    let bob_msgs = collect(&mut q_bob);
    assert!(bob_msgs.iter().any(|m| m == "$02-JoinSuccess: gym"));
    // alice's own queue received nothing further after she left.
    assert!(collect(&mut q_alice).is_empty());
}

#[test]
fn duplicate_username_in_same_channel_is_rejected() {
    let mut state = simple_state();
    let (out1, _q1) = join(&mut state, 1, 0, "alice");
    assert_eq!(out1, Admission::Seated);

    let (tx, _rx) = mpsc::unbounded_channel();
    let (kill, _kill_rx) = oneshot::channel();
    let outcome = state.admit(addr(2), 0, "alice", tx, kill);
    assert_eq!(outcome, Admission::Duplicate);
}

#[test]
fn disconnect_is_idempotent() {
    let mut state = simple_state();
    let (_, mut q) = join(&mut state, 1, 0, "alice");
    collect(&mut q);

    state.disconnect(&addr(1), DisconnectReason::Quit);
    let first = collect(&mut q);
    state.disconnect(&addr(1), DisconnectReason::Quit);
    let second = collect(&mut q);

    assert!(second.is_empty(), "a second disconnect must not broadcast again: {:?}", first);
}

#[test]
fn whisper_to_self_does_not_broadcast() {
    let mut state = simple_state();
    let (_, mut q) = join(&mut state, 1, 0, "alice");
    collect(&mut q);

    state.cmd_whisper(&addr(1), "alice", "hi").unwrap();
    let msgs = collect(&mut q);
    assert_eq!(msgs, vec!["[alice whispers to you] hi"]);
}

#[test]
fn mute_suppresses_chat_until_deadline() {
    let mut state = simple_state();
    let (_, mut q) = join(&mut state, 1, 0, "alice");
    collect(&mut q);

    state.admin_mute("lobby", "alice", 5).unwrap();
    collect(&mut q);

    state.cmd_chat(&addr(1), "hello");
    let msgs = collect(&mut q);
    assert_eq!(msgs.len(), 1);
    assert!(msgs[0].starts_with("[Server Message] You are still in mute for"));
}

#[test]
fn mute_expires_and_chat_resumes() {
    let mut state = simple_state();
    let (_, mut q) = join(&mut state, 1, 0, "alice");
    collect(&mut q);

    state.admin_mute("lobby", "alice", 0).unwrap();
    collect(&mut q);
    // A zero-second mute's deadline is already in the past by the time we check it.
    std::thread::sleep(Duration::from_millis(5));

    state.cmd_chat(&addr(1), "hello");
    let msgs = collect(&mut q);
    assert_eq!(msgs, vec!["[alice] hello"]);
}

#[test]
fn list_reports_active_and_queue_counts() {
    let mut state = simple_state();
    let (_, mut q1) = join(&mut state, 1, 1, "alice");
    collect(&mut q1);
    let (_, mut q2) = join(&mut state, 2, 1, "bob");
    collect(&mut q2);

    let mut out = Vec::new();
    state.list(&mut out);
    assert!(out.iter().any(|l| l.contains("gym") && l.contains("Capacity: 1/1") && l.contains("Queue: 1")));
}

#[test]
fn kick_removes_member_and_sends_kick_marker() {
    let mut state = simple_state();
    let (_, mut q_alice) = join(&mut state, 1, 0, "alice");
    collect(&mut q_alice);
    let (_, mut q_bob) = join(&mut state, 2, 0, "bob");
    collect(&mut q_bob);

    state.admin_kick("lobby", "bob").unwrap();
    assert_eq!(collect(&mut q_bob), vec!["$Kick"]);

    // `/kick` only sends the marker; removal happens once the target echoes `$Quit-kicked`,
    // which the connection handler turns into this disconnect call.
    state.disconnect(&addr(2), DisconnectReason::Kicked);
    let alice_msgs = collect(&mut q_alice);
    assert!(alice_msgs.iter().any(|m| m == "[Server Message] bob has left the channel."));

    let mut out = Vec::new();
    state.list(&mut out);
    assert!(out[0].contains("Capacity: 1/2"), "bob should no longer be seated: {:?}", out);
}

#[test]
fn empty_force_disconnects_and_promotes_waiters() {
    let mut state = simple_state();
    let (_, mut q_alice, kill_alice) = join_with_kill(&mut state, 1, 0, "alice");
    collect(&mut q_alice);
    let (_, mut q_bob, _kill_bob) = join_with_kill(&mut state, 2, 0, "bob");
    collect(&mut q_bob);
    let (out_carol, mut q_carol) = join(&mut state, 3, 0, "carol");
    assert_eq!(out_carol, Admission::Queued(0));

    state.admin_empty("lobby").unwrap();

    assert_eq!(collect(&mut q_alice), vec!["$Empty"]);
    assert_eq!(collect(&mut q_bob), vec!["$Empty"]);
    assert!(kill_alice.try_recv().is_ok(), "the kill switch should fire on /empty");

    let carol_msgs = collect(&mut q_carol);
    assert!(carol_msgs.iter().any(|m| m == "$02-JoinSuccess: lobby"));

    let mut out = Vec::new();
    state.list(&mut out);
    assert!(out[0].contains("Capacity: 1/2"), "only carol should be promoted back in: {:?}", out);
}

#[test]
fn chat_from_queued_member_is_dropped() {
    let mut state = simple_state();
    let (_, mut q1) = join(&mut state, 1, 1, "alice");
    collect(&mut q1);
    let (_, mut q2) = join(&mut state, 2, 1, "bob");
    collect(&mut q2);

    state.cmd_chat(&addr(2), "hello");
    assert!(collect(&mut q2).is_empty());
    assert!(collect(&mut q1).is_empty());
}
