//! The per-connection protocol engine.
//!
//! One task drives the read side (the state machine below); a second, much smaller task drains
//! this connection's [`MessageQueue`] onto the socket's write half. Splitting read and write this
//! way means the Notify Service never needs to wait on a peer's socket while holding the store's
//! lock: it only ever pushes onto an in-process channel, and the owning connection's writer task
//! is the only thing that ever touches that peer's socket for writes.

use crate::client::{queue_item, MessageQueue, MessageQueueItem};
use crate::state::{Admission, State};
use chat_proto::{classify, single_spaced, Record};
use chat_reader::LineReader;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{self, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

/// Drives one accepted connection to completion: admission, the chat/command loop, and eventual
/// disconnect. Never panics on peer I/O errors; every failure path degrades to closing this one
/// connection.
pub async fn handle(
    socket: TcpStream,
    addr: SocketAddr,
    channel_index: usize,
    channel_name: String,
    state: State,
    afk_time: Duration,
) {
    let (read_half, write_half) = io::split(socket);
    let (tx, rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_loop(write_half, rx));

    run(read_half, addr, channel_index, &channel_name, &state, afk_time, tx).await;

    // Dropping our own clone of `tx` happens when `run` returns; once every clone (ours and the
    // one handed to the store on admission) is gone, `write_loop` drains the rest of the queue
    // and exits on its own.
    let _ = writer.await;
}

async fn write_loop(mut write_half: WriteHalf<TcpStream>, mut rx: mpsc::UnboundedReceiver<MessageQueueItem>) {
    while let Some(item) = rx.recv().await {
        if write_half.write_all(item.as_bytes()).await.is_err() {
            break;
        }
    }
}

async fn run(
    read_half: ReadHalf<TcpStream>,
    addr: SocketAddr,
    channel_index: usize,
    channel_name: &str,
    state: &State,
    afk_time: Duration,
    tx: MessageQueue,
) {
    let mut reader = LineReader::new(read_half);

    let username = match await_hello(&mut reader, afk_time).await {
        Some(username) => username,
        None => return,
    };

    let (kill_tx, mut kill_rx) = oneshot::channel();
    match state.admit(addr, channel_index, &username, tx.clone(), kill_tx).await {
        Admission::Duplicate => {
            let _ = tx.send(queue_item(format!("${}{}", chat_proto::s2c::USER_ERROR_PREFIX, channel_name)));
            return;
        }
        Admission::Seated => {
            let _ = tx.send(queue_item(format!("${}{}", chat_proto::s2c::JOIN_SUCCESS_1_PREFIX, channel_name)));
        }
        Admission::Queued(n) => {
            let _ = tx.send(queue_item(format!("${}{}", chat_proto::s2c::IN_QUEUE_1_PREFIX, n)));
        }
    }

    loop {
        let outcome = tokio::select! {
            res = timeout(afk_time, reader.next_record()) => Outcome::Read(res),
            _ = &mut kill_rx => Outcome::Killed,
        };

        let bytes = match outcome {
            Outcome::Killed => return,
            Outcome::Read(Err(_elapsed)) => {
                state.afk(&addr).await;
                return;
            }
            Outcome::Read(Ok(Ok(None))) => {
                state.abrupt(&addr).await;
                return;
            }
            Outcome::Read(Ok(Err(_io_err))) => {
                state.abrupt(&addr).await;
                return;
            }
            Outcome::Read(Ok(Ok(Some(bytes)))) => bytes,
        };

        let line = String::from_utf8_lossy(&bytes).into_owned();
        match classify(&line) {
            Record::Control(marker) => match marker {
                chat_proto::c2s::QUIT => {
                    state.quit(&addr, false).await;
                    return;
                }
                chat_proto::c2s::QUIT_KICKED => {
                    state.quit(&addr, true).await;
                    return;
                }
                chat_proto::c2s::LIST => {
                    let mut out = Vec::new();
                    state.list(&mut out).await;
                    for entry in out {
                        let _ = tx.send(queue_item(entry));
                    }
                }
                chat_proto::c2s::JOINED => {
                    // Inert client -> server acknowledgement; parsed and ignored.
                }
                _ => {}
            },
            Record::Command(rest) => dispatch_command(rest, &addr, state).await,
            Record::Chat(text) => state.chat(&addr, text).await,
        }
    }
}

enum Outcome {
    Read(Result<io::Result<Option<Vec<u8>>>, tokio::time::error::Elapsed>),
    Killed,
}

/// Waits for the mandatory `$User: <name>` record. Any other first record, EOF, or idle timeout
/// before it arrives closes the connection without ever touching the state store.
async fn await_hello(reader: &mut LineReader<ReadHalf<TcpStream>>, afk_time: Duration) -> Option<String> {
    let bytes = match timeout(afk_time, reader.next_record()).await {
        Ok(Ok(Some(bytes))) => bytes,
        _ => return None,
    };
    let line = String::from_utf8_lossy(&bytes).into_owned();
    match classify(&line) {
        Record::Control(marker) => marker
            .strip_prefix(chat_proto::c2s::USER_PREFIX)
            .map(|name| name.trim().to_owned())
            .filter(|name| !name.is_empty()),
        _ => None,
    }
}

/// Dispatches `/switch`, `/send` and `/whisper`, the only user commands the wire protocol
/// carries verbatim (`/list` and `/quit` are translated client-side into `$List`/`$Quit` before
/// being sent).
async fn dispatch_command(rest: &str, addr: &SocketAddr, state: &State) {
    if let Some(parts) = single_spaced(rest, 2) {
        if parts[0] == "switch" {
            state.switch(addr, parts[1]).await;
            return;
        }
    }
    if let Some(parts) = single_spaced(rest, 3) {
        match parts[0] {
            "send" => {
                state.send_file(addr, parts[1], parts[2]).await;
                return;
            }
            "whisper" => {
                state.whisper(addr, parts[1], parts[2]).await;
                return;
            }
            _ => {}
        }
    }
    // Malformed or unrecognized command: a conforming client validates arity before sending, so
    // this path is only reached by a non-conforming peer; ignore it silently.
}
