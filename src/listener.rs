//! One listening task per configured channel port, barrier-synchronized so that no accept loop
//! begins servicing connections until every port has bound successfully, rather than relying on a
//! busy-wait over a ports-ready counter.

use crate::config::ChannelTable;
use crate::connection;
use crate::lines;
use crate::state::State;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Barrier};

/// Binds every channel's port, prints the per-channel "created" line plus the one-time welcome
/// line once every port has bound, then drives the accept loops until the process is terminated
/// by `/shutdown` or SIGINT; this function does not return on its own.
pub async fn run(table: ChannelTable, state: State, afk_time: Duration) {
    let channel_count = table.len();
    let table = Arc::new(table);
    // `run` itself is a party to the barrier, alongside the `channel_count` listener tasks, so
    // that its own `wait()` below (reached only after the welcome line is printed) is the thing
    // that releases every accept loop — not just the last listener task to bind.
    let barrier = Arc::new(Barrier::new(channel_count + 1));
    let (ready_tx, mut ready_rx) = mpsc::unbounded_channel();

    let mut tasks = Vec::with_capacity(channel_count);
    for channel_index in 0..channel_count {
        let table = Arc::clone(&table);
        let state = state.clone();
        let barrier = Arc::clone(&barrier);
        let ready_tx = ready_tx.clone();
        tasks.push(tokio::spawn(async move {
            let descriptor = table.get(channel_index).expect("channel index in range").clone();
            let listener = match TcpListener::bind(("0.0.0.0", descriptor.port)).await {
                Ok(listener) => listener,
                Err(_) => {
                    eprintln!("Error: unable to listen on port {}.", descriptor.port);
                    std::process::exit(6);
                }
            };
            let _ = ready_tx.send(descriptor.clone());
            barrier.wait().await;
            accept_loop(listener, channel_index, &descriptor.name, state, afk_time).await;
        }));
    }
    drop(ready_tx);

    // Serialization across listener tasks isn't required: print each "created" line as its
    // bind reports in, then the one-time welcome line once all of them have.
    for _ in 0..channel_count {
        match ready_rx.recv().await {
            Some(descriptor) => log::info!(
                "{}",
                lines::channel_created(&descriptor.name, descriptor.port, descriptor.capacity)
            ),
            None => break,
        }
    }
    log::info!("{}", lines::WELCOME);
    barrier.wait().await;

    for task in tasks {
        let _ = task.await;
    }
}

async fn accept_loop(
    listener: TcpListener,
    channel_index: usize,
    channel_name: &str,
    state: State,
    afk_time: Duration,
) {
    loop {
        match listener.accept().await {
            Ok((socket, addr)) => {
                let state = state.clone();
                let channel_name = channel_name.to_owned();
                tokio::spawn(async move {
                    connection::handle(socket, addr, channel_index, channel_name, state, afk_time).await;
                });
            }
            Err(err) => {
                log::warn!("accept error on channel index {}: {}", channel_index, err);
            }
        }
    }
}
