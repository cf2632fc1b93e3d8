//! The admin console: reads administrative commands from the server's standard input and
//! mutates the shared [`State`] through the exact same API connection handlers use. It reuses
//! `chat-reader`'s line framing and `chat-proto`'s classifier, so the console is just another
//! caller of the one parser (see the module docs in `state/mod.rs`) rather than growing its own
//! separate input-parsing path.

use crate::lines;
use crate::state::State;
use chat_proto::{classify, single_spaced, Record};
use chat_reader::LineReader;
use tokio::io;

const USAGE: &str = "/shutdown | /kick <channel> <user> | /empty <channel> | /mute <channel> <user> <duration>";

/// Runs until `/shutdown`, a bare empty line, or EOF on stdin terminates the process. Never
/// returns otherwise.
pub async fn run(state: State) {
    let mut reader = LineReader::new(io::stdin());
    loop {
        let bytes = match reader.next_record().await {
            Ok(Some(bytes)) => bytes,
            Ok(None) | Err(_) => shutdown(),
        };
        let line = String::from_utf8_lossy(&bytes).into_owned();
        match classify(&line) {
            Record::Chat(rest) if rest.is_empty() => shutdown(),
            Record::Command(rest) => dispatch(rest, &state).await,
            _ => println!("{}", lines::usage(USAGE)),
        }
    }
}

async fn dispatch(rest: &str, state: &State) {
    let mut parts = rest.splitn(2, ' ');
    let cmd = parts.next().unwrap_or("");
    let args = parts.next().unwrap_or("");

    match cmd {
        "shutdown" => {
            if args.is_empty() {
                shutdown();
            } else {
                println!("{}", lines::usage("/shutdown"));
            }
        }
        "kick" => match single_spaced(args, 2) {
            Some(p) => {
                if let Err(err) = state.admin_kick(p[0], p[1]).await {
                    log::warn!("/kick {} {}: {}", p[0], p[1], err);
                }
            }
            None => println!("{}", lines::usage("/kick <channel> <user>")),
        },
        "empty" => {
            let channel = args.trim();
            if channel.is_empty() || channel.contains(' ') {
                println!("{}", lines::usage("/empty <channel>"));
            } else if let Err(err) = state.admin_empty(channel).await {
                log::warn!("/empty {}: {}", channel, err);
            }
        }
        "mute" => match single_spaced(args, 3) {
            Some(p) => match p[2].parse::<u64>() {
                Ok(duration) if duration >= 1 => {
                    if let Err(err) = state.admin_mute(p[0], p[1], duration).await {
                        log::warn!("/mute {} {} {}: {}", p[0], p[1], duration, err);
                    }
                }
                _ => println!("{}", lines::usage("/mute <channel> <user> <duration>")),
            },
            None => println!("{}", lines::usage("/mute <channel> <user> <duration>")),
        },
        _ => println!("{}", lines::usage(USAGE)),
    }
}

/// `/kick` and `/mute` validate arity in [`dispatch`] and domain facts (channel exists, user is
/// active) inside the store; a domain failure makes no state change and is logged rather than
/// printed, since the "Usage: ..." line is reserved for malformed syntax, not a stale target.
fn shutdown() -> ! {
    println!("{}", lines::shuts_down());
    std::process::exit(0);
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::{ChannelDescriptor, ChannelTable};

    fn table() -> ChannelTable {
        ChannelTable::from_descriptors(vec![ChannelDescriptor {
            name: "lobby".to_owned(),
            port: 9000,
            capacity: 2,
        }])
    }

    #[tokio::test]
    async fn kick_unknown_channel_makes_no_state_change() {
        let state = State::new(table());
        dispatch("kick nosuch bob", &state).await;
        // No panic, no mutation: the channel table is untouched and bob was never admitted.
        let mut out = Vec::new();
        state.list(&mut out).await;
        assert!(out[0].contains("Capacity: 0/2"));
    }

    #[tokio::test]
    async fn mute_rejects_non_positive_duration() {
        let state = State::new(table());
        // Arity is fine but "0" fails the positive-integer check; this must not panic.
        dispatch("mute lobby bob 0", &state).await;
    }
}
