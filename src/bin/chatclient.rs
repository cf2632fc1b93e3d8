//! `chatclient`: a companion binary implementing just enough of the wire protocol to interoperate
//! with `chatserver` and exercise it end-to-end, including the exact reply text for queue/join
//! notifications and the `$Joined` acknowledgement it echoes back once admitted.

use chat_proto::{classify, c2s, s2c, Record};
use chat_reader::LineReader;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader, WriteHalf};
use tokio::net::TcpStream;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (port, username) = match parse_args(&args) {
        Some(v) => v,
        None => {
            eprintln!("Usage: chatclient <port> <username>");
            std::process::exit(3);
        }
    };

    let stream = match TcpStream::connect(("127.0.0.1", port)).await {
        Ok(stream) => stream,
        Err(_) => {
            eprintln!("Error: Unable to connect to port {}.", port);
            std::process::exit(7);
        }
    };

    run(stream, &username).await;
}

/// `chatclient <port> <username>`: port `1024..65535`, username non-empty and whitespace-free.
fn parse_args(args: &[String]) -> Option<(u16, String)> {
    if args.len() != 2 {
        return None;
    }
    let port: u16 = args[0].parse().ok()?;
    if !(1024..=65535).contains(&port) {
        return None;
    }
    let username = args[1].clone();
    if username.is_empty() || username.chars().any(char::is_whitespace) {
        return None;
    }
    Some((port, username))
}

async fn run(stream: TcpStream, username: &str) {
    let (read_half, mut write_half) = io::split(stream);
    let mut reader = LineReader::new(read_half);
    let mut stdin = BufReader::new(io::stdin()).lines();

    if write_half.write_all(format!("${}{}\n", c2s::USER_PREFIX, username).as_bytes()).await.is_err() {
        std::process::exit(8);
    }

    loop {
        tokio::select! {
            record = reader.next_record() => {
                match record {
                    Ok(Some(bytes)) => {
                        let line = String::from_utf8_lossy(&bytes).into_owned();
                        if handle_server_record(&line, username, &mut write_half).await {
                            return;
                        }
                    }
                    Ok(None) | Err(_) => {
                        eprintln!("Error: server connection closed.");
                        std::process::exit(8);
                    }
                }
            }
            line = stdin.next_line() => {
                match line {
                    Ok(Some(text)) => {
                        if handle_user_input(&text, &mut write_half).await {
                            return;
                        }
                    }
                    Ok(None) | Err(_) => {
                        let _ = write_half.write_all(format!("${}\n", c2s::QUIT).as_bytes()).await;
                        return;
                    }
                }
            }
        }
    }
}

/// Returns `true` once the connection is done and `run` should stop.
async fn handle_server_record(line: &str, username: &str, write_half: &mut WriteHalf<TcpStream>) -> bool {
    match classify(line) {
        Record::Control(marker) => {
            if let Some(channel) = marker.strip_prefix(s2c::USER_ERROR_PREFIX) {
                println!("[Server Message] Channel \"{}\" already has user {}.", channel, username);
                std::process::exit(2);
            } else if let Some(channel) = marker.strip_prefix(s2c::USER_DUP_PREFIX) {
                // Same text as `$UserError`, but informational only: the connection this arrived
                // on stays open (the duplicate was in the *target* of `/switch`, not here).
                println!("[Server Message] Channel \"{}\" already has user {}.", channel, username);
            } else if let Some(channel) = marker.strip_prefix(s2c::JOIN_SUCCESS_1_PREFIX) {
                println!("Welcome to chatclient, {}.", username);
                println!("[Server Message] You have joined the channel \"{}\".", channel);
                let _ = write_half.write_all(format!("${}\n", c2s::JOINED).as_bytes()).await;
            } else if let Some(channel) = marker.strip_prefix(s2c::JOIN_SUCCESS_2_PREFIX) {
                println!("[Server Message] You have joined the channel \"{}\".", channel);
                let _ = write_half.write_all(format!("${}\n", c2s::JOINED).as_bytes()).await;
            } else if let Some(n) = marker.strip_prefix(s2c::IN_QUEUE_1_PREFIX) {
                println!("[Server Message] You are in the waiting queue and there are {} user(s) ahead of you.", n);
            } else if let Some(n) = marker.strip_prefix(s2c::IN_QUEUE_2_PREFIX) {
                // The `01`/`02` prefixes only gate the one-time "Welcome to chatclient" line
                // above; the queue-position text itself is identical either way.
                println!("[Server Message] You are in the waiting queue and there are {} user(s) ahead of you.", n);
            } else if marker == s2c::KICK {
                let _ = write_half.write_all(format!("${}\n", c2s::QUIT_KICKED).as_bytes()).await;
                println!("[Server Message] You are removed from the channel.");
                return true;
            } else if marker == s2c::EMPTY {
                println!("[Server Message] You are removed from the channel.");
                return true;
            } else if marker == s2c::AFK {
                // No message printed here: the server's own went-AFK broadcast already reached
                // everyone else, and this peer is about to disconnect anyway.
                return true;
            }
            false
        }
        // Display text (`[Server Message] ...`, `[<user>] ...`, `[Channel] ...`) arrives with no
        // `$`/`/` prefix and prints verbatim; the server never echoes a raw `/`-command back to a
        // peer, so `Record::Command` cannot occur here in practice, but is handled the same way.
        Record::Chat(text) | Record::Command(text) => {
            println!("{}", text);
            false
        }
    }
}

/// Returns `true` once the user has asked to quit and `run` should stop. A bare empty line means
/// quit, same as `/quit`.
async fn handle_user_input(text: &str, write_half: &mut WriteHalf<TcpStream>) -> bool {
    if text.is_empty() || text == "/quit" {
        let _ = write_half.write_all(format!("${}\n", c2s::QUIT).as_bytes()).await;
        return true;
    }
    if text == "/list" {
        let _ = write_half.write_all(format!("${}\n", c2s::LIST).as_bytes()).await;
        return false;
    }
    if text.starts_with("/switch ") || text.starts_with("/send ") || text.starts_with("/whisper ") {
        // Forwarded verbatim; the server performs its own arity validation on these.
        let _ = write_half.write_all(format!("{}\n", text).as_bytes()).await;
        return false;
    }
    if text.starts_with('/') || text.starts_with('$') {
        // An unrecognized command or a stray control marker the user typed by hand: neither
        // forwarded to the server nor echoed locally.
        return false;
    }
    let _ = write_half.write_all(format!("{}\n", text).as_bytes()).await;
    false
}
