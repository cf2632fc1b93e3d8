//! Centralizes the exact display text sent to clients and printed on the server sink.
//!
//! Every other module builds a record by calling one of these functions rather than formatting a
//! `"[Server Message] ..."` string inline, so the exact wording lives in one place instead of
//! being scattered across the command handlers.

pub fn joined(user: &str, channel: &str) -> String {
    format!("[Server Message] {} has joined the channel \"{}\".", user, channel)
}

pub fn left(user: &str) -> String {
    format!("[Server Message] {} has left the channel.", user)
}

pub fn went_afk(user: &str, channel: &str) -> String {
    format!("[Server Message] {} went AFK in channel \"{}\".", user, channel)
}

pub fn no_such_channel(target: &str) -> String {
    format!("[Server Message] Channel \"{}\" does not exist.", target)
}

pub fn not_in_channel(user: &str) -> String {
    format!("[Server Message] {} is not in the channel.", user)
}

pub fn whisper_to_you(from: &str, text: &str) -> String {
    format!("[{} whispers to you] {}", from, text)
}

pub fn whisper_to(from: &str, to: &str, text: &str) -> String {
    format!("[{} whispers to {}] {}", from, to, text)
}

pub fn chat(from: &str, text: &str) -> String {
    format!("[{}] {}", from, text)
}

pub fn still_muted(remaining: u64) -> String {
    format!("[Server Message] You are still in mute for {} seconds.", remaining)
}

pub fn muted_self(duration: u64) -> String {
    format!("[Server Message] You have been muted for {} seconds.", duration)
}

pub fn muted_other(user: &str, duration: u64) -> String {
    format!("[Server Message] {} has been muted for {} seconds.", user, duration)
}

pub fn muted_log(user: &str, duration: u64) -> String {
    format!("[Server Message] Muted {} for {} seconds.", user, duration)
}

pub fn kicked(user: &str) -> String {
    format!("[Server Message] Kicked {}.", user)
}

pub fn emptied(channel: &str) -> String {
    format!("[Server Message] \"{}\" has been emptied.", channel)
}

pub fn shuts_down() -> &'static str {
    "[Server Message] Server shuts down."
}

pub fn channel_created(name: &str, port: u16, capacity: usize) -> String {
    format!("Channel \"{}\" is created on port {}, with a capacity of {}.", name, port, capacity)
}

pub const WELCOME: &str = "Welcome to chatserver.";

pub fn list_entry(name: &str, port: u16, used: usize, capacity: usize, queue_len: usize) -> String {
    format!("[Channel] {} {} Capacity: {}/{}, Queue: {}", name, port, used, capacity, queue_len)
}

pub fn usage(what: &str) -> String {
    format!("Usage: {}", what)
}
