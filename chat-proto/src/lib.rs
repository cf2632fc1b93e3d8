//! Record classification for the chat wire protocol.
//!
//! The wire protocol has exactly one piece of framing (`\n`) and one piece of routing: the first
//! byte of a record. A record beginning with `$` is a control marker, one beginning with `/` is a
//! user command, and everything else is a plain chat line. This crate owns that one decision so
//! that every reader of a record (the connection handler, the admin console, tests) agrees on it
//! instead of re-deriving the rule at each call site.

/// A single newline-terminated record, classified by its leading byte.
///
/// The payload of each variant has its trailing `\r`/`\n` stripped but is otherwise unparsed:
/// splitting `/kick lobby bob` into its arguments is the handler's job, not the codec's, because
/// the arity rules differ per command (see `chatserver::connection` and `chatserver::admin`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record<'a> {
    /// Everything after the leading `$`, e.g. `"User: alice"`, `"Quit"`, `"List"`.
    Control(&'a str),
    /// Everything after the leading `/`, e.g. `"list"`, `"switch lobby"`.
    Command(&'a str),
    /// A plain chat line, including an empty one.
    Chat(&'a str),
}

/// Strips a trailing `\n` and an optional preceding `\r` from a raw record.
pub fn strip_newline(record: &str) -> &str {
    let s = record.strip_suffix('\n').unwrap_or(record);
    s.strip_suffix('\r').unwrap_or(s)
}

/// Classifies a record (with its framing already stripped by the caller, if at all; leading or
/// trailing whitespace around the marker byte is never produced by `chat-reader`, so none is
/// stripped here).
pub fn classify(record: &str) -> Record<'_> {
    let line = strip_newline(record);
    if let Some(rest) = line.strip_prefix('$') {
        Record::Control(rest)
    } else if let Some(rest) = line.strip_prefix('/') {
        Record::Command(rest)
    } else {
        Record::Chat(line)
    }
}

/// Splits `s` on single ASCII spaces and returns the parts only if there are exactly `n` of them
/// and none is empty: exactly one space between each pair of arguments and none elsewhere. This is
/// why `/whisper alice hello there` is rejected rather than treating `hello there` as one argument;
/// multi-word whisper text isn't supported.
pub fn single_spaced(s: &str, n: usize) -> Option<Vec<&str>> {
    let parts: Vec<&str> = s.split(' ').collect();
    if parts.len() == n && parts.iter().all(|p| !p.is_empty()) {
        Some(parts)
    } else {
        None
    }
}

/// Control markers sent client -> server.
pub mod c2s {
    pub const USER_PREFIX: &str = "User: ";
    pub const QUIT: &str = "Quit";
    pub const QUIT_KICKED: &str = "Quit-kicked";
    pub const LIST: &str = "List";
    pub const JOINED: &str = "Joined";
}

/// Control markers sent server -> client.
pub mod s2c {
    pub const USER_ERROR_PREFIX: &str = "UserError: ";
    pub const USER_DUP_PREFIX: &str = "UserDup: ";
    pub const JOIN_SUCCESS_1_PREFIX: &str = "01-JoinSuccess: ";
    pub const JOIN_SUCCESS_2_PREFIX: &str = "02-JoinSuccess: ";
    pub const IN_QUEUE_1_PREFIX: &str = "01-InQueue: ";
    pub const IN_QUEUE_2_PREFIX: &str = "02-InQueue: ";
    pub const KICK: &str = "Kick";
    pub const EMPTY: &str = "Empty";
    pub const AFK: &str = "AFK";
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn classifies_control() {
        assert_eq!(classify("$User: alice\n"), Record::Control("User: alice"));
        assert_eq!(classify("$Quit\n"), Record::Control("Quit"));
        assert_eq!(classify("$Joined\r\n"), Record::Control("Joined"));
    }

    #[test]
    fn classifies_command() {
        assert_eq!(classify("/list\n"), Record::Command("list"));
        assert_eq!(classify("/switch lobby\n"), Record::Command("switch lobby"));
    }

    #[test]
    fn classifies_chat_including_empty() {
        assert_eq!(classify("hello\n"), Record::Chat("hello"));
        assert_eq!(classify("\n"), Record::Chat(""));
    }

    #[test]
    fn single_spaced_rejects_extra_whitespace() {
        assert_eq!(single_spaced("alice hello", 2), Some(vec!["alice", "hello"]));
        assert_eq!(single_spaced("alice hello there", 2), None);
        assert_eq!(single_spaced("alice  hello", 2), None);
    }
}
