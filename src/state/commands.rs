//! Handlers for user commands issued by a connected client: `/list` is handled directly by
//! [`super::StateInner::list`]; everything else (`/switch`, `/send`, `/whisper`, plain chat) lives
//! here, one handler per verb.

use super::{resolve_mute, StateInner};
use crate::channel::MemberStatus;
use crate::lines;
use std::fmt;
use std::net::SocketAddr;

/// Returned by command handlers purely for logging; every outcome already sent its own reply (or
/// intentionally sent none), so callers do not branch on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    NotIdentified,
    NoSuchChannel,
    DuplicateInTarget,
    NotInChannel,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl StateInner {
    /// A plain chat line from `addr`. Broadcasts if the sender is seated and unmuted, replies
    /// with the remaining mute time if muted, and is silently dropped if the sender is still
    /// queued.
    pub(crate) fn cmd_chat(&mut self, addr: &SocketAddr, line: &str) {
        let (username, channel_index) = match self.identify(addr) {
            Some(v) => v,
            None => return,
        };

        let status = match self.channels[channel_index].members.get(&username) {
            Some(member) => member.status,
            None => return,
        };

        match status {
            MemberStatus::InQueue => {}
            MemberStatus::Muted(_) => {
                let mut status = status;
                match resolve_mute(&mut status) {
                    Some(remaining) => {
                        self.send_to(channel_index, &username, lines::still_muted(remaining));
                    }
                    None => {
                        if let Some(member) = self.channels[channel_index].members.get_mut(&username) {
                            member.status = MemberStatus::InChannel;
                        }
                        self.broadcast(channel_index, lines::chat(&username, line));
                    }
                }
            }
            MemberStatus::InChannel => {
                self.broadcast(channel_index, lines::chat(&username, line));
            }
            MemberStatus::Disconnected => {}
        }
    }

    /// `/switch <target>`: validates the target channel exists and that the caller's username is
    /// not already taken there. The server does not itself migrate the connection; the
    /// client is expected to reconnect to the target's port.
    pub(crate) fn cmd_switch(&mut self, addr: &SocketAddr, target: &str) -> Result<(), CommandError> {
        let (username, channel_index) = self.identify(addr).ok_or(CommandError::NotIdentified)?;

        let target_index = match self.table.index_of(target) {
            Some(i) => i,
            None => {
                self.send_to(channel_index, &username, lines::no_such_channel(target));
                return Err(CommandError::NoSuchChannel);
            }
        };

        if self.channels[target_index].is_member(&username) {
            self.send_to(channel_index, &username, format!("$UserDup: {}", target));
            return Err(CommandError::DuplicateInTarget);
        }

        Ok(())
    }

    /// `/send <user> <path>`: validates the target is an active member of the same channel.
    /// Payload transport is out of scope; only the framing and target check exist here.
    pub(crate) fn cmd_send(&mut self, addr: &SocketAddr, target: &str, _path: &str) -> Result<(), CommandError> {
        let (username, channel_index) = self.identify(addr).ok_or(CommandError::NotIdentified)?;

        if !self.channels[channel_index].active.iter().any(|u| u == target) {
            self.send_to(channel_index, &username, lines::not_in_channel(target));
            return Err(CommandError::NotInChannel);
        }

        Ok(())
    }

    /// `/whisper <user> <text>`. Whispering to oneself only echoes locally (no broadcast, no
    /// server-sink duplicate); whispering to a non-member of the same channel is an error;
    /// otherwise both parties are notified and the whisper is logged to the server sink.
    pub(crate) fn cmd_whisper(&mut self, addr: &SocketAddr, target: &str, text: &str) -> Result<(), CommandError> {
        let (username, channel_index) = self.identify(addr).ok_or(CommandError::NotIdentified)?;

        if target == username {
            self.send_to(channel_index, &username, lines::whisper_to_you(&username, text));
            return Ok(());
        }

        if !self.channels[channel_index].active.iter().any(|u| u == target) {
            self.send_to(channel_index, &username, lines::not_in_channel(target));
            return Err(CommandError::NotInChannel);
        }

        log::info!("{}", lines::whisper_to(&username, target, text));
        self.send_to(channel_index, target, lines::whisper_to_you(&username, text));
        self.send_to(channel_index, &username, lines::whisper_to(&username, target, text));
        Ok(())
    }
}
