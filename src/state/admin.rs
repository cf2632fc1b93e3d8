//! Handlers for admin-console commands (`/kick`, `/empty`, `/mute`). Arity and usage-text
//! validation happens in [`crate::admin`], which reads stdin; by the time a call reaches here the
//! arguments are already well-formed and only domain errors (no such channel, no such user) can
//! occur.

use super::{mute_deadline, StateInner};
use crate::lines;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminError {
    NoSuchChannel,
    NoSuchUser,
}

impl fmt::Display for AdminError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AdminError::NoSuchChannel => "no such channel",
            AdminError::NoSuchUser => "no such user",
        };
        f.write_str(s)
    }
}

impl StateInner {
    /// `/kick <channel> <user>`: logs the kick, and sends `$Kick` to the target. The target is
    /// expected to echo back `$Quit-kicked`, which drives the actual removal through
    /// [`StateInner::disconnect`]; the server does not forcibly close the connection itself.
    pub(crate) fn admin_kick(&mut self, channel: &str, user: &str) -> Result<(), AdminError> {
        let channel_index = self.table.index_of(channel).ok_or(AdminError::NoSuchChannel)?;
        if !self.channels[channel_index].active.iter().any(|u| u == user) {
            return Err(AdminError::NoSuchUser);
        }

        log::info!("{}", lines::kicked(user));
        self.send_to(channel_index, user, "$Kick".to_owned());
        Ok(())
    }

    /// `/empty <channel>`: force-disconnects every active member (sending `$Empty` and tripping
    /// each connection's kill switch), clears the active set, then promotes from the queue up to
    /// capacity.
    pub(crate) fn admin_empty(&mut self, channel: &str) -> Result<(), AdminError> {
        let channel_index = self.table.index_of(channel).ok_or(AdminError::NoSuchChannel)?;

        let members: Vec<String> = self.channels[channel_index].active.drain(..).collect();
        for user in &members {
            if let Some(mut member) = self.channels[channel_index].members.remove(user) {
                let _ = member.queue.send(crate::client::queue_item("$Empty"));
                if let Some(kill) = member.kill.take() {
                    let _ = kill.send(());
                }
                self.addr_index.remove(&member.addr);
            }
        }

        log::info!("{}", lines::emptied(channel));
        self.promote_waiting(channel_index);
        Ok(())
    }

    /// `/mute <channel> <user> <duration>`: mutes `user` for `duration` seconds. Chat from a
    /// muted user is suppressed by [`StateInner::cmd_chat`] until the deadline passes.
    pub(crate) fn admin_mute(&mut self, channel: &str, user: &str, duration: u64) -> Result<(), AdminError> {
        let channel_index = self.table.index_of(channel).ok_or(AdminError::NoSuchChannel)?;
        if !self.channels[channel_index].active.iter().any(|u| u == user) {
            return Err(AdminError::NoSuchUser);
        }

        if let Some(member) = self.channels[channel_index].members.get_mut(user) {
            member.status = mute_deadline(Duration::from_secs(duration));
        }

        log::info!("{}", lines::muted_log(user, duration));
        self.send_to(channel_index, user, lines::muted_self(duration));
        self.broadcast_excluding(channel_index, lines::muted_other(user, duration), user);
        Ok(())
    }
}
