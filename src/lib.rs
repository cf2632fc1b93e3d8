//! `chatserver`: a multi-channel, line-oriented chat service.
//!
//! The crate root just re-exports the pieces `src/main.rs` wires together; the interesting code
//! lives in [`state`] (the shared channel store), [`connection`] (the per-client protocol engine)
//! and [`listener`]/[`admin`] (the two kinds of task that drive the store).

pub mod admin;
pub mod channel;
pub mod client;
pub mod config;
pub mod connection;
pub mod lines;
pub mod listener;
pub mod state;

pub use config::{ChannelTable, Cli};
pub use state::State;
