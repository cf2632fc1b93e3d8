//! Command-line arguments and the channel-table configuration file.
//!
//! Parsing here is deliberately not delegated to a crate: the grammar is a handful of
//! whitespace-split fields with specific numeric ranges, and getting the exact rejection message
//! and exit code right matters more than generality. A bespoke line format gets a bespoke reader
//! rather than a pulled-in config-file crate.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

/// One configured channel: its name, the TCP port it listens on, and its seat capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelDescriptor {
    pub name: String,
    pub port: u16,
    pub capacity: usize,
}

/// The immutable, load-time-validated list of channels the server hosts.
///
/// Read-only after [`ChannelTable::load`] returns; every component that needs the channel list
/// (listeners, the state store, `/list`) holds a `Clone` of this (cheap: it is just descriptors,
/// no runtime state).
#[derive(Debug, Clone)]
pub struct ChannelTable {
    channels: Vec<ChannelDescriptor>,
}

impl ChannelTable {
    /// Builds a table directly from descriptors, bypassing file parsing. Used by tests and by
    /// anything that already has a vetted channel list in hand.
    pub fn from_descriptors(channels: Vec<ChannelDescriptor>) -> Self {
        Self { channels }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelDescriptor> {
        self.channels.iter()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ChannelDescriptor> {
        self.channels.get(index)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.channels.iter().position(|c| c.name == name)
    }

    /// Parses the configuration file at `path`.
    ///
    /// Grammar, one record per line: `channel <name> <port> <capacity>`, split on whitespace.
    /// `name` matches `[A-Za-z0-9_]+`, `port` is `1024..65535`, `capacity` is `1..8`. Names and
    /// ports must be unique across the file, and the file must contain at least one such line.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(Path::new(path)).map_err(|_| ConfigError)?;

        let mut channels = Vec::new();
        let mut seen_names = HashSet::new();
        let mut seen_ports = HashSet::new();

        for line in text.lines() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.is_empty() {
                continue;
            }
            let descriptor = parse_line(&fields, &seen_names, &seen_ports)?;
            seen_names.insert(descriptor.name.clone());
            seen_ports.insert(descriptor.port);
            channels.push(descriptor);
        }

        if channels.is_empty() {
            return Err(ConfigError);
        }

        Ok(Self { channels })
    }
}

fn parse_line(
    fields: &[&str],
    seen_names: &HashSet<String>,
    seen_ports: &HashSet<u16>,
) -> Result<ChannelDescriptor, ConfigError> {
    if fields.len() != 4 || fields[0] != "channel" {
        return Err(ConfigError);
    }

    let name = fields[1];
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ConfigError);
    }

    let port: u16 = fields[2].parse().map_err(|_| ConfigError)?;
    let capacity: usize = fields[3].parse().map_err(|_| ConfigError)?;

    if !(1024..=65535).contains(&port) || !(1..=8).contains(&capacity) {
        return Err(ConfigError);
    }
    if seen_names.contains(name) || seen_ports.contains(&port) {
        return Err(ConfigError);
    }

    Ok(ChannelDescriptor { name: name.to_owned(), port, capacity })
}

/// The configuration file did not match the grammar above. Callers print
/// `Error: Invalid configuration file.` to stderr and exit with code 5.
#[derive(Debug)]
pub struct ConfigError;

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Invalid configuration file.")
    }
}

impl std::error::Error for ConfigError {}

/// Parsed command-line invocation of the server: `chatserver [afk_time] config_file`.
pub struct Cli {
    pub afk_time: u64,
    pub config_path: String,
}

const DEFAULT_AFK_TIME: u64 = 100;

/// Parses `argv[1..]`. Callers print `Usage: chatserver [afk_time] config_file` to stderr and
/// exit with code 4 on `Err`.
pub fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Cli, UsageError> {
    let args: Vec<String> = args.into_iter().collect();

    let (afk_time, config_path) = match args.len() {
        1 => (DEFAULT_AFK_TIME, args[0].clone()),
        2 => {
            let afk_time: u64 = args[0].parse().map_err(|_| UsageError)?;
            if !(1..=1000).contains(&afk_time) {
                return Err(UsageError);
            }
            (afk_time, args[1].clone())
        }
        _ => return Err(UsageError),
    };

    if config_path.is_empty() {
        return Err(UsageError);
    }

    Ok(Cli { afk_time, config_path })
}

/// Malformed invocation. See [`parse_args`].
#[derive(Debug)]
pub struct UsageError;

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Usage: chatserver [afk_time] config_file")
    }
}

impl std::error::Error for UsageError {}

#[cfg(test)]
mod test {
    use super::*;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        use std::io::Write;
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn loads_well_formed_file() {
        let f = write_temp("channel lobby 9000 2\nchannel gym 9001 1\n");
        let table = ChannelTable::load(f.path().to_str().unwrap()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0).unwrap().name, "lobby");
        assert_eq!(table.get(1).unwrap().capacity, 1);
    }

    #[test]
    fn rejects_duplicate_name() {
        let f = write_temp("channel lobby 9000 2\nchannel lobby 9001 1\n");
        assert!(ChannelTable::load(f.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn rejects_duplicate_port() {
        let f = write_temp("channel lobby 9000 2\nchannel gym 9000 1\n");
        assert!(ChannelTable::load(f.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn rejects_out_of_range_port_and_capacity() {
        let f = write_temp("channel lobby 80 2\n");
        assert!(ChannelTable::load(f.path().to_str().unwrap()).is_err());

        let f = write_temp("channel lobby 9000 9\n");
        assert!(ChannelTable::load(f.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn rejects_malformed_line() {
        let f = write_temp("lobby 9000 2\n");
        assert!(ChannelTable::load(f.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn rejects_empty_file() {
        let f = write_temp("");
        assert!(ChannelTable::load(f.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn args_default_afk_time() {
        let cli = parse_args(vec!["chat.conf".to_owned()]).unwrap();
        assert_eq!(cli.afk_time, DEFAULT_AFK_TIME);
        assert_eq!(cli.config_path, "chat.conf");
    }

    #[test]
    fn args_explicit_afk_time() {
        let cli = parse_args(vec!["42".to_owned(), "chat.conf".to_owned()]).unwrap();
        assert_eq!(cli.afk_time, 42);
    }

    #[test]
    fn args_reject_out_of_range_afk_time() {
        assert!(parse_args(vec!["0".to_owned(), "chat.conf".to_owned()]).is_err());
        assert!(parse_args(vec!["1001".to_owned(), "chat.conf".to_owned()]).is_err());
    }
}
