//! Command definitions
//!
//! Represents commands from clients.

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    Get = 0x01,
    Set = 0x02,
    Remove = 0x03,
    List = 0x04,
    CacheStatus = 0x05,
    Ping = 0x06,
    Cleanup = 0x07,
}

impl CommandType {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(CommandType::Get),
            0x02 => Some(CommandType::Set),
            0x03 => Some(CommandType::Remove),
            0x04 => Some(CommandType::List),
            0x05 => Some(CommandType::CacheStatus),
            0x06 => Some(CommandType::Ping),
            0x07 => Some(CommandType::Cleanup),
            _ => None,
        }
    }
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Get a value by key
    Get { key: Vec<u8> },

    /// Insert or overwrite a key
    Set { key: Vec<u8>, value: Vec<u8> },

    /// Remove a key
    Remove { key: Vec<u8> },

    /// Every record on disk
    List,

    /// Snapshot of the cache
    CacheStatus,

    /// Ping (health check)
    Ping,

    /// Drop duplicate keys from the record file
    Cleanup,
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Get { .. } => CommandType::Get,
            Command::Set { .. } => CommandType::Set,
            Command::Remove { .. } => CommandType::Remove,
            Command::List => CommandType::List,
            Command::CacheStatus => CommandType::CacheStatus,
            Command::Ping => CommandType::Ping,
            Command::Cleanup => CommandType::Cleanup,
        }
    }
}
