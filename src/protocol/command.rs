//! Command definitions
//!
//! Requests a client can send to the server.

use crate::error::{Result, SiltError};

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    Get = 0x01,
    Put = 0x02,
    Delete = 0x03,
    Ping = 0x04,
}

impl TryFrom<u8> for CommandType {
    type Error = SiltError;

    fn try_from(byte: u8) -> Result<Self> {
        match byte {
            0x01 => Ok(CommandType::Get),
            0x02 => Ok(CommandType::Put),
            0x03 => Ok(CommandType::Delete),
            0x04 => Ok(CommandType::Ping),
            _ => Err(SiltError::Protocol(format!(
                "Unknown command type: 0x{:02x}",
                byte
            ))),
        }
    }
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Read a value by key
    Get { key: Vec<u8> },

    /// Write a value under a key
    Put { key: Vec<u8>, value: Vec<u8> },

    /// Delete a key
    Delete { key: Vec<u8> },

    /// Ping (health check)
    Ping,
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Get { .. } => CommandType::Get,
            Command::Put { .. } => CommandType::Put,
            Command::Delete { .. } => CommandType::Delete,
            Command::Ping => CommandType::Ping,
        }
    }

    /// Key carried by the command, if any
    pub fn key(&self) -> Option<&[u8]> {
        match self {
            Command::Get { key } | Command::Put { key, .. } | Command::Delete { key } => Some(key),
            Command::Ping => None,
        }
    }

    /// Reject well-framed but unusable requests before they reach the engine
    pub fn validate(&self) -> Result<()> {
        match self.key() {
            Some(key) if key.is_empty() => Err(SiltError::InvalidRequest(
                "key must not be empty".to_string(),
            )),
            _ => Ok(()),
        }
    }
}
