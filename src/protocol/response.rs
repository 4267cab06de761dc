//! Response definitions
//!
//! Represents responses to clients.

use crate::error::{Result, SiltError};

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    /// Read or write succeeded
    Ok = 0x00,
    /// Key absent on GET or DELETE
    NotFound = 0x01,
    /// Server-side failure (message in payload)
    Error = 0x02,
    /// Request rejected before reaching the engine (message in payload)
    Invalid = 0x03,
}

impl Status {
    /// Decode a status byte
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0x00 => Ok(Status::Ok),
            0x01 => Ok(Status::NotFound),
            0x02 => Ok(Status::Error),
            0x03 => Ok(Status::Invalid),
            _ => Err(SiltError::Protocol(format!(
                "Unknown response status: 0x{:02x}",
                byte
            ))),
        }
    }
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Optional payload (value for GET/PUT, message for ERROR/INVALID)
    pub payload: Option<Vec<u8>>,
}

impl Response {
    /// Create an OK response with optional payload
    pub fn ok(payload: Option<Vec<u8>>) -> Self {
        Self {
            status: Status::Ok,
            payload,
        }
    }

    /// Create a NOT_FOUND response
    pub fn not_found() -> Self {
        Self {
            status: Status::NotFound,
            payload: None,
        }
    }

    /// Create an ERROR response
    pub fn error(message: &str) -> Self {
        Self {
            status: Status::Error,
            payload: Some(message.as_bytes().to_vec()),
        }
    }

    /// Create an INVALID response
    pub fn invalid(message: &str) -> Self {
        Self {
            status: Status::Invalid,
            payload: Some(message.as_bytes().to_vec()),
        }
    }

    /// Payload bytes, empty when absent
    pub fn body(&self) -> &[u8] {
        self.payload.as_deref().unwrap_or(&[])
    }
}
