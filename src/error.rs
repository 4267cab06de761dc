//! Error types for SiltKV
//!
//! Provides a unified error type for all operations. A missing key is never
//! an error: lookups return `Option` and deletes return `bool`.

use thiserror::Error;

/// Result type alias using SiltError
pub type Result<T> = std::result::Result<T, SiltError>;

/// Unified error type for SiltKV operations
#[derive(Debug, Error)]
pub enum SiltError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Segment error: {0}")]
    Segment(String),

    #[error("Manifest error: {0}")]
    Manifest(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Server error: {0}")]
    Server(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<bincode::Error> for SiltError {
    fn from(e: bincode::Error) -> Self {
        SiltError::Serialization(e.to_string())
    }
}
