//! Protocol errors

use thiserror::Error;

use crate::commands::Command;

/// Errors that can occur during camera communication.
///
/// Every variant is recoverable from the caller's side: a `Desync` or
/// `Timeout` can be answered with [`crate::Camera::reset`] to realign the
/// link, or by abandoning the session.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Serial port error: {0}")]
    Serial(String),

    #[error("Response deadline exceeded")]
    Timeout,

    #[error("Device desync on {command:?}: expected {expected:02x?}, got {observed:02x?}")]
    Desync {
        command: Command,
        expected: Vec<u8>,
        observed: Vec<u8>,
    },

    #[error("Boot banner line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    #[error("Chunk size {0} is not a positive multiple of 8")]
    InvalidChunkSize(usize),

    #[error("No capture in progress")]
    NotCapturing,

    #[error("Chunk buffer too small: need {need} bytes, got {got}")]
    BufferTooSmall { need: usize, got: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
