//! Error type shared by the device locator, streams and Reader/Writer.

use crate::audio::StreamState;

/// Errors produced while locating a device or moving samples.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No enumerated device name contains the requested pattern.
    #[error("no littleBits USB I/O found matching '{0}'")]
    DeviceNotFound(String),

    /// A read or write asked for more bytes than the fixed buffer holds.
    #[error("transfer of {requested} bytes exceeds buffer capacity of {capacity} bytes")]
    TransferTooLarge { requested: usize, capacity: usize },

    /// Failure reported by the native audio backend, message kept as-is.
    #[error("audio backend error: {0}")]
    Backend(String),

    /// The audio backend itself could not be initialized.
    #[error("failed to initialize audio backend: {0}")]
    Init(String),

    /// A Reader or Writer was requested with a zero-byte buffer.
    #[error("buffer size must be greater than zero")]
    InvalidBufferSize,

    /// Stream operation attempted in a state that does not allow it.
    #[error("cannot {operation} a {state} stream")]
    InvalidState {
        operation: &'static str,
        state: StreamState,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<cpal::DevicesError> for Error {
    fn from(e: cpal::DevicesError) -> Self {
        Error::Backend(e.to_string())
    }
}

impl From<cpal::DeviceNameError> for Error {
    fn from(e: cpal::DeviceNameError) -> Self {
        Error::Backend(e.to_string())
    }
}

impl From<cpal::DefaultStreamConfigError> for Error {
    fn from(e: cpal::DefaultStreamConfigError) -> Self {
        Error::Backend(e.to_string())
    }
}

impl From<cpal::BuildStreamError> for Error {
    fn from(e: cpal::BuildStreamError) -> Self {
        Error::Backend(e.to_string())
    }
}

impl From<cpal::PlayStreamError> for Error {
    fn from(e: cpal::PlayStreamError) -> Self {
        Error::Backend(e.to_string())
    }
}

impl From<cpal::PauseStreamError> for Error {
    fn from(e: cpal::PauseStreamError) -> Self {
        Error::Backend(e.to_string())
    }
}

impl From<Error> for std::io::Error {
    fn from(e: Error) -> Self {
        std::io::Error::other(e)
    }
}
