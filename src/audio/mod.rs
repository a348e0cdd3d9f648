//! Audio module - device lookup and sample transport
//!
//! This module provides:
//! - Backend traits and the cpal implementation
//! - Device lookup by name
//! - Stream lifecycle tracking
//! - The shared sample series used for visualization

mod backend;
mod buffer;
mod cpal_backend;
mod locator;
mod stream;

#[cfg(test)]
pub(crate) mod mock;

// Re-export public types
pub use backend::{AudioBackend, DeviceInfo, Direction, SampleStream};
pub use buffer::{deinterleave, SampleSeries};
pub use cpal_backend::{CpalBackend, CpalStream, DEFAULT_TRANSFER_TIMEOUT};
pub use locator::{locate, DEFAULT_DEVICE_NAME};
pub use stream::{StreamState, Transport};
