//! littleBits - analog I/O through the littleBits USB I/O module
//!
//! The USB I/O module appears to the host as a two-channel audio device.
//! This crate finds it by name and exposes blocking [`Reader`] and
//! [`Writer`] types that move interleaved 8-bit samples through a fixed-size
//! buffer, plus the pieces of a terminal oscilloscope built on top of them.
//!
//! Audio transport is delegated to cpal; everything here is lookup, buffer
//! management and stream lifecycle.

pub mod audio;
mod error;
mod io;
pub mod poller;
pub mod render;
pub mod settings;

pub use audio::{StreamState, DEFAULT_DEVICE_NAME};
pub use error::{Error, Result};
pub use io::{Reader, StreamOptions, Writer};
