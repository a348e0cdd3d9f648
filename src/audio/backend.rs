//! Seam between the Reader/Writer and a native audio library.
//!
//! The native library owns device enumeration and sample transport. This
//! module only describes what the rest of the crate needs from it:
//! - [`AudioBackend`]: list devices, open a stream on one of them
//! - [`SampleStream`]: start/stop/close plus blocking byte transfers
//!
//! Streams carry interleaved 8-bit samples; the channel layout is whatever
//! the device exposes (two channels on the littleBits USB I/O module).

use std::fmt;

use crate::error::Result;

/// Which way samples flow through a stream
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Hardware to host (module in "out" mode)
    Input,
    /// Host to hardware (module in "in" mode)
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => f.write_str("input"),
            Direction::Output => f.write_str("output"),
        }
    }
}

/// An enumerated device: display name, capabilities and the backend handle.
pub struct DeviceInfo<D> {
    pub name: String,
    pub max_input_channels: u16,
    pub max_output_channels: u16,
    pub handle: D,
}

impl<D> fmt::Debug for DeviceInfo<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceInfo")
            .field("name", &self.name)
            .field("max_input_channels", &self.max_input_channels)
            .field("max_output_channels", &self.max_output_channels)
            .finish_non_exhaustive()
    }
}

/// A native audio library able to enumerate devices and open streams.
pub trait AudioBackend {
    /// Opaque device reference
    type Device;
    /// Stream type produced by [`AudioBackend::open_stream`]
    type Stream: SampleStream;

    /// All devices known to the backend, in backend-defined order.
    fn devices(&self) -> Result<Vec<DeviceInfo<Self::Device>>>;

    /// Open a stopped stream on `device` able to move at least
    /// `buffer_size` bytes per transfer.
    fn open_stream(
        &self,
        device: &DeviceInfo<Self::Device>,
        direction: Direction,
        buffer_size: usize,
    ) -> Result<Self::Stream>;
}

/// An opened stream. Lifecycle rules are enforced by
/// [`Transport`](super::Transport), so implementations can assume calls
/// arrive in a valid order.
pub trait SampleStream {
    fn start(&mut self) -> Result<()>;
    fn stop(&mut self) -> Result<()>;
    fn close(&mut self) -> Result<()>;

    /// Block until some bytes are available and copy them into `buf`.
    ///
    /// Returns the number of bytes copied, which may be less than
    /// `buf.len()`. Returning `Ok(0)` for a non-empty `buf` means the
    /// backend has nothing more to give.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Block until the backend accepts some of `buf`; returns how many
    /// bytes were taken.
    fn write(&mut self, buf: &[u8]) -> Result<usize>;
}
