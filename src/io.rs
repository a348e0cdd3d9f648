//! Reader and Writer for the littleBits USB I/O module.
//!
//! The module shows up as an ordinary two-channel audio device. Put it in
//! "out" mode to read a circuit's signal with a [`Reader`], or in "in" mode
//! to drive a circuit with a [`Writer`]. Both own a fixed-size buffer that
//! is reused for every transfer and bounds how much a single call can move.
//!
//! ```no_run
//! use littlebits::audio::CpalBackend;
//! use littlebits::Reader;
//!
//! let backend = CpalBackend::new(None)?;
//! let mut reader = Reader::open(&backend, "", 1024)?;
//! let mut frame = [0u8; 64];
//! reader.read(&mut frame)?;
//! reader.close()?;
//! # Ok::<(), littlebits::Error>(())
//! ```

use std::io;

use crate::audio::{locate, AudioBackend, Direction, StreamState, Transport};
use crate::error::{Error, Result};

/// Options for opening a Reader or Writer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamOptions {
    /// Bytes in the reused transfer buffer; upper bound for one call
    pub buffer_size: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self { buffer_size: 1024 }
    }
}

/// Locate the device, open a stream on it and start it.
///
/// If `start` fails the stream is dropped without being stopped or closed.
fn open_started<B: AudioBackend>(
    backend: &B,
    name: &str,
    direction: Direction,
    options: StreamOptions,
) -> Result<(Transport<B::Stream>, String)> {
    if options.buffer_size == 0 {
        return Err(Error::InvalidBufferSize);
    }

    let device = locate(backend, name)?;
    let stream = backend.open_stream(&device, direction, options.buffer_size)?;
    let mut transport = Transport::new(stream);
    transport.start()?;
    Ok((transport, device.name))
}

fn check_capacity(requested: usize, capacity: usize) -> Result<()> {
    if requested > capacity {
        return Err(Error::TransferTooLarge {
            requested,
            capacity,
        });
    }
    Ok(())
}

/// Reads interleaved samples from a USB I/O module.
pub struct Reader<B: AudioBackend> {
    transport: Transport<B::Stream>,
    buf: Vec<u8>,
    device: String,
}

impl<B: AudioBackend> Reader<B> {
    /// Open and start a Reader on the first device whose name contains
    /// `name` (empty for the default module name), with a `buffer_size`
    /// byte transfer buffer.
    pub fn open(backend: &B, name: &str, buffer_size: usize) -> Result<Self> {
        Self::open_with(backend, name, StreamOptions { buffer_size })
    }

    pub fn open_with(backend: &B, name: &str, options: StreamOptions) -> Result<Self> {
        let (transport, device) = open_started(backend, name, Direction::Input, options)?;
        Ok(Self {
            transport,
            buf: vec![0; options.buffer_size],
            device,
        })
    }

    /// Fill `dest` from the module.
    ///
    /// Blocks until the backend delivers one full buffer, then copies its
    /// first `dest.len()` bytes. Returns `dest.len()` on success; there are
    /// no short reads. `dest` is untouched on error.
    pub fn read(&mut self, dest: &mut [u8]) -> Result<usize> {
        check_capacity(dest.len(), self.buf.len())?;
        if dest.is_empty() {
            return Ok(0);
        }

        self.transport.read_full(&mut self.buf)?;
        dest.copy_from_slice(&self.buf[..dest.len()]);
        Ok(dest.len())
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn device_name(&self) -> &str {
        &self.device
    }

    pub fn state(&self) -> StreamState {
        self.transport.state()
    }

    /// Stop and close the stream, releasing the buffer.
    pub fn close(mut self) -> Result<()> {
        self.transport.close()
    }
}

impl<B: AudioBackend> io::Read for Reader<B> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(Reader::read(self, buf)?)
    }
}

/// Writes interleaved samples to a USB I/O module.
pub struct Writer<B: AudioBackend> {
    transport: Transport<B::Stream>,
    buf: Vec<u8>,
    device: String,
}

impl<B: AudioBackend> Writer<B> {
    /// Open and start a Writer; see [`Reader::open`] for the arguments.
    pub fn open(backend: &B, name: &str, buffer_size: usize) -> Result<Self> {
        Self::open_with(backend, name, StreamOptions { buffer_size })
    }

    pub fn open_with(backend: &B, name: &str, options: StreamOptions) -> Result<Self> {
        let (transport, device) = open_started(backend, name, Direction::Output, options)?;
        Ok(Self {
            transport,
            buf: vec![0; options.buffer_size],
            device,
        })
    }

    /// Send `source` to the module, blocking until the backend accepts it.
    ///
    /// Fails if `source` is larger than the buffer. Returns `source.len()`.
    pub fn write(&mut self, source: &[u8]) -> Result<usize> {
        check_capacity(source.len(), self.buf.len())?;
        if source.is_empty() {
            return Ok(0);
        }

        let staged = &mut self.buf[..source.len()];
        staged.copy_from_slice(source);
        self.transport.write_full(staged)?;
        Ok(source.len())
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn device_name(&self) -> &str {
        &self.device
    }

    pub fn state(&self) -> StreamState {
        self.transport.state()
    }

    pub fn close(mut self) -> Result<()> {
        self.transport.close()
    }
}

impl<B: AudioBackend> io::Write for Writer<B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(Writer::write(self, buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
