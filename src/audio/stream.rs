//! Stream lifecycle tracking
//!
//! Native streams have three states:
//!
//! ```text
//! Stopped --start--> Started --stop--> Stopped
//!    |                  |
//!    +------close-------+-----> Closed (terminal)
//! ```
//!
//! [`Transport`] wraps a [`SampleStream`] and rejects transfers unless the
//! stream is started. A stream that was never started is never stopped or
//! closed on the native side; it is simply dropped.

use std::fmt;

use super::backend::SampleStream;
use crate::error::{Error, Result};

/// Lifecycle state of a stream
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamState {
    Stopped,
    Started,
    Closed,
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamState::Stopped => f.write_str("stopped"),
            StreamState::Started => f.write_str("started"),
            StreamState::Closed => f.write_str("closed"),
        }
    }
}

/// A native stream plus its lifecycle state.
pub struct Transport<S: SampleStream> {
    stream: S,
    state: StreamState,
    /// Set once `start` succeeded; gates the native `close` call
    started_once: bool,
}

impl<S: SampleStream> Transport<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            state: StreamState::Stopped,
            started_once: false,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn start(&mut self) -> Result<()> {
        self.expect_state("start", StreamState::Stopped)?;
        self.stream.start()?;
        self.state = StreamState::Started;
        self.started_once = true;
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        self.expect_state("stop", StreamState::Started)?;
        self.stream.stop()?;
        self.state = StreamState::Stopped;
        Ok(())
    }

    /// Stop if needed, then close. The state is `Closed` afterwards even if
    /// the backend reported an error, since the stream cannot be reused.
    pub fn close(&mut self) -> Result<()> {
        if self.state == StreamState::Closed {
            return Err(Error::InvalidState {
                operation: "close",
                state: StreamState::Closed,
            });
        }

        let stopped = if self.state == StreamState::Started {
            self.stream.stop()
        } else {
            Ok(())
        };
        self.state = StreamState::Closed;

        if !self.started_once {
            return stopped;
        }
        let closed = self.stream.close();
        stopped.and(closed)
    }

    /// Fill all of `buf`, calling the backend until it is full.
    pub fn read_full(&mut self, buf: &mut [u8]) -> Result<()> {
        self.expect_state("read from", StreamState::Started)?;
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.stream.read(&mut buf[filled..])?;
            if n == 0 {
                return Err(Error::Backend(format!(
                    "stream delivered {} of {} bytes",
                    filled,
                    buf.len()
                )));
            }
            filled += n;
        }
        Ok(())
    }

    /// Hand all of `buf` to the backend.
    pub fn write_full(&mut self, buf: &[u8]) -> Result<()> {
        self.expect_state("write to", StreamState::Started)?;
        let mut sent = 0;
        while sent < buf.len() {
            let n = self.stream.write(&buf[sent..])?;
            if n == 0 {
                return Err(Error::Backend(format!(
                    "stream accepted {} of {} bytes",
                    sent,
                    buf.len()
                )));
            }
            sent += n;
        }
        Ok(())
    }

    fn expect_state(&self, operation: &'static str, expected: StreamState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::InvalidState {
                operation,
                state: self.state,
            })
        }
    }
}

impl<S: SampleStream> Drop for Transport<S> {
    fn drop(&mut self) {
        if self.state == StreamState::Closed {
            return;
        }
        if let Err(e) = self.close() {
            log::warn!("Failed to release stream: {}", e);
        }
    }
}
