//! Scripted in-memory backend for unit tests.
//!
//! Streams share one state block with the backend, so tests can inspect
//! lifecycle calls after the stream has moved into a Reader or Writer.
//! Reads are served from scripted results first, then from the loopback
//! buffer that writes append to.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::backend::{AudioBackend, DeviceInfo, Direction, SampleStream};
use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Calls {
    pub open: usize,
    pub start: usize,
    pub stop: usize,
    pub close: usize,
    pub read: usize,
    pub write: usize,
}

#[derive(Default)]
struct State {
    calls: Calls,
    reads: VecDeque<Result<Vec<u8>>>,
    loopback: VecDeque<u8>,
    fail_start: bool,
    fail_open: bool,
}

#[derive(Clone)]
pub struct MockBackend {
    names: Vec<String>,
    state: Arc<Mutex<State>>,
}

impl MockBackend {
    pub fn new(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
            state: Arc::default(),
        }
    }

    pub fn calls(&self) -> Calls {
        self.state.lock().unwrap().calls
    }

    pub fn script_read(&self, result: Result<Vec<u8>>) {
        self.state.lock().unwrap().reads.push_back(result);
    }

    pub fn fail_start(&self) {
        self.state.lock().unwrap().fail_start = true;
    }

    pub fn fail_open(&self) {
        self.state.lock().unwrap().fail_open = true;
    }
}

impl AudioBackend for MockBackend {
    type Device = usize;
    type Stream = MockStream;

    fn devices(&self) -> Result<Vec<DeviceInfo<usize>>> {
        Ok(self
            .names
            .iter()
            .enumerate()
            .map(|(i, name)| DeviceInfo {
                name: name.clone(),
                max_input_channels: 2,
                max_output_channels: 2,
                handle: i,
            })
            .collect())
    }

    fn open_stream(
        &self,
        _device: &DeviceInfo<usize>,
        _direction: Direction,
        _buffer_size: usize,
    ) -> Result<MockStream> {
        let mut state = self.state.lock().unwrap();
        state.calls.open += 1;
        if state.fail_open {
            return Err(Error::Backend("open refused".to_string()));
        }
        Ok(MockStream {
            state: Arc::clone(&self.state),
        })
    }
}

pub struct MockStream {
    state: Arc<Mutex<State>>,
}

impl SampleStream for MockStream {
    fn start(&mut self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.start += 1;
        if state.fail_start {
            return Err(Error::Backend("device busy".to_string()));
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.state.lock().unwrap().calls.stop += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.state.lock().unwrap().calls.close += 1;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut state = self.state.lock().unwrap();
        state.calls.read += 1;
        if let Some(result) = state.reads.pop_front() {
            let bytes = result?;
            let n = bytes.len().min(buf.len());
            buf[..n].copy_from_slice(&bytes[..n]);
            return Ok(n);
        }
        let n = state.loopback.len().min(buf.len());
        for (slot, byte) in buf.iter_mut().zip(state.loopback.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let mut state = self.state.lock().unwrap();
        state.calls.write += 1;
        state.loopback.extend(buf);
        Ok(buf.len())
    }
}
