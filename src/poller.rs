//! Polling visualizer
//!
//! A single background thread reads from the module at a fixed cadence and
//! keeps a [`SampleSeries`] up to date:
//!
//! 1. ask for the current terminal width `w`
//! 2. read `2w` bytes (one frame of two interleaved channels per column),
//!    capped at the Reader's buffer capacity
//! 3. on success copy channel 0 into the series and request a repaint
//! 4. sleep for the refresh interval
//!
//! Read errors are logged at debug level and the tick is skipped; the loop
//! only ends when asked to stop or when nobody listens for repaints.
//!
//! The series length is fixed when it is created. Once the terminal is
//! resized the number of values refreshed per tick follows the new width,
//! but the series itself does not grow or shrink.

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::audio::SampleSeries;
use crate::error::{Error, Result};

/// Refresh cadence of the scope
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

/// Outcome of one poll
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    /// This many series values were refreshed
    Updated(usize),
    /// The read failed; the series was left alone
    Skipped,
}

pub struct Poller<R, W> {
    reader: R,
    series: SampleSeries,
    width: W,
    scratch: Vec<u8>,
    interval: Duration,
}

impl<R, W> Poller<R, W>
where
    R: Read,
    W: FnMut() -> usize,
{
    /// `capacity` is the Reader's buffer size, the largest read issued.
    /// `width` reports the current display width in columns.
    pub fn new(reader: R, capacity: usize, series: SampleSeries, width: W) -> Self {
        Self {
            reader,
            series,
            width,
            scratch: vec![0; capacity],
            interval: DEFAULT_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Read once and refresh the series.
    pub fn tick(&mut self) -> Tick {
        let request = (self.width)().saturating_mul(2).min(self.scratch.len());
        match self.reader.read(&mut self.scratch[..request]) {
            Ok(n) => Tick::Updated(self.series.write_interleaved(&self.scratch[..n])),
            Err(e) => {
                log::debug!("Skipping tick, read of {} bytes failed: {}", request, e);
                Tick::Skipped
            }
        }
    }

    /// Poll until `stop` is set or `repaint` is disconnected, then return
    /// the reader to the caller.
    pub fn run(mut self, repaint: &Sender<()>, stop: &AtomicBool) -> R {
        while !stop.load(Ordering::Relaxed) {
            if let Tick::Updated(_) = self.tick() {
                if repaint.send(()).is_err() {
                    break;
                }
            }
            thread::sleep(self.interval);
        }
        self.reader
    }
}

/// Handle to a poller running on its own thread
pub struct PollerHandle {
    /// Receives one message per refreshed tick
    pub repaint: Receiver<()>,
    stop: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl PollerHandle {
    /// Ask the poller to stop and wait for it; the reader is dropped on the
    /// poller thread, which releases its stream.
    pub fn shutdown(self) {
        self.stop.store(true, Ordering::Relaxed);
        drop(self.repaint);
        if self.thread.join().is_err() {
            log::error!("Poller thread panicked");
        }
    }
}

/// Start a poller on a new thread.
///
/// `open` runs on that thread, so readers that cannot cross threads (cpal
/// streams on some hosts) still work. This returns once `open` has
/// finished, passing back its error if it failed.
pub fn spawn<R, F, W>(
    open: F,
    capacity: usize,
    series: SampleSeries,
    width: W,
    interval: Duration,
) -> Result<PollerHandle>
where
    R: Read + 'static,
    F: FnOnce() -> Result<R> + Send + 'static,
    W: FnMut() -> usize + Send + 'static,
{
    let (ready_tx, ready_rx) = mpsc::channel();
    let (repaint_tx, repaint_rx) = mpsc::channel();
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = Arc::clone(&stop);

    let thread = thread::Builder::new()
        .name("littlebits-poller".to_string())
        .spawn(move || {
            let reader = match open() {
                Ok(reader) => reader,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(()));

            log::info!("Poller started ({:?} interval)", interval);
            let reader = Poller::new(reader, capacity, series, width)
                .with_interval(interval)
                .run(&repaint_tx, &stop_flag);
            drop(reader);
            log::info!("Poller stopped");
        })
        .map_err(|e| Error::Init(format!("failed to spawn poller thread: {}", e)))?;

    let ready = ready_rx
        .recv()
        .unwrap_or_else(|_| Err(Error::Init("poller thread exited during setup".to_string())));
    if let Err(e) = ready {
        let _ = thread.join();
        return Err(e);
    }

    Ok(PollerHandle {
        repaint: repaint_rx,
        stop,
        thread,
    })
}
