//! Sample series shared between the poller and the renderer
//!
//! The poller thread overwrites the series in place every tick; the UI
//! thread copies it out when repainting.
//!
//! ## Design Notes
//!
//! Rendering runs on the main thread, not on the poller thread that writes
//! the values, so the series sits behind `Arc<Mutex<T>>`. Both sides hold
//! the lock only for a copy of at most a few hundred values.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Copy every other byte of `interleaved` (channel 0 of a two-channel
/// stream) into `out`, returning how many values were written.
///
/// The second channel is discarded. Stops at whichever runs out first:
/// `interleaved.len() / 2` frames or `out.len()` slots.
pub fn deinterleave(interleaved: &[u8], out: &mut [f64]) -> usize {
    let mut written = 0;
    for (slot, frame) in out.iter_mut().zip(interleaved.chunks_exact(2)) {
        *slot = f64::from(frame[0]);
        written += 1;
    }
    written
}

/// Fixed-length series of the most recent single-channel values
#[derive(Clone)]
pub struct SampleSeries {
    inner: Arc<Mutex<Vec<f64>>>,
}

impl SampleSeries {
    /// Create a zeroed series of `len` values
    ///
    /// The length never changes afterwards.
    pub fn new(len: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(vec![0.0; len])),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Overwrite the front of the series with channel 0 of `interleaved`.
    ///
    /// Values past the number of frames supplied keep their previous
    /// contents. Returns the number of values updated.
    pub fn write_interleaved(&self, interleaved: &[u8]) -> usize {
        deinterleave(interleaved, &mut self.lock())
    }

    /// Copy of the current values
    pub fn values(&self) -> Vec<f64> {
        self.lock().clone()
    }

    /// Current values as `(index, value)` pairs for charting
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.lock()
            .iter()
            .enumerate()
            .map(|(i, &v)| (i as f64, v))
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<f64>> {
        // Values are plain numbers, a panic mid-write cannot break them
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
