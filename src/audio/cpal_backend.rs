//! cpal backend
//!
//! cpal is callback driven: the audio thread hands us a slice of samples
//! whenever the device has some. Blocking transfers are layered on top with
//! one ring buffer per stream:
//!
//! - Input: the callback converts each sample to `u8` and pushes whole
//!   frames; `read` waits until the ring holds the requested bytes, drops
//!   any older surplus and pops the newest ones.
//! - Output: `write` waits for room and pushes; the callback pops and
//!   converts back, emitting silence when the ring runs dry.
//!
//! The callback never blocks and never logs. Dropped bytes are counted and
//! reported from the transferring thread instead.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    BufferSize, FromSample, Sample, SampleFormat, SizedSample, StreamConfig, SupportedBufferSize,
    SupportedStreamConfig,
};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use super::backend::{AudioBackend, DeviceInfo, Direction, SampleStream};
use crate::error::{Error, Result};

/// Frames per hardware callback requested for the low-latency profile
const LOW_LATENCY_FRAMES: u32 = 256;

/// Ring capacity, in multiples of the transfer buffer size
const RING_BUFFERS: usize = 4;

/// How long a blocked transfer sleeps between ring checks
const POLL_INTERVAL: Duration = Duration::from_millis(1);

pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(2);

/// Dispatch a generic stream builder on the device's native sample format
macro_rules! with_sample_type {
    ($format:expr, $build:ident($($arg:expr),* $(,)?)) => {
        match $format {
            SampleFormat::I8 => $build::<i8>($($arg),*),
            SampleFormat::I16 => $build::<i16>($($arg),*),
            SampleFormat::I32 => $build::<i32>($($arg),*),
            SampleFormat::I64 => $build::<i64>($($arg),*),
            SampleFormat::U8 => $build::<u8>($($arg),*),
            SampleFormat::U16 => $build::<u16>($($arg),*),
            SampleFormat::U32 => $build::<u32>($($arg),*),
            SampleFormat::U64 => $build::<u64>($($arg),*),
            SampleFormat::F32 => $build::<f32>($($arg),*),
            SampleFormat::F64 => $build::<f64>($($arg),*),
            other => Err(Error::Backend(format!("unsupported sample format: {:?}", other))),
        }
    };
}

/// Audio backend over a cpal host.
///
/// Only the host id is stored, so the backend is `Send` and can be moved
/// to whichever thread ends up owning the stream.
#[derive(Clone, Debug)]
pub struct CpalBackend {
    host: cpal::HostId,
    timeout: Duration,
}

impl CpalBackend {
    /// Resolve and initialize an audio host.
    ///
    /// `host` selects a cpal host by name (case-insensitive, e.g. "ALSA",
    /// "JACK", "CoreAudio", "WASAPI"); `None` means the platform default.
    pub fn new(host: Option<&str>) -> Result<Self> {
        let id = match host {
            Some(name) => cpal::available_hosts()
                .into_iter()
                .find(|id| id.name().eq_ignore_ascii_case(name))
                .ok_or_else(|| Error::Init(format!("audio host '{}' is not available", name)))?,
            None => cpal::default_host().id(),
        };

        cpal::host_from_id(id).map_err(|e| Error::Init(e.to_string()))?;
        log::info!("Audio host initialized: {}", id.name());

        Ok(Self {
            host: id,
            timeout: DEFAULT_TRANSFER_TIMEOUT,
        })
    }

    /// Maximum time a single blocking transfer may wait on the device
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn host(&self) -> Result<cpal::Host> {
        cpal::host_from_id(self.host).map_err(|e| Error::Init(e.to_string()))
    }
}

impl AudioBackend for CpalBackend {
    type Device = cpal::Device;
    type Stream = CpalStream;

    fn devices(&self) -> Result<Vec<DeviceInfo<cpal::Device>>> {
        let host = self.host()?;
        let mut found = Vec::new();

        for device in host.devices()? {
            let name = match device.name() {
                Ok(name) => name,
                Err(e) => {
                    log::debug!("Skipping device without a name: {}", e);
                    continue;
                }
            };
            let max_input_channels = device
                .supported_input_configs()
                .map(|configs| configs.map(|c| c.channels()).max().unwrap_or(0))
                .unwrap_or(0);
            let max_output_channels = device
                .supported_output_configs()
                .map(|configs| configs.map(|c| c.channels()).max().unwrap_or(0))
                .unwrap_or(0);

            found.push(DeviceInfo {
                name,
                max_input_channels,
                max_output_channels,
                handle: device,
            });
        }

        Ok(found)
    }

    fn open_stream(
        &self,
        info: &DeviceInfo<cpal::Device>,
        direction: Direction,
        buffer_size: usize,
    ) -> Result<CpalStream> {
        let device = &info.handle;
        let (producer, consumer) = HeapRb::<u8>::new(ring_capacity(buffer_size)?).split();
        let shared = Arc::new(Shared::default());

        let supported = match direction {
            Direction::Input => device.default_input_config()?,
            Direction::Output => device.default_output_config()?,
        };
        let config = low_latency_config(&supported);
        log::info!(
            "Opening {} stream on {}: {} ch, {} Hz, {:?}, buffer {:?}",
            direction,
            info.name,
            config.channels,
            config.sample_rate.0,
            supported.sample_format(),
            config.buffer_size
        );
        if config.channels != 2 {
            log::warn!(
                "{} has {} channels; samples stay interleaved in device order",
                info.name,
                config.channels
            );
        }

        let (stream, ring) = match direction {
            Direction::Input => {
                let stream = with_sample_type!(
                    supported.sample_format(),
                    build_input(device, &config, producer, Arc::clone(&shared))
                )?;
                (stream, Ring::Input(consumer))
            }
            Direction::Output => {
                let stream = with_sample_type!(
                    supported.sample_format(),
                    build_output(device, &config, consumer, Arc::clone(&shared))
                )?;
                (stream, Ring::Output(producer))
            }
        };

        // Some hosts start streams as soon as they are built
        if let Err(e) = stream.pause() {
            log::debug!("Could not pause freshly built stream: {}", e);
        }

        Ok(CpalStream {
            stream: Some(stream),
            ring,
            shared,
            timeout: self.timeout,
            frame_len: usize::from(config.channels.max(1)),
        })
    }
}

fn ring_capacity(buffer_size: usize) -> Result<usize> {
    match buffer_size.checked_mul(RING_BUFFERS) {
        Some(0) | None => Err(Error::InvalidBufferSize),
        Some(capacity) => Ok(capacity),
    }
}

/// Device default config with a small fixed hardware buffer when the
/// device advertises a supported range.
fn low_latency_config(supported: &SupportedStreamConfig) -> StreamConfig {
    let mut config = supported.config();
    config.buffer_size = match supported.buffer_size() {
        SupportedBufferSize::Range { min, max } => {
            BufferSize::Fixed(LOW_LATENCY_FRAMES.clamp(*min, *max))
        }
        SupportedBufferSize::Unknown => BufferSize::Default,
    };
    config
}

/// State shared between a stream's callbacks and its owner
#[derive(Default)]
struct Shared {
    /// Last asynchronous error reported by cpal
    fault: Mutex<Option<String>>,
    /// Bytes dropped (input) or padded with silence (output)
    lost: AtomicUsize,
}

impl Shared {
    fn report(&self, err: cpal::StreamError) {
        *self.fault.lock().unwrap_or_else(PoisonError::into_inner) = Some(err.to_string());
    }

    fn take_fault(&self) -> Result<()> {
        match self.fault.lock().unwrap_or_else(PoisonError::into_inner).take() {
            Some(msg) => Err(Error::Backend(msg)),
            None => Ok(()),
        }
    }

    fn take_lost(&self) -> usize {
        self.lost.swap(0, Ordering::Relaxed)
    }
}

fn build_input<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut producer: HeapProd<u8>,
    shared: Arc<Shared>,
) -> Result<cpal::Stream>
where
    T: SizedSample,
    u8: FromSample<T>,
{
    let channels = usize::from(config.channels.max(1));
    let errors = Arc::clone(&shared);
    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let mut dropped = 0;
            // Whole frames only, so channel 0 stays on frame boundaries
            for frame in data.chunks(channels) {
                if producer.vacant_len() < frame.len() {
                    dropped += frame.len();
                    continue;
                }
                for &sample in frame {
                    let _ = producer.try_push(u8::from_sample(sample));
                }
            }
            if dropped > 0 {
                shared.lost.fetch_add(dropped, Ordering::Relaxed);
            }
        },
        move |err| errors.report(err),
        None,
    )?;
    Ok(stream)
}

fn build_output<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut consumer: HeapCons<u8>,
    shared: Arc<Shared>,
) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<u8>,
{
    let errors = Arc::clone(&shared);
    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let mut missing = 0;
            for slot in data.iter_mut() {
                *slot = match consumer.try_pop() {
                    Some(byte) => T::from_sample(byte),
                    None => {
                        missing += 1;
                        T::EQUILIBRIUM
                    }
                };
            }
            if missing > 0 {
                shared.lost.fetch_add(missing, Ordering::Relaxed);
            }
        },
        move |err| errors.report(err),
        None,
    )?;
    Ok(stream)
}

enum Ring {
    Input(HeapCons<u8>),
    Output(HeapProd<u8>),
}

/// A cpal stream with blocking byte transfers.
pub struct CpalStream {
    /// Dropping the cpal stream is what closes it
    stream: Option<cpal::Stream>,
    ring: Ring,
    shared: Arc<Shared>,
    timeout: Duration,
    /// Bytes per interleaved frame (one per channel)
    frame_len: usize,
}

impl CpalStream {
    fn stream(&self) -> Result<&cpal::Stream> {
        self.stream
            .as_ref()
            .ok_or_else(|| Error::Backend("stream already closed".to_string()))
    }
}

fn timed_out(timeout: Duration, waiting_for: usize) -> Error {
    Error::Backend(format!(
        "timed out after {:?} waiting for {} bytes",
        timeout, waiting_for
    ))
}

impl SampleStream for CpalStream {
    fn start(&mut self) -> Result<()> {
        self.stream()?.play()?;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.stream()?.pause()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.stream.take();
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let Ring::Input(consumer) = &mut self.ring else {
            return Err(Error::Backend("stream was not opened for input".to_string()));
        };

        let deadline = Instant::now() + self.timeout;
        while consumer.occupied_len() < buf.len() {
            self.shared.take_fault()?;
            if Instant::now() >= deadline {
                return Err(timed_out(self.timeout, buf.len()));
            }
            thread::sleep(POLL_INTERVAL);
        }

        let dropped = self.shared.take_lost();
        if dropped > 0 {
            log::debug!("Input overrun: dropped {} bytes", dropped);
        }

        // Only the newest bytes matter; discard whole frames of backlog
        let surplus = consumer.occupied_len() - buf.len();
        consumer.skip(surplus - surplus % self.frame_len);

        let n = consumer.pop_slice(buf);
        let partial = n % self.frame_len;
        if partial != 0 {
            consumer.skip(self.frame_len - partial);
        }
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let Ring::Output(producer) = &mut self.ring else {
            return Err(Error::Backend("stream was not opened for output".to_string()));
        };

        let wanted = buf.len().min(producer.capacity().get());
        let deadline = Instant::now() + self.timeout;
        while producer.vacant_len() < wanted {
            self.shared.take_fault()?;
            if Instant::now() >= deadline {
                return Err(timed_out(self.timeout, wanted));
            }
            thread::sleep(POLL_INTERVAL);
        }

        let padded = self.shared.take_lost();
        if padded > 0 {
            log::debug!("Output underrun: {} bytes of silence", padded);
        }
        Ok(producer.push_slice(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_latency_clamps_into_range() {
        let supported = SupportedStreamConfig::new(
            2,
            cpal::SampleRate(44_100),
            SupportedBufferSize::Range { min: 512, max: 4096 },
            SampleFormat::I16,
        );
        let config = low_latency_config(&supported);
        assert_eq!(config.buffer_size, BufferSize::Fixed(512));
        assert_eq!(config.channels, 2);
    }

    #[test]
    fn test_low_latency_unknown_range_uses_default() {
        let supported = SupportedStreamConfig::new(
            2,
            cpal::SampleRate(48_000),
            SupportedBufferSize::Unknown,
            SampleFormat::F32,
        );
        assert_eq!(low_latency_config(&supported).buffer_size, BufferSize::Default);
    }

    fn input_stream(capacity: usize, timeout: Duration) -> (HeapProd<u8>, CpalStream) {
        let (producer, consumer) = HeapRb::<u8>::new(capacity).split();
        let stream = CpalStream {
            stream: None,
            ring: Ring::Input(consumer),
            shared: Arc::new(Shared::default()),
            timeout,
            frame_len: 2,
        };
        (producer, stream)
    }

    fn output_stream(capacity: usize, timeout: Duration) -> (HeapCons<u8>, CpalStream) {
        let (producer, consumer) = HeapRb::<u8>::new(capacity).split();
        let stream = CpalStream {
            stream: None,
            ring: Ring::Output(producer),
            shared: Arc::new(Shared::default()),
            timeout,
            frame_len: 2,
        };
        (consumer, stream)
    }

    #[test]
    fn test_read_returns_newest_frames_after_backlog() {
        let (mut producer, mut stream) = input_stream(16, DEFAULT_TRANSFER_TIMEOUT);
        for byte in 0..16u8 {
            producer.try_push(byte).unwrap();
        }

        let mut buf = [0u8; 4];
        assert_eq!(stream.read(&mut buf).unwrap(), 4);
        assert_eq!(buf, [12, 13, 14, 15]);
    }

    #[test]
    fn test_read_keeps_frame_alignment() {
        let (mut producer, mut stream) = input_stream(16, DEFAULT_TRANSFER_TIMEOUT);
        for byte in 0..10u8 {
            producer.try_push(byte).unwrap();
        }
        let mut buf = [0u8; 4];
        stream.read(&mut buf).unwrap();
        assert_eq!(buf, [6, 7, 8, 9]);

        // Odd-sized read: backlog is trimmed by whole frames and the rest
        // of the split frame is dropped afterwards
        for byte in 10..16u8 {
            producer.try_push(byte).unwrap();
        }
        let mut odd = [0u8; 3];
        stream.read(&mut odd).unwrap();
        assert_eq!(odd, [12, 13, 14]);
        let mut next = [0u8; 2];
        producer.try_push(20).unwrap();
        producer.try_push(21).unwrap();
        stream.read(&mut next).unwrap();
        assert_eq!(next, [20, 21]);
    }

    #[test]
    fn test_read_waits_for_enough_bytes() {
        let (mut producer, mut stream) = input_stream(16, Duration::from_secs(5));
        producer.try_push(1).unwrap();

        let feeder = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.push_slice(&[2, 3, 4]);
            producer
        });

        let mut buf = [0u8; 4];
        assert_eq!(stream.read(&mut buf).unwrap(), 4);
        assert_eq!(buf, [1, 2, 3, 4]);
        feeder.join().unwrap();
    }

    #[test]
    fn test_read_times_out() {
        let (_producer, mut stream) = input_stream(16, Duration::from_millis(10));
        let mut buf = [0u8; 4];
        let err = stream.read(&mut buf).unwrap_err();
        assert!(matches!(err, Error::Backend(ref msg) if msg.contains("timed out")));
    }

    #[test]
    fn test_fault_interrupts_blocked_read() {
        let (_producer, mut stream) = input_stream(16, Duration::from_secs(5));
        stream.shared.report(cpal::StreamError::DeviceNotAvailable);

        let mut buf = [0u8; 4];
        let err = stream.read(&mut buf).unwrap_err();
        assert!(matches!(err, Error::Backend(ref msg) if !msg.contains("timed out")));
    }

    #[test]
    fn test_write_waits_for_room() {
        let (mut consumer, mut stream) = output_stream(4, Duration::from_secs(5));
        assert_eq!(stream.write(&[1, 2, 3, 4]).unwrap(), 4);

        let drainer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            let mut played = [0u8; 2];
            consumer.pop_slice(&mut played);
            (consumer, played)
        });

        assert_eq!(stream.write(&[5, 6]).unwrap(), 2);
        let (mut consumer, played) = drainer.join().unwrap();
        assert_eq!(played, [1, 2]);
        let mut rest = [0u8; 4];
        assert_eq!(consumer.pop_slice(&mut rest), 4);
        assert_eq!(rest, [3, 4, 5, 6]);
    }

    #[test]
    fn test_write_times_out_and_reports_faults() {
        let (_consumer, mut stream) = output_stream(2, Duration::from_millis(10));
        stream.write(&[1, 2]).unwrap();
        assert!(matches!(
            stream.write(&[3]),
            Err(Error::Backend(ref msg)) if msg.contains("timed out")
        ));

        stream.shared.report(cpal::StreamError::DeviceNotAvailable);
        assert!(matches!(
            stream.write(&[3]),
            Err(Error::Backend(ref msg)) if !msg.contains("timed out")
        ));
    }

    #[test]
    fn test_wrong_direction_transfers_fail() {
        let (_producer, mut input) = input_stream(4, DEFAULT_TRANSFER_TIMEOUT);
        assert!(matches!(input.write(&[1]), Err(Error::Backend(_))));

        let (_consumer, mut output) = output_stream(4, DEFAULT_TRANSFER_TIMEOUT);
        assert!(matches!(output.read(&mut [0u8; 1]), Err(Error::Backend(_))));
    }

    #[test]
    fn test_ring_capacity_rejects_overflow() {
        assert_eq!(ring_capacity(1024).unwrap(), 4096);
        assert!(matches!(ring_capacity(usize::MAX), Err(Error::InvalidBufferSize)));
        assert!(matches!(ring_capacity(0), Err(Error::InvalidBufferSize)));
    }

    #[test]
    fn test_fault_is_reported_once() {
        let shared = Shared::default();
        shared.report(cpal::StreamError::DeviceNotAvailable);
        assert!(matches!(shared.take_fault(), Err(Error::Backend(_))));
        assert!(shared.take_fault().is_ok());
    }
}
