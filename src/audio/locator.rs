//! Device lookup by name substring.

use super::backend::{AudioBackend, DeviceInfo};
use crate::error::{Error, Result};

/// Name the littleBits USB I/O module reports to the host
pub const DEFAULT_DEVICE_NAME: &str = "KORG 2ch Audio Device";

/// Find the first device whose name contains `pattern`.
///
/// Matching is case-sensitive and first match wins, in whatever order the
/// backend enumerates. An empty pattern means [`DEFAULT_DEVICE_NAME`].
pub fn locate<B: AudioBackend>(backend: &B, pattern: &str) -> Result<DeviceInfo<B::Device>> {
    let pattern = if pattern.is_empty() {
        DEFAULT_DEVICE_NAME
    } else {
        pattern
    };

    let device = backend
        .devices()?
        .into_iter()
        .find(|info| info.name.contains(pattern))
        .ok_or_else(|| Error::DeviceNotFound(pattern.to_string()))?;

    log::info!(
        "Using device: {} (in: {}, out: {})",
        device.name,
        device.max_input_channels,
        device.max_output_channels
    );
    Ok(device)
}
