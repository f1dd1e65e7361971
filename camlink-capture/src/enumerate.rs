//! Device enumeration by probing

use crate::backend::CameraBackend;
use tracing::{debug, info};

/// Probe device indices `0..max_probe` and report which open successfully.
///
/// Each handle is released immediately after the openness check. A failed
/// open excludes the index from the result; it is not an error.
pub fn probe_devices(backend: &dyn CameraBackend, max_probe: u32) -> Vec<u32> {
    let mut available = Vec::new();
    for device_id in 0..max_probe {
        match backend.open(device_id) {
            Ok(mut source) => {
                source.close();
                available.push(device_id);
            }
            Err(e) => {
                debug!(device_id, "probe failed: {}", e);
            }
        }
    }
    info!("discovered cameras: {:?}", available);
    available
}
