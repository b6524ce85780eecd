//! Active render endpoint control.
//!
//! [`AudioEndpointController`] snapshots the active render devices once, holds
//! the volume control of exactly one of them, and exposes volume and mute
//! operations on it. The device list is never refreshed; devices plugged in
//! after construction are not observed.

use super::backend::{AudioBackend, EndpointVolume};
use super::device::{AudioError, DeviceDescriptor, UNKNOWN_DEVICE_NAME};

/// Host-facing volume control operations.
///
/// Implemented by every [`AudioEndpointController`] regardless of backend so
/// bindings can hold one as a trait object.
pub trait VolumeControl {
    /// Number of render devices captured at construction.
    fn device_count(&self) -> usize;

    /// Descriptors of all captured devices, in enumeration order.
    fn devices(&self) -> &[DeviceDescriptor];

    fn device_name(&self, index: usize) -> Result<&str, AudioError>;

    fn device_id(&self, index: usize) -> Result<&str, AudioError>;

    /// ID of the device whose endpoint is currently active.
    fn active_device_id(&self) -> Option<&str>;

    /// Make the device with `id` the active endpoint.
    ///
    /// Returns `Ok(false)` and changes nothing if no captured device has that
    /// ID.
    fn switch_active_device(&mut self, id: &str) -> Result<bool, AudioError>;

    fn is_muted(&self) -> Result<bool, AudioError>;

    fn set_muted(&self, muted: bool) -> Result<(), AudioError>;

    /// Master volume scalar (0.0 to 1.0) of the active endpoint.
    fn volume(&self) -> Result<f32, AudioError>;

    /// Set the master volume. `level` must be within 0.0..=1.0.
    fn set_volume(&self, level: f32) -> Result<(), AudioError>;

    /// Toggle the mute state. Returns the new state.
    fn toggle_mute(&self) -> Result<bool, AudioError> {
        let muted = !self.is_muted()?;
        self.set_muted(muted)?;
        Ok(muted)
    }

    /// Move the volume by `delta`, clamped to 0.0..=1.0. Returns the new level.
    fn step_volume(&self, delta: f32) -> Result<f32, AudioError> {
        if !delta.is_finite() {
            return Err(AudioError::invalid_argument("volume step must be finite"));
        }
        let level = (self.volume()? + delta).clamp(0.0, 1.0);
        self.set_volume(level)?;
        Ok(level)
    }
}

/// Reject volume levels outside 0.0..=1.0 (NaN included).
pub fn validate_volume(level: f32) -> Result<(), AudioError> {
    if (0.0..=1.0).contains(&level) {
        Ok(())
    } else {
        Err(AudioError::invalid_argument(
            "volume must be between 0.0 and 1.0 inclusive",
        ))
    }
}

struct ActiveEndpoint<E> {
    device_id: Option<String>,
    endpoint: E,
}

/// Volume and mute control over one active render endpoint.
pub struct AudioEndpointController<B: AudioBackend> {
    backend: B,
    devices: Vec<DeviceDescriptor>,
    handles: Vec<B::Device>,
    active: ActiveEndpoint<B::Endpoint>,
}

impl<B: AudioBackend> AudioEndpointController<B> {
    /// Enumerate the active render devices and activate the default one.
    ///
    /// Fails if the device collection cannot be obtained, if there is no
    /// default render device, or if its volume control cannot be activated.
    /// Unreadable per-device properties are replaced with placeholders.
    pub fn new(backend: B) -> Result<Self, AudioError> {
        let handles = backend.enumerate_render_devices()?;

        let devices: Vec<DeviceDescriptor> = handles
            .iter()
            .enumerate()
            .map(|(index, device)| describe(&backend, index, device))
            .collect();
        tracing::debug!(count = devices.len(), "Enumerated render devices");

        let default_device = backend.default_render_device()?;
        let endpoint = backend.activate_volume(&default_device)?;
        let device_id = match backend.device_id(&default_device) {
            Ok(id) => Some(id),
            Err(err) => {
                tracing::warn!(error = %err, "Could not read default device id");
                None
            }
        };
        tracing::debug!(device_id = ?device_id, "Activated default render endpoint");

        Ok(Self {
            backend,
            devices,
            handles,
            active: ActiveEndpoint {
                device_id,
                endpoint,
            },
        })
    }

    /// The backend this controller drives.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn descriptor(&self, index: usize) -> Result<&DeviceDescriptor, AudioError> {
        self.devices.get(index).ok_or_else(|| {
            AudioError::invalid_argument(format!(
                "device index {} out of range (device count is {})",
                index,
                self.devices.len()
            ))
        })
    }
}

fn describe<B: AudioBackend>(backend: &B, index: usize, device: &B::Device) -> DeviceDescriptor {
    let id = backend.device_id(device).unwrap_or_else(|err| {
        tracing::warn!(index, error = %err, "Could not read device id, using placeholder");
        DeviceDescriptor::placeholder_id(index)
    });
    let name = backend.friendly_name(device).unwrap_or_else(|err| {
        tracing::warn!(index, error = %err, "Could not read device name");
        UNKNOWN_DEVICE_NAME.to_string()
    });
    DeviceDescriptor { id, name }
}

impl<B: AudioBackend> VolumeControl for AudioEndpointController<B> {
    fn device_count(&self) -> usize {
        self.devices.len()
    }

    fn devices(&self) -> &[DeviceDescriptor] {
        &self.devices
    }

    fn device_name(&self, index: usize) -> Result<&str, AudioError> {
        self.descriptor(index).map(|d| d.name.as_str())
    }

    fn device_id(&self, index: usize) -> Result<&str, AudioError> {
        self.descriptor(index).map(|d| d.id.as_str())
    }

    fn active_device_id(&self) -> Option<&str> {
        self.active.device_id.as_deref()
    }

    fn switch_active_device(&mut self, id: &str) -> Result<bool, AudioError> {
        let Some(index) = self.devices.iter().position(|d| d.id == id) else {
            tracing::debug!(device_id = id, "No render device with this id");
            return Ok(false);
        };

        // The old endpoint stays active until the new one is confirmed.
        let endpoint = self.backend.activate_volume(&self.handles[index])?;
        self.active = ActiveEndpoint {
            device_id: Some(id.to_string()),
            endpoint,
        };
        tracing::info!(device_id = id, "Switched active render device");

        Ok(true)
    }

    fn is_muted(&self) -> Result<bool, AudioError> {
        self.active.endpoint.get_mute()
    }

    fn set_muted(&self, muted: bool) -> Result<(), AudioError> {
        self.active.endpoint.set_mute(muted)
    }

    fn volume(&self) -> Result<f32, AudioError> {
        self.active.endpoint.get_master_volume()
    }

    fn set_volume(&self, level: f32) -> Result<(), AudioError> {
        validate_volume(level)?;
        self.active.endpoint.set_master_volume(level)
    }
}
