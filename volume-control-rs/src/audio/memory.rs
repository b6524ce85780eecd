//! Simulated audio host.
//!
//! Keeps a set of render devices in memory and hands out endpoints that read
//! and write their volume and mute state. Faults can be injected per device
//! (unplug, failed activation, unreadable properties) to exercise the error
//! paths of the controller without real hardware.

use super::backend::{AudioBackend, EndpointVolume};
use super::device::{AudioError, AUDCLNT_E_DEVICE_INVALIDATED, E_NOTFOUND};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
struct SimulatedDevice {
    id: String,
    name: Option<String>,
    volume: f32,
    muted: bool,
    present: bool,
    id_readable: bool,
    activation_fails: bool,
}

#[derive(Debug, Default)]
struct HostState {
    devices: Vec<SimulatedDevice>,
    default_device: Option<String>,
    enumeration_fails: bool,
    live_endpoints: usize,
}

impl HostState {
    fn position(&self, id: &str) -> Option<usize> {
        self.devices.iter().position(|d| d.id == id)
    }

    fn device_mut(&mut self, id: &str) -> Option<&mut SimulatedDevice> {
        self.devices.iter_mut().find(|d| d.id == id)
    }
}

/// In-memory audio host. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<HostState>>,
}

/// Handle to one simulated device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryDevice {
    slot: usize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a device; the first device added becomes the default.
    pub fn with_device(self, id: &str, name: &str) -> Self {
        self.add_device(id, name, 1.0, false);
        self
    }

    /// Add a device with an initial volume and mute state.
    pub fn add_device(&self, id: &str, name: &str, volume: f32, muted: bool) {
        let mut state = self.lock();
        state.devices.push(SimulatedDevice {
            id: id.to_string(),
            name: Some(name.to_string()),
            volume: volume.clamp(0.0, 1.0),
            muted,
            present: true,
            id_readable: true,
            activation_fails: false,
        });
        if state.default_device.is_none() {
            state.default_device = Some(id.to_string());
        }
    }

    /// Make `id` the default render device. Returns false for unknown IDs.
    pub fn set_default_device(&self, id: &str) -> bool {
        let mut state = self.lock();
        if state.position(id).is_none() {
            return false;
        }
        state.default_device = Some(id.to_string());
        true
    }

    /// Clear the default device, as on a host with no usable output.
    pub fn clear_default_device(&self) {
        self.lock().default_device = None;
    }

    /// Unplug a device: it drops out of enumeration and its endpoints fail.
    pub fn unplug(&self, id: &str) {
        self.update(id, |d| d.present = false);
    }

    /// Plug a previously unplugged device back in.
    pub fn replug(&self, id: &str) {
        self.update(id, |d| d.present = true);
    }

    /// Make activation of `id`'s volume control fail.
    pub fn fail_activation(&self, id: &str, fails: bool) {
        self.update(id, |d| d.activation_fails = fails);
    }

    /// Make `id`'s friendly name unreadable.
    pub fn hide_name(&self, id: &str) {
        self.update(id, |d| d.name = None);
    }

    /// Make `id`'s device ID unreadable.
    pub fn hide_id(&self, id: &str) {
        self.update(id, |d| d.id_readable = false);
    }

    /// Make the enumeration service itself fail.
    pub fn fail_enumeration(&self, fails: bool) {
        self.lock().enumeration_fails = fails;
    }

    /// Current volume of a device, read behind any endpoint's back.
    pub fn device_volume(&self, id: &str) -> Option<f32> {
        let state = self.lock();
        state.position(id).map(|i| state.devices[i].volume)
    }

    /// Current mute state of a device.
    pub fn device_muted(&self, id: &str) -> Option<bool> {
        let state = self.lock();
        state.position(id).map(|i| state.devices[i].muted)
    }

    /// Number of endpoint handles that are activated and not yet dropped.
    pub fn live_endpoints(&self) -> usize {
        self.lock().live_endpoints
    }

    fn update(&self, id: &str, f: impl FnOnce(&mut SimulatedDevice)) {
        if let Some(device) = self.lock().device_mut(id) {
            f(device);
        }
    }

    fn lock(&self) -> MutexGuard<'_, HostState> {
        lock_state(&self.state)
    }
}

fn lock_state(state: &Mutex<HostState>) -> MutexGuard<'_, HostState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn not_found(operation: &'static str) -> AudioError {
    AudioError::platform(operation, E_NOTFOUND, "Element not found.")
}

impl AudioBackend for MemoryBackend {
    type Device = MemoryDevice;
    type Endpoint = MemoryEndpoint;

    fn enumerate_render_devices(&self) -> Result<Vec<MemoryDevice>, AudioError> {
        let state = self.lock();
        if state.enumeration_fails {
            return Err(AudioError::platform(
                "enumerating audio endpoints",
                E_NOTFOUND,
                "Enumeration service unavailable.",
            ));
        }

        Ok(state
            .devices
            .iter()
            .enumerate()
            .filter(|(_, d)| d.present)
            .map(|(slot, _)| MemoryDevice { slot })
            .collect())
    }

    fn device_id(&self, device: &MemoryDevice) -> Result<String, AudioError> {
        let state = self.lock();
        match state.devices.get(device.slot) {
            Some(d) if d.id_readable => Ok(d.id.clone()),
            _ => Err(not_found("reading device id")),
        }
    }

    fn friendly_name(&self, device: &MemoryDevice) -> Result<String, AudioError> {
        let state = self.lock();
        state
            .devices
            .get(device.slot)
            .and_then(|d| d.name.clone())
            .ok_or_else(|| not_found("reading device friendly name"))
    }

    fn default_render_device(&self) -> Result<MemoryDevice, AudioError> {
        let state = self.lock();
        state
            .default_device
            .as_deref()
            .and_then(|id| state.position(id))
            .filter(|&slot| state.devices[slot].present)
            .map(|slot| MemoryDevice { slot })
            .ok_or_else(|| not_found("getting the default audio endpoint"))
    }

    fn activate_volume(&self, device: &MemoryDevice) -> Result<MemoryEndpoint, AudioError> {
        let mut state = self.lock();
        match state.devices.get(device.slot) {
            Some(d) if d.present && !d.activation_fails => {}
            _ => return Err(not_found("activating the volume endpoint")),
        }
        state.live_endpoints += 1;

        Ok(MemoryEndpoint {
            state: Arc::clone(&self.state),
            slot: device.slot,
        })
    }
}

/// Volume control bound to one simulated device.
#[derive(Debug)]
pub struct MemoryEndpoint {
    state: Arc<Mutex<HostState>>,
    slot: usize,
}

impl MemoryEndpoint {
    fn access<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut SimulatedDevice) -> T,
    ) -> Result<T, AudioError> {
        let mut state = lock_state(&self.state);
        match state.devices.get_mut(self.slot) {
            Some(device) if device.present => Ok(f(device)),
            _ => Err(AudioError::platform(
                operation,
                AUDCLNT_E_DEVICE_INVALIDATED,
                "The audio endpoint device has been unplugged.",
            )),
        }
    }
}

impl EndpointVolume for MemoryEndpoint {
    fn get_mute(&self) -> Result<bool, AudioError> {
        self.access("getting muted state", |d| d.muted)
    }

    fn set_mute(&self, muted: bool) -> Result<(), AudioError> {
        self.access("setting mute", |d| d.muted = muted)
    }

    fn get_master_volume(&self) -> Result<f32, AudioError> {
        self.access("getting volume", |d| d.volume)
    }

    fn set_master_volume(&self, level: f32) -> Result<(), AudioError> {
        self.access("setting volume", |d| d.volume = level)
    }
}

impl Drop for MemoryEndpoint {
    fn drop(&mut self) {
        let mut state = lock_state(&self.state);
        state.live_endpoints = state.live_endpoints.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> MemoryBackend {
        MemoryBackend::new()
            .with_device("dev-A", "Speakers")
            .with_device("dev-B", "Headphones")
    }

    #[test]
    fn test_first_device_is_default() {
        let backend = host();
        let default = backend.default_render_device().unwrap();
        assert_eq!(backend.device_id(&default).unwrap(), "dev-A");
    }

    #[test]
    fn test_unplugged_device_not_enumerated() {
        let backend = host();
        backend.unplug("dev-A");
        let devices = backend.enumerate_render_devices().unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(backend.device_id(&devices[0]).unwrap(), "dev-B");
        assert!(backend.default_render_device().is_err());
    }

    #[test]
    fn test_endpoint_tracks_live_handles() {
        let backend = host();
        let device = backend.default_render_device().unwrap();
        let first = backend.activate_volume(&device).unwrap();
        let second = backend.activate_volume(&device).unwrap();
        assert_eq!(backend.live_endpoints(), 2);
        drop(first);
        assert_eq!(backend.live_endpoints(), 1);
        drop(second);
        assert_eq!(backend.live_endpoints(), 0);
    }

    #[test]
    fn test_endpoint_fails_after_unplug() {
        let backend = host();
        let device = backend.default_render_device().unwrap();
        let endpoint = backend.activate_volume(&device).unwrap();
        endpoint.set_master_volume(0.25).unwrap();
        assert_eq!(backend.device_volume("dev-A"), Some(0.25));

        backend.unplug("dev-A");
        let err = endpoint.get_mute().unwrap_err();
        assert_eq!(err.code(), Some(AUDCLNT_E_DEVICE_INVALIDATED));

        backend.replug("dev-A");
        assert!(endpoint.get_mute().is_ok());
    }

    #[test]
    fn test_set_default_device_rejects_unknown_id() {
        let backend = host();
        assert!(!backend.set_default_device("dev-Z"));
        assert!(backend.set_default_device("dev-B"));
        let default = backend.default_render_device().unwrap();
        assert_eq!(backend.device_id(&default).unwrap(), "dev-B");
    }
}
