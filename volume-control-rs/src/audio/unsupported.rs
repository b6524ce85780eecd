//! Backend for platforms without a supported audio subsystem.
//!
//! Construction always fails, so no controller can exist on these hosts.

use super::backend::{AudioBackend, EndpointVolume};
use super::device::{AudioError, E_NOTIMPL};
use std::convert::Infallible;

fn not_supported(operation: &'static str) -> AudioError {
    AudioError::platform(
        operation,
        E_NOTIMPL,
        "audio endpoint control is not supported on this platform",
    )
}

pub struct UnsupportedBackend(Infallible);

pub struct UnsupportedEndpoint(Infallible);

impl UnsupportedBackend {
    pub fn new() -> Result<Self, AudioError> {
        Err(not_supported("getting a handle to the device enumerator"))
    }
}

impl AudioBackend for UnsupportedBackend {
    type Device = Infallible;
    type Endpoint = UnsupportedEndpoint;

    fn enumerate_render_devices(&self) -> Result<Vec<Infallible>, AudioError> {
        match self.0 {}
    }

    fn device_id(&self, device: &Infallible) -> Result<String, AudioError> {
        match *device {}
    }

    fn friendly_name(&self, device: &Infallible) -> Result<String, AudioError> {
        match *device {}
    }

    fn default_render_device(&self) -> Result<Infallible, AudioError> {
        match self.0 {}
    }

    fn activate_volume(&self, device: &Infallible) -> Result<UnsupportedEndpoint, AudioError> {
        match *device {}
    }
}

impl EndpointVolume for UnsupportedEndpoint {
    fn get_mute(&self) -> Result<bool, AudioError> {
        match self.0 {}
    }

    fn set_mute(&self, _: bool) -> Result<(), AudioError> {
        match self.0 {}
    }

    fn get_master_volume(&self) -> Result<f32, AudioError> {
        match self.0 {}
    }

    fn set_master_volume(&self, _: f32) -> Result<(), AudioError> {
        match self.0 {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_is_not_supported() {
        let err = UnsupportedBackend::new().err().unwrap();
        assert_eq!(err.code(), Some(E_NOTIMPL));
    }
}
