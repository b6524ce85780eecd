//! Volume control using IAudioEndpointVolume.

use super::backend::EndpointVolume;
use super::device::AudioError;
use windows::Win32::Media::Audio::{Endpoints::IAudioEndpointVolume, IMMDevice};
use windows::Win32::System::Com::CLSCTX_ALL;

/// Activated `IAudioEndpointVolume` of one render device.
///
/// The COM reference is released when this value is dropped.
pub struct WasapiEndpoint {
    endpoint_volume: IAudioEndpointVolume,
}

impl WasapiEndpoint {
    /// Activate the volume endpoint of the given device.
    pub fn new(device: &IMMDevice) -> Result<Self, AudioError> {
        unsafe {
            let endpoint_volume: IAudioEndpointVolume = device
                .Activate(CLSCTX_ALL, None)
                .map_err(|e| AudioError::windows("getting a handle to the volume endpoint", e))?;

            Ok(Self { endpoint_volume })
        }
    }
}

impl EndpointVolume for WasapiEndpoint {
    fn get_mute(&self) -> Result<bool, AudioError> {
        unsafe {
            let muted = self
                .endpoint_volume
                .GetMute()
                .map_err(|e| AudioError::windows("getting muted state", e))?;
            Ok(muted.as_bool())
        }
    }

    fn set_mute(&self, muted: bool) -> Result<(), AudioError> {
        unsafe {
            self.endpoint_volume
                .SetMute(muted, std::ptr::null())
                .map_err(|e| AudioError::windows("setting mute", e))
        }
    }

    fn get_master_volume(&self) -> Result<f32, AudioError> {
        unsafe {
            self.endpoint_volume
                .GetMasterVolumeLevelScalar()
                .map_err(|e| AudioError::windows("getting volume", e))
        }
    }

    fn set_master_volume(&self, level: f32) -> Result<(), AudioError> {
        unsafe {
            self.endpoint_volume
                .SetMasterVolumeLevelScalar(level, std::ptr::null())
                .map_err(|e| AudioError::windows("setting volume", e))
        }
    }
}
