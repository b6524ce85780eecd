//! Render device enumeration using Windows MMDevice API.
//!
//! Note: COM must be initialized (see [`ComGuard`](super::com::ComGuard)) on
//! the calling thread before any of this is used.

use super::backend::AudioBackend;
use super::device::AudioError;
use super::volume::WasapiEndpoint;
use windows::core::PWSTR;
use windows::Win32::Devices::Properties::DEVPKEY_Device_FriendlyName;
use windows::Win32::Foundation::E_UNEXPECTED;
use windows::Win32::Media::Audio::{
    eConsole, eRender, IMMDevice, IMMDeviceEnumerator, MMDeviceEnumerator, DEVICE_STATE_ACTIVE,
};
use windows::Win32::System::Com::{CoCreateInstance, CoTaskMemFree, CLSCTX_ALL, STGM_READ};
use windows::Win32::UI::Shell::PropertiesSystem::{IPropertyStore, PROPERTYKEY};

/// Audio backend over `IMMDeviceEnumerator`.
pub struct WasapiBackend {
    enumerator: IMMDeviceEnumerator,
}

impl WasapiBackend {
    /// Create the MMDevice enumerator.
    pub fn new() -> Result<Self, AudioError> {
        unsafe {
            let enumerator: IMMDeviceEnumerator =
                CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL).map_err(|e| {
                    AudioError::windows("getting a handle to the MMDeviceEnumerator", e)
                })?;

            Ok(Self { enumerator })
        }
    }
}

impl AudioBackend for WasapiBackend {
    type Device = IMMDevice;
    type Endpoint = WasapiEndpoint;

    fn enumerate_render_devices(&self) -> Result<Vec<IMMDevice>, AudioError> {
        unsafe {
            let collection = self
                .enumerator
                .EnumAudioEndpoints(eRender, DEVICE_STATE_ACTIVE)
                .map_err(|e| AudioError::windows("enumerating audio endpoints", e))?;

            let count = collection
                .GetCount()
                .map_err(|e| AudioError::windows("counting audio endpoints", e))?;

            let mut devices = Vec::with_capacity(count as usize);
            for i in 0..count {
                let device = collection
                    .Item(i)
                    .map_err(|e| AudioError::windows("reading an audio endpoint", e))?;
                devices.push(device);
            }

            Ok(devices)
        }
    }

    fn device_id(&self, device: &IMMDevice) -> Result<String, AudioError> {
        unsafe {
            let id = device
                .GetId()
                .map_err(|e| AudioError::windows("reading device id", e))?;
            let id_string = take_co_string(id);
            id_string.map_err(|e| {
                AudioError::platform("reading device id", E_UNEXPECTED.0, e.to_string())
            })
        }
    }

    fn friendly_name(&self, device: &IMMDevice) -> Result<String, AudioError> {
        unsafe {
            let props: IPropertyStore = device
                .OpenPropertyStore(STGM_READ)
                .map_err(|e| AudioError::windows("opening device property store", e))?;

            // Convert DEVPROPKEY to PROPERTYKEY
            let key = PROPERTYKEY {
                fmtid: DEVPKEY_Device_FriendlyName.fmtid,
                pid: DEVPKEY_Device_FriendlyName.pid,
            };

            let prop = props
                .GetValue(&key)
                .map_err(|e| AudioError::windows("reading device friendly name", e))?;

            let name = prop.to_string();
            if name.is_empty() {
                Err(AudioError::platform(
                    "reading device friendly name",
                    E_UNEXPECTED.0,
                    "friendly name is empty",
                ))
            } else {
                Ok(name)
            }
        }
    }

    fn default_render_device(&self) -> Result<IMMDevice, AudioError> {
        unsafe {
            self.enumerator
                .GetDefaultAudioEndpoint(eRender, eConsole)
                .map_err(|e| AudioError::windows("getting a handle to the default audio endpoint", e))
        }
    }

    fn activate_volume(&self, device: &IMMDevice) -> Result<WasapiEndpoint, AudioError> {
        WasapiEndpoint::new(device)
    }
}

/// Copy a COM-allocated wide string and free it.
unsafe fn take_co_string(ptr: PWSTR) -> Result<String, std::string::FromUtf16Error> {
    let result = ptr.to_string();
    CoTaskMemFree(Some(ptr.0 as *const _));
    result
}
