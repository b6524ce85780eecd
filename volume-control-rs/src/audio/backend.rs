//! Platform contract the endpoint controller is written against.

use super::device::AudioError;

/// Device enumeration and endpoint activation services of a platform.
pub trait AudioBackend {
    /// Platform handle to one render device.
    type Device;

    /// Volume-control interface activated on a device.
    type Endpoint: EndpointVolume;

    /// Active render devices, in platform enumeration order.
    fn enumerate_render_devices(&self) -> Result<Vec<Self::Device>, AudioError>;

    /// Unique platform ID of a device.
    fn device_id(&self, device: &Self::Device) -> Result<String, AudioError>;

    /// Friendly display name of a device.
    fn friendly_name(&self, device: &Self::Device) -> Result<String, AudioError>;

    /// The system's current default render device.
    fn default_render_device(&self) -> Result<Self::Device, AudioError>;

    /// Activate the volume-control interface of a device.
    fn activate_volume(&self, device: &Self::Device) -> Result<Self::Endpoint, AudioError>;
}

/// Volume and mute control of one activated endpoint.
///
/// Dropping the value releases the platform handle.
pub trait EndpointVolume {
    fn get_mute(&self) -> Result<bool, AudioError>;

    fn set_mute(&self, muted: bool) -> Result<(), AudioError>;

    /// Master volume scalar (0.0 to 1.0).
    fn get_master_volume(&self) -> Result<f32, AudioError>;

    fn set_master_volume(&self, level: f32) -> Result<(), AudioError>;
}
