//! Audio Endpoint Volume Control - Library
//!
//! Controls the volume and mute state of one active audio output device and
//! switches between the output devices present when it was created.
//!
//! ## Features
//!
//! - Snapshot of all active render devices (ID and friendly name)
//! - Volume and mute control of the active device
//! - Switch the active device by ID
//! - Simulated in-memory host for tests and non-Windows hosts

pub mod audio;

pub use audio::{
    AudioBackend, AudioEndpointController, AudioError, ComGuard, DeviceDescriptor,
    EndpointVolume, MemoryBackend, SystemBackend, VolumeControl,
};

/// Controller over the platform's native audio subsystem.
pub type SystemController = AudioEndpointController<SystemBackend>;

/// Open the native audio subsystem and activate the default render device.
///
/// A [`ComGuard`] must be held on the calling thread.
pub fn open_system_controller() -> Result<SystemController, AudioError> {
    AudioEndpointController::new(SystemBackend::new()?)
}
