//! Audio module for render endpoint control.
//!
//! This module provides render device enumeration, active endpoint switching,
//! and volume/mute control, over the Windows Core Audio API or a simulated
//! in-memory host.

pub mod backend;
pub mod com;
pub mod controller;
pub mod device;
pub mod memory;

#[cfg(windows)]
pub mod enumerator;
#[cfg(not(windows))]
pub mod unsupported;
#[cfg(windows)]
pub mod volume;

pub use backend::{AudioBackend, EndpointVolume};
pub use com::ComGuard;
pub use controller::{validate_volume, AudioEndpointController, VolumeControl};
pub use device::{AudioError, DeviceDescriptor};
pub use memory::MemoryBackend;

#[cfg(windows)]
pub use enumerator::WasapiBackend as SystemBackend;
#[cfg(not(windows))]
pub use unsupported::UnsupportedBackend as SystemBackend;
