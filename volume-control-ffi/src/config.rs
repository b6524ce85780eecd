//! Engine configuration passed as JSON to volume_control_create().

use super::{ErrorCode, FfiError};
use serde::{Deserialize, Serialize};
use std::sync::Once;
use tracing_subscriber::EnvFilter;
use volume_control_rs::audio::validate_volume;
use volume_control_rs::MemoryBackend;

const DEFAULT_LOG_FILTER: &str = "info";

/// Which audio host an engine talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// The platform's native audio subsystem
    #[default]
    System,

    /// A simulated in-memory host described by the config
    Memory,
}

/// One device of a simulated host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedDeviceConfig {
    pub id: String,
    pub name: String,
    #[serde(default = "full_volume")]
    pub volume: f32,
    #[serde(default)]
    pub muted: bool,
}

fn full_volume() -> f32 {
    1.0
}

/// Configuration for engine creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Tracing filter directive, e.g. "debug" or "volume_control_rs=trace"
    #[serde(default)]
    pub log_level: Option<String>,

    #[serde(default)]
    pub backend: BackendKind,

    /// Devices of the simulated host (memory backend only)
    #[serde(default)]
    pub devices: Vec<SimulatedDeviceConfig>,

    /// Default device of the simulated host; the first device if absent
    #[serde(default)]
    pub default_device: Option<String>,
}

impl EngineConfig {
    pub(crate) fn from_json(json: &str) -> Result<Self, FfiError> {
        serde_json::from_str(json).map_err(|e| {
            FfiError::new(ErrorCode::JsonError, format!("Invalid engine config: {e}"))
        })
    }

    /// Build the simulated host described by this config.
    pub(crate) fn memory_backend(&self) -> Result<MemoryBackend, FfiError> {
        let backend = MemoryBackend::new();
        for device in &self.devices {
            validate_volume(device.volume)?;
            backend.add_device(&device.id, &device.name, device.volume, device.muted);
        }

        if let Some(id) = &self.default_device {
            if !backend.set_default_device(id) {
                return Err(FfiError::new(
                    ErrorCode::InvalidArgument,
                    format!("Invalid argument: default device {id} is not configured"),
                ));
            }
        }

        Ok(backend)
    }
}

/// Install the fmt subscriber, once per process.
///
/// The filter comes from `level`, then `RUST_LOG`, then defaults to "info".
pub(crate) fn init_logging(level: Option<&str>) {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let filter = level
            .and_then(|l| EnvFilter::try_new(l).ok())
            .or_else(|| EnvFilter::try_from_default_env().ok())
            .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER));

        // The host may already have installed a subscriber
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use volume_control_rs::{AudioEndpointController, VolumeControl};

    #[test]
    fn test_empty_config_defaults_to_system() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config.backend, BackendKind::System);
        assert!(config.devices.is_empty());
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_memory_config_builds_host() {
        let config = EngineConfig::from_json(
            r#"{
                "backend": "memory",
                "devices": [
                    { "id": "dev-A", "name": "Speakers" },
                    { "id": "dev-B", "name": "Headphones", "volume": 0.25, "muted": true }
                ],
                "default_device": "dev-B"
            }"#,
        )
        .unwrap();

        let backend = config.memory_backend().unwrap();
        assert_eq!(backend.device_volume("dev-A"), Some(1.0));

        let control = AudioEndpointController::new(backend).unwrap();
        assert_eq!(control.active_device_id(), Some("dev-B"));
        assert_eq!(control.volume().unwrap(), 0.25);
        assert!(control.is_muted().unwrap());
    }

    #[test]
    fn test_unknown_default_device_rejected() {
        let config = EngineConfig {
            backend: BackendKind::Memory,
            devices: vec![SimulatedDeviceConfig {
                id: "dev-A".to_string(),
                name: "Speakers".to_string(),
                volume: 0.5,
                muted: false,
            }],
            default_device: Some("dev-Z".to_string()),
            ..Default::default()
        };
        let err = config.memory_backend().unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_out_of_range_device_volume_rejected() {
        let config = EngineConfig::from_json(
            r#"{ "backend": "memory", "devices": [{ "id": "a", "name": "A", "volume": 1.5 }] }"#,
        )
        .unwrap();
        let err = config.memory_backend().unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_malformed_json_is_json_error() {
        let err = EngineConfig::from_json("{ backend: ").unwrap_err();
        assert_eq!(err.code, ErrorCode::JsonError);

        let err = EngineConfig::from_json(r#"{ "backend": "alsa" }"#).unwrap_err();
        assert_eq!(err.code, ErrorCode::JsonError);
    }
}
