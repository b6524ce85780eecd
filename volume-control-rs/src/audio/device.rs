//! Audio device data models.
//!
//! Defines the descriptor captured for every enumerated render device and the
//! error type shared by all backends.

use thiserror::Error;

/// Name used when a device's friendly name cannot be read.
pub const UNKNOWN_DEVICE_NAME: &str = "Unknown";

/// `E_NOTIMPL`, reported by backends for platforms without audio support.
pub const E_NOTIMPL: i32 = 0x8000_4001_u32 as i32;

/// `HRESULT_FROM_WIN32(ERROR_NOT_FOUND)`.
pub const E_NOTFOUND: i32 = 0x8007_0490_u32 as i32;

/// `AUDCLNT_E_DEVICE_INVALIDATED`, returned once an endpoint's device is gone.
pub const AUDCLNT_E_DEVICE_INVALIDATED: i32 = 0x8889_0004_u32 as i32;

/// One enumerated audio render device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Unique platform device ID (opaque string, e.g. from IMMDevice::GetId)
    pub id: String,

    /// Human-readable device name (from device properties)
    pub name: String,
}

impl DeviceDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Placeholder ID for a device whose ID could not be read.
    pub fn placeholder_id(index: usize) -> String {
        format!("unknown-device-{index}")
    }
}

/// Audio service error types.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AudioError {
    /// A caller-supplied value violated a documented precondition.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The platform audio service rejected or failed an operation.
    #[error("Error when {operation} (0x{code:08X}): {message}")]
    Platform {
        operation: &'static str,
        code: i32,
        message: String,
    },
}

impl AudioError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        AudioError::InvalidArgument(message.into())
    }

    pub fn platform(operation: &'static str, code: i32, message: impl Into<String>) -> Self {
        AudioError::Platform {
            operation,
            code,
            message: message.into(),
        }
    }

    /// Native failure code, if the error came from the platform.
    pub fn code(&self) -> Option<i32> {
        match self {
            AudioError::InvalidArgument(_) => None,
            AudioError::Platform { code, .. } => Some(*code),
        }
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, AudioError::InvalidArgument(_))
    }

    pub fn is_platform(&self) -> bool {
        matches!(self, AudioError::Platform { .. })
    }
}

#[cfg(windows)]
impl AudioError {
    /// Wrap a Windows API error, keeping its HRESULT.
    pub fn windows(operation: &'static str, err: windows::core::Error) -> Self {
        AudioError::Platform {
            operation,
            code: err.code().0,
            message: err.message(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_error_message_includes_code() {
        let err = AudioError::platform("getting volume", AUDCLNT_E_DEVICE_INVALIDATED, "gone");
        assert_eq!(
            err.to_string(),
            "Error when getting volume (0x88890004): gone"
        );
        assert_eq!(err.code(), Some(AUDCLNT_E_DEVICE_INVALIDATED));
        assert!(err.is_platform());
    }

    #[test]
    fn test_invalid_argument_has_no_code() {
        let err = AudioError::invalid_argument("index 3 out of range");
        assert!(err.is_invalid_argument());
        assert_eq!(err.code(), None);
        assert_eq!(err.to_string(), "Invalid argument: index 3 out of range");
    }

    #[test]
    fn test_placeholder_id() {
        assert_eq!(DeviceDescriptor::placeholder_id(2), "unknown-device-2");
    }
}
