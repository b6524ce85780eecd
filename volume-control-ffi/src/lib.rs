//! FFI bindings for audio endpoint volume control.
//!
//! This crate provides C ABI functions for host runtimes. All functions use
//! panic::catch_unwind to prevent Rust panics from unwinding across the FFI
//! boundary.
//!
//! An engine instance is not reentrant; the host must serialize calls on one
//! handle.

mod config;

pub use config::{BackendKind, EngineConfig, SimulatedDeviceConfig};

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::ffi::{c_char, c_void, CStr, CString};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use volume_control_rs::{
    AudioEndpointController, AudioError, ComGuard, DeviceDescriptor, VolumeControl,
};

// ============================================================================
// Error Handling
// ============================================================================

/// Error codes returned by FFI functions.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Success = 0,
    InvalidHandle = -1,
    InvalidArgument = -2,
    PlatformError = -3,
    JsonError = -4,
    NotInitialized = -5,
    Panic = -99,
}

impl From<&AudioError> for ErrorCode {
    fn from(err: &AudioError) -> Self {
        match err {
            AudioError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            AudioError::Platform { .. } => ErrorCode::PlatformError,
        }
    }
}

/// Failure of one FFI call, before it is recorded as the last error.
#[derive(Debug)]
struct FfiError {
    code: ErrorCode,
    message: String,
}

impl FfiError {
    fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<AudioError> for FfiError {
    fn from(err: AudioError) -> Self {
        Self::new(ErrorCode::from(&err), err.to_string())
    }
}

/// Thread-local storage for the last error.
thread_local! {
    static LAST_ERROR: RefCell<Option<(ErrorCode, String)>> = const { RefCell::new(None) };
}

fn set_last_error(code: ErrorCode, message: impl Into<String>) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = Some((code, message.into()));
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

// ============================================================================
// Platform Runtime
// ============================================================================

thread_local! {
    static RUNTIME: RefCell<Option<ComGuard>> = const { RefCell::new(None) };
}

fn runtime_initialized() -> bool {
    RUNTIME.with(|r| r.borrow().is_some())
}

// ============================================================================
// Data Types for JSON Serialization
// ============================================================================

/// A render device as reported to the host.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeviceDto {
    pub id: String,
    pub name: String,
    pub is_active: bool,
}

/// Response containing the captured device list.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeviceListResponse {
    pub devices: Vec<DeviceDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_device_id: Option<String>,
}

impl DeviceListResponse {
    fn from_control(control: &dyn VolumeControl) -> Self {
        let active = control.active_device_id();
        Self {
            devices: control
                .devices()
                .iter()
                .map(|d: &DeviceDescriptor| DeviceDto {
                    id: d.id.clone(),
                    name: d.name.clone(),
                    is_active: active == Some(d.id.as_str()),
                })
                .collect(),
            active_device_id: active.map(str::to_string),
        }
    }
}

/// Response containing operation result.
#[derive(Debug, Serialize, Deserialize)]
pub struct OperationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_muted: Option<bool>,
}

// ============================================================================
// Engine Handle Type
// ============================================================================

/// Opaque handle to a volume control engine. Actually points to an Engine struct.
pub type VolumeControlHandle = *mut c_void;

/// Internal engine state.
struct Engine {
    control: Box<dyn VolumeControl>,
}

impl Engine {
    fn from_config(config: &EngineConfig) -> Result<Self, FfiError> {
        let control: Box<dyn VolumeControl> = match config.backend {
            BackendKind::System => {
                if !runtime_initialized() {
                    return Err(FfiError::new(
                        ErrorCode::NotInitialized,
                        "volume_control_runtime_init() has not been called on this thread",
                    ));
                }
                Box::new(volume_control_rs::open_system_controller()?)
            }
            BackendKind::Memory => {
                let backend = config.memory_backend()?;
                Box::new(AudioEndpointController::new(backend)?)
            }
        };

        Ok(Self { control })
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Allocate a C string from a Rust string. Caller must free with volume_control_free_string.
fn alloc_c_string(s: &str) -> *mut c_char {
    // Interior nul bytes cannot cross the boundary, drop them
    let bytes: Vec<u8> = s.bytes().filter(|&b| b != 0).collect();
    CString::new(bytes).unwrap_or_default().into_raw()
}

/// Parse a C string to a Rust string slice.
unsafe fn parse_c_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

/// Run `f` with panics caught and failures recorded as the last error.
///
/// On failure the recorded error code is mapped to the return value with `on_error`.
fn guarded<T>(
    what: &str,
    on_error: impl FnOnce(ErrorCode) -> T,
    f: impl FnOnce() -> Result<T, FfiError>,
) -> T {
    clear_last_error();

    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => value,
        Ok(Err(e)) => {
            tracing::debug!(code = ?e.code, message = %e.message, "{} failed", what);
            let code = e.code;
            set_last_error(code, e.message);
            on_error(code)
        }
        Err(_) => {
            set_last_error(ErrorCode::Panic, format!("Panic during {what}"));
            on_error(ErrorCode::Panic)
        }
    }
}

fn status(code: ErrorCode) -> i32 {
    code as i32
}

fn null<T>(_: ErrorCode) -> *mut T {
    ptr::null_mut()
}

/// Borrow the engine behind a handle.
///
/// # Safety
/// `handle` must be null or a live handle from volume_control_create().
unsafe fn engine<'a>(handle: VolumeControlHandle) -> Result<&'a mut Engine, FfiError> {
    (handle as *mut Engine)
        .as_mut()
        .ok_or_else(|| FfiError::new(ErrorCode::InvalidHandle, "Invalid engine handle"))
}

fn device_index(index: i32) -> Result<usize, FfiError> {
    usize::try_from(index).map_err(|_| {
        FfiError::new(
            ErrorCode::InvalidArgument,
            format!("Invalid argument: device index {index} is negative"),
        )
    })
}

fn to_status(result: Result<(), FfiError>) -> Result<i32, FfiError> {
    result.map(|()| ErrorCode::Success as i32)
}

// ============================================================================
// FFI Functions - Runtime
// ============================================================================

/// Initialize the platform audio subsystem (COM) for the calling thread.
///
/// Must be called before creating a system-backed engine, from the thread
/// that will use it. Calling it again while initialized is a no-op.
///
/// # Returns
/// 0 on success, negative error code on failure.
#[no_mangle]
pub extern "C" fn volume_control_runtime_init() -> i32 {
    guarded("runtime init", status, || {
        RUNTIME.with(|r| -> Result<i32, FfiError> {
            let mut runtime = r.borrow_mut();
            if runtime.is_none() {
                *runtime = Some(ComGuard::new()?);
            }
            Ok(ErrorCode::Success as i32)
        })
    })
}

/// Tear down the platform audio subsystem for the calling thread.
///
/// All system-backed engines created on this thread must be destroyed first.
#[no_mangle]
pub extern "C" fn volume_control_runtime_shutdown() {
    let _ = panic::catch_unwind(|| {
        RUNTIME.with(|r| r.borrow_mut().take());
    });
}

// ============================================================================
// FFI Functions - Lifecycle
// ============================================================================

/// Create a new engine instance.
///
/// Enumerates the active render devices once and activates the default one.
///
/// # Arguments
/// * `config_json` - JSON configuration string (can be null for defaults)
///
/// # Returns
/// Handle to the engine, or null on failure. Check volume_control_last_error_code() on failure.
///
/// # Safety
/// The returned handle must be freed with volume_control_destroy().
#[no_mangle]
pub extern "C" fn volume_control_create(config_json: *const c_char) -> VolumeControlHandle {
    guarded("engine creation", null, || {
        let config = if config_json.is_null() {
            EngineConfig::default()
        } else {
            let json = unsafe { parse_c_str(config_json) }
                .ok_or_else(|| FfiError::new(ErrorCode::InvalidArgument, "Config is not valid UTF-8"))?;
            EngineConfig::from_json(json)?
        };
        config::init_logging(config.log_level.as_deref());

        let engine = Box::new(Engine::from_config(&config)?);
        tracing::info!(
            backend = ?config.backend,
            devices = engine.control.device_count(),
            "Created volume control engine"
        );
        Ok(Box::into_raw(engine) as VolumeControlHandle)
    })
}

/// Destroy an engine instance, releasing its active endpoint.
///
/// # Safety
/// The handle must have been created by volume_control_create() and must not be used after this call.
#[no_mangle]
pub extern "C" fn volume_control_destroy(handle: VolumeControlHandle) {
    if handle.is_null() {
        return;
    }

    let _ = panic::catch_unwind(|| unsafe {
        let _ = Box::from_raw(handle as *mut Engine);
    });
}

// ============================================================================
// FFI Functions - Device Operations
// ============================================================================

/// Get the number of render devices captured at creation.
///
/// # Returns
/// Device count, or negative error code on failure.
#[no_mangle]
pub extern "C" fn volume_control_get_number_of_devices(handle: VolumeControlHandle) -> i32 {
    guarded("get number of devices", status, || {
        let engine = unsafe { engine(handle)? };
        Ok(i32::try_from(engine.control.device_count()).unwrap_or(i32::MAX))
    })
}

/// Get the friendly name of the device at `index`.
///
/// # Returns
/// Name string. Caller must free with volume_control_free_string().
/// Returns null on failure (invalid handle or index out of range).
#[no_mangle]
pub extern "C" fn volume_control_get_device_name(
    handle: VolumeControlHandle,
    index: i32,
) -> *mut c_char {
    guarded("get device name", null, || {
        let engine = unsafe { engine(handle)? };
        let name = engine.control.device_name(device_index(index)?)?;
        Ok(alloc_c_string(name))
    })
}

/// Get the platform ID of the device at `index`.
///
/// # Returns
/// ID string. Caller must free with volume_control_free_string().
/// Returns null on failure (invalid handle or index out of range).
#[no_mangle]
pub extern "C" fn volume_control_get_device_id(
    handle: VolumeControlHandle,
    index: i32,
) -> *mut c_char {
    guarded("get device id", null, || {
        let engine = unsafe { engine(handle)? };
        let id = engine.control.device_id(device_index(index)?)?;
        Ok(alloc_c_string(id))
    })
}

/// Get all captured devices.
///
/// # Returns
/// JSON string containing the device list and the active device ID.
/// Caller must free with volume_control_free_string(). Returns null on failure.
#[no_mangle]
pub extern "C" fn volume_control_get_devices(handle: VolumeControlHandle) -> *mut c_char {
    guarded("device listing", null, || {
        let engine = unsafe { engine(handle)? };
        let response = DeviceListResponse::from_control(engine.control.as_ref());
        let json = serde_json::to_string(&response)
            .map_err(|e| FfiError::new(ErrorCode::JsonError, e.to_string()))?;
        Ok(alloc_c_string(&json))
    })
}

/// Make the device with `device_id` the active endpoint.
///
/// # Returns
/// 1 if switched, 0 if no captured device has that ID, negative error code on failure.
/// On failure the previously active device stays active.
#[no_mangle]
pub extern "C" fn volume_control_switch_audio_device(
    handle: VolumeControlHandle,
    device_id: *const c_char,
) -> i32 {
    guarded("switch audio device", status, || {
        let engine = unsafe { engine(handle)? };
        let id = unsafe { parse_c_str(device_id) }
            .ok_or_else(|| FfiError::new(ErrorCode::InvalidArgument, "Invalid device ID"))?;
        Ok(i32::from(engine.control.switch_active_device(id)?))
    })
}

// ============================================================================
// FFI Functions - Volume and Mute
// ============================================================================

/// Get the master volume of the active device.
///
/// # Arguments
/// * `out_volume` - Receives the volume level (0.0 to 1.0)
///
/// # Returns
/// 0 on success, negative error code on failure.
#[no_mangle]
pub extern "C" fn volume_control_get_volume(
    handle: VolumeControlHandle,
    out_volume: *mut f32,
) -> i32 {
    guarded("get volume", status, || {
        let engine = unsafe { engine(handle)? };
        if out_volume.is_null() {
            return Err(FfiError::new(ErrorCode::InvalidArgument, "Null output pointer"));
        }
        let level = engine.control.volume()?;
        unsafe { *out_volume = level };
        Ok(ErrorCode::Success as i32)
    })
}

/// Set the master volume of the active device.
///
/// # Arguments
/// * `volume` - Volume level, 0.0 to 1.0 inclusive
///
/// # Returns
/// 0 on success, negative error code on failure.
#[no_mangle]
pub extern "C" fn volume_control_set_volume(handle: VolumeControlHandle, volume: f32) -> i32 {
    guarded("set volume", status, || {
        let engine = unsafe { engine(handle)? };
        to_status(engine.control.set_volume(volume).map_err(FfiError::from))
    })
}

/// Get the mute state of the active device.
///
/// # Returns
/// 1 = muted, 0 = unmuted, negative error code on failure.
#[no_mangle]
pub extern "C" fn volume_control_is_muted(handle: VolumeControlHandle) -> i32 {
    guarded("get mute", status, || {
        let engine = unsafe { engine(handle)? };
        Ok(i32::from(engine.control.is_muted()?))
    })
}

/// Set the mute state of the active device.
///
/// # Arguments
/// * `muted` - 1 = muted, 0 = unmuted
///
/// # Returns
/// 0 on success, negative error code on failure.
#[no_mangle]
pub extern "C" fn volume_control_set_muted(handle: VolumeControlHandle, muted: i32) -> i32 {
    guarded("set mute", status, || {
        let engine = unsafe { engine(handle)? };
        to_status(engine.control.set_muted(muted != 0).map_err(FfiError::from))
    })
}

/// Toggle the mute state of the active device.
///
/// # Returns
/// JSON string with the result (includes new mute state). Caller must free with volume_control_free_string().
/// Returns null on failure.
#[no_mangle]
pub extern "C" fn volume_control_toggle_mute(handle: VolumeControlHandle) -> *mut c_char {
    guarded("toggle mute", null, || {
        let engine = unsafe { engine(handle)? };
        let is_muted = engine.control.toggle_mute()?;

        let response = OperationResult {
            success: true,
            error: None,
            is_muted: Some(is_muted),
        };
        let json = serde_json::to_string(&response)
            .map_err(|e| FfiError::new(ErrorCode::JsonError, e.to_string()))?;
        Ok(alloc_c_string(&json))
    })
}

// ============================================================================
// FFI Functions - Memory Management
// ============================================================================

/// Free a string allocated by this library.
///
/// # Safety
/// The pointer must have been returned by one of the volume_control_* functions.
/// Do not call this on strings from other sources.
#[no_mangle]
pub extern "C" fn volume_control_free_string(ptr: *mut c_char) {
    if ptr.is_null() {
        return;
    }

    let _ = panic::catch_unwind(|| unsafe {
        let _ = CString::from_raw(ptr);
    });
}

// ============================================================================
// FFI Functions - Error Handling
// ============================================================================

/// Get the last error code.
///
/// # Returns
/// The error code from the last failed operation, or 0 if no error.
#[no_mangle]
pub extern "C" fn volume_control_last_error_code() -> i32 {
    LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .map(|(code, _)| *code as i32)
            .unwrap_or(0)
    })
}

/// Get the last error message.
///
/// # Returns
/// Error message string. Caller must free with volume_control_free_string().
/// Returns null if no error.
#[no_mangle]
pub extern "C" fn volume_control_last_error_message() -> *mut c_char {
    LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .map(|(_, msg)| alloc_c_string(msg))
            .unwrap_or(ptr::null_mut())
    })
}

// ============================================================================
// FFI Functions - Utility
// ============================================================================

/// Get the library version.
///
/// # Returns
/// Version string. Caller must free with volume_control_free_string().
#[no_mangle]
pub extern "C" fn volume_control_version() -> *mut c_char {
    alloc_c_string(env!("CARGO_PKG_VERSION"))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_DEVICES: &str = r#"{
        "backend": "memory",
        "devices": [
            { "id": "dev-A", "name": "Speakers", "volume": 0.5 },
            { "id": "dev-B", "name": "Headphones", "volume": 0.2, "muted": true }
        ]
    }"#;

    fn create(config: &str) -> VolumeControlHandle {
        let config = CString::new(config).unwrap();
        volume_control_create(config.as_ptr())
    }

    fn take_string(ptr: *mut c_char) -> String {
        assert!(!ptr.is_null());
        let s = unsafe { CStr::from_ptr(ptr).to_str().unwrap().to_string() };
        volume_control_free_string(ptr);
        s
    }

    fn switch(handle: VolumeControlHandle, id: &str) -> i32 {
        let id = CString::new(id).unwrap();
        volume_control_switch_audio_device(handle, id.as_ptr())
    }

    #[test]
    fn test_error_code_conversion() {
        assert_eq!(
            ErrorCode::from(&AudioError::invalid_argument("bad index")),
            ErrorCode::InvalidArgument
        );
        assert_eq!(
            ErrorCode::from(&AudioError::platform("getting volume", -1, "failed")),
            ErrorCode::PlatformError
        );
    }

    #[test]
    fn test_engine_lifecycle() {
        let handle = create(TWO_DEVICES);
        assert!(!handle.is_null());
        assert_eq!(volume_control_last_error_code(), 0);
        volume_control_destroy(handle);
    }

    #[test]
    fn test_end_to_end_device_operations() {
        let handle = create(TWO_DEVICES);

        assert_eq!(volume_control_get_number_of_devices(handle), 2);
        assert_eq!(take_string(volume_control_get_device_name(handle, 1)), "Headphones");
        assert_eq!(take_string(volume_control_get_device_id(handle, 0)), "dev-A");

        assert_eq!(switch(handle, "dev-B"), 1);
        assert_eq!(switch(handle, "dev-Z"), 0);
        assert_eq!(volume_control_get_number_of_devices(handle), 2);

        let mut level = 0.0f32;
        assert_eq!(volume_control_get_volume(handle, &mut level), 0);
        assert_eq!(level, 0.2);
        assert_eq!(volume_control_is_muted(handle), 1);

        volume_control_destroy(handle);
    }

    #[test]
    fn test_index_out_of_range() {
        let handle = create(TWO_DEVICES);

        assert!(volume_control_get_device_name(handle, 2).is_null());
        assert_eq!(volume_control_last_error_code(), ErrorCode::InvalidArgument as i32);

        assert!(volume_control_get_device_id(handle, -1).is_null());
        assert_eq!(volume_control_last_error_code(), ErrorCode::InvalidArgument as i32);
        let message = take_string(volume_control_last_error_message());
        assert!(message.contains("negative"));

        volume_control_destroy(handle);
    }

    #[test]
    fn test_volume_and_mute() {
        let handle = create(TWO_DEVICES);

        assert_eq!(volume_control_set_volume(handle, 0.37), 0);
        let mut level = 0.0f32;
        volume_control_get_volume(handle, &mut level);
        assert_eq!(level, 0.37);

        assert_eq!(volume_control_set_volume(handle, 1.01), ErrorCode::InvalidArgument as i32);
        assert_eq!(volume_control_set_volume(handle, -0.01), ErrorCode::InvalidArgument as i32);
        volume_control_get_volume(handle, &mut level);
        assert_eq!(level, 0.37);

        assert_eq!(volume_control_set_muted(handle, 1), 0);
        assert_eq!(volume_control_is_muted(handle), 1);
        assert_eq!(volume_control_set_muted(handle, 0), 0);
        assert_eq!(volume_control_is_muted(handle), 0);

        let json = take_string(volume_control_toggle_mute(handle));
        let result: OperationResult = serde_json::from_str(&json).unwrap();
        assert!(result.success);
        assert_eq!(result.is_muted, Some(true));

        volume_control_destroy(handle);
    }

    #[test]
    fn test_get_devices_json() {
        let handle = create(TWO_DEVICES);
        assert_eq!(switch(handle, "dev-B"), 1);

        let json = take_string(volume_control_get_devices(handle));
        let response: DeviceListResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(response.devices.len(), 2);
        assert_eq!(response.active_device_id.as_deref(), Some("dev-B"));
        assert!(!response.devices[0].is_active);
        assert!(response.devices[1].is_active);

        volume_control_destroy(handle);
    }

    #[test]
    fn test_null_handle_and_arguments() {
        assert_eq!(
            volume_control_get_number_of_devices(ptr::null_mut()),
            ErrorCode::InvalidHandle as i32
        );
        assert_eq!(volume_control_is_muted(ptr::null_mut()), ErrorCode::InvalidHandle as i32);

        let handle = create(TWO_DEVICES);
        assert_eq!(
            volume_control_switch_audio_device(handle, ptr::null()),
            ErrorCode::InvalidArgument as i32
        );
        assert_eq!(
            volume_control_get_volume(handle, ptr::null_mut()),
            ErrorCode::InvalidArgument as i32
        );
        volume_control_destroy(handle);
    }

    #[test]
    fn test_create_failures() {
        assert!(create("{ not json").is_null());
        assert_eq!(volume_control_last_error_code(), ErrorCode::JsonError as i32);

        assert!(create(r#"{ "backend": "memory" }"#).is_null());
        assert_eq!(volume_control_last_error_code(), ErrorCode::PlatformError as i32);

        assert!(volume_control_create(ptr::null()).is_null());
        assert_eq!(volume_control_last_error_code(), ErrorCode::NotInitialized as i32);
    }

    #[cfg(not(windows))]
    #[test]
    fn test_system_backend_unsupported() {
        assert_eq!(volume_control_runtime_init(), 0);
        assert!(volume_control_create(ptr::null()).is_null());
        assert_eq!(volume_control_last_error_code(), ErrorCode::PlatformError as i32);
        volume_control_runtime_shutdown();
    }

    #[test]
    fn test_version() {
        let version = volume_control_version();
        assert!(!version.is_null());
        unsafe {
            let s = CStr::from_ptr(version).to_str().unwrap();
            assert!(!s.is_empty());
        }
        volume_control_free_string(version);
    }
}
