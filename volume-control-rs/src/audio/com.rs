//! Scoped platform audio subsystem initialization.

use super::device::AudioError;
use std::marker::PhantomData;

/// COM initialization guard that uninitializes COM on drop.
///
/// Owned by the entry point of the thread that talks to the audio subsystem,
/// never by a controller. On platforms without COM this is a no-op.
pub struct ComGuard {
    // COM apartments are per thread
    _not_send: PhantomData<*mut ()>,
}

impl ComGuard {
    /// Initialize COM for the current thread.
    pub fn new() -> Result<Self, AudioError> {
        #[cfg(windows)]
        unsafe {
            use windows::Win32::System::Com::{CoInitializeEx, COINIT_APARTMENTTHREADED};

            CoInitializeEx(None, COINIT_APARTMENTTHREADED)
                .ok()
                .map_err(|e| AudioError::windows("initializing COM", e))?;
        }
        tracing::trace!(
            "Initialized audio subsystem on thread \"{}\"",
            std::thread::current().name().unwrap_or("")
        );

        Ok(Self {
            _not_send: PhantomData,
        })
    }
}

impl Drop for ComGuard {
    fn drop(&mut self) {
        #[cfg(windows)]
        unsafe {
            windows::Win32::System::Com::CoUninitialize();
        }
    }
}

impl std::fmt::Debug for ComGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComGuard").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guards_nest() {
        let outer = ComGuard::new().unwrap();
        let inner = ComGuard::new().unwrap();
        drop(inner);
        drop(outer);
    }
}
