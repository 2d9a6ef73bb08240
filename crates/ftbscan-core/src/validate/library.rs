/// Scoped ownership of a loaded plugin library.
///
/// A loaded executable image is a raw OS resource. `LoadedLibrary` closes
/// it exactly once: either through an explicit [`LoadedLibrary::release`] or
/// on drop, whichever comes first, so every early return in a probe is also
/// a release point.
///
/// A process-wide counter tracks how many handles are currently open. The
/// scanner never holds one across candidates, so the count returns to its
/// previous value after every validation; tests use it to prove that.
use libloading::Library;
use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

static LIVE_LIBRARIES: AtomicUsize = AtomicUsize::new(0);

/// Number of plugin libraries currently held open by the scanner.
pub fn live_library_count() -> usize {
    LIVE_LIBRARIES.load(Ordering::SeqCst)
}

pub struct LoadedLibrary {
    library: Option<Library>,
    /// Raw `dlopen` handle, for entry points that want it (VST3 `ModuleEntry`).
    native_handle: *mut c_void,
    path: PathBuf,
}

impl LoadedLibrary {
    /// Load the library at `path` with the platform loader.
    ///
    /// # Safety
    ///
    /// Loading runs the library's static initialisers, which is arbitrary
    /// third-party code.
    pub unsafe fn open(path: &Path) -> Result<Self, libloading::Error> {
        let (library, native_handle) = Self::load(path)?;
        LIVE_LIBRARIES.fetch_add(1, Ordering::SeqCst);
        debug!("Loaded library {}", path.display());
        Ok(Self {
            library: Some(library),
            native_handle,
            path: path.to_path_buf(),
        })
    }

    #[cfg(unix)]
    unsafe fn load(path: &Path) -> Result<(Library, *mut c_void), libloading::Error> {
        let unix = libloading::os::unix::Library::new(path)?;
        let raw = unix.into_raw();
        let library = Library::from(libloading::os::unix::Library::from_raw(raw));
        Ok((library, raw))
    }

    #[cfg(not(unix))]
    unsafe fn load(path: &Path) -> Result<(Library, *mut c_void), libloading::Error> {
        Ok((Library::new(path)?, std::ptr::null_mut()))
    }

    /// Resolve an exported function. `name` must be NUL-terminated.
    ///
    /// # Safety
    ///
    /// `F` must match the real signature of the export, and the returned
    /// pointer must not be called after this library is released.
    pub unsafe fn function<F: Copy>(&self, name: &[u8]) -> Option<F> {
        let library = self.library.as_ref()?;
        library.get::<F>(name).ok().map(|symbol| *symbol)
    }

    /// Resolve an exported data symbol to a pointer to its storage.
    ///
    /// # Safety
    ///
    /// `T` must match the exported object's layout, and the pointer must not
    /// be dereferenced after this library is released.
    pub unsafe fn data<T>(&self, name: &[u8]) -> Option<*const T> {
        let library = self.library.as_ref()?;
        let symbol = library.get::<*const T>(name).ok()?;
        let ptr = *symbol;
        if ptr.is_null() {
            None
        } else {
            Some(ptr)
        }
    }

    /// Raw loader handle; null on platforms where it is not exposed.
    pub fn native_handle(&self) -> *mut c_void {
        self.native_handle
    }

    /// Unload the library now.
    pub fn release(mut self) {
        self.close();
    }

    fn close(&mut self) {
        if let Some(library) = self.library.take() {
            if let Err(err) = library.close() {
                warn!("Failed to unload {}: {err}", self.path.display());
            }
            LIVE_LIBRARIES.fetch_sub(1, Ordering::SeqCst);
            debug!("Released library {}", self.path.display());
        }
    }
}

impl Drop for LoadedLibrary {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_fails_to_open() {
        let result = unsafe { LoadedLibrary::open(Path::new("/definitely/not/here.clap")) };
        assert!(result.is_err());
    }
}
