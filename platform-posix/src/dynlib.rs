// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::ffi::{c_void, CStr, CString};
use std::fmt::Write as _;
use std::os::unix::ffi::OsStrExt;

use platform::{
    CpStr, DynamicLibraries, ErrorKind, LibraryHandle, PlatformError, PlatformResult,
};

use crate::PosixPlatform;

/// A handle returned by `dlopen`. Never `dlclose`d; plugins stay loaded for
/// the life of the process.
#[derive(Clone, Copy)]
pub(crate) struct LibraryPtr(*mut c_void);

// Safety: the pointer is an opaque token for dlsym; the dynamic linker's
// own locking makes that safe from any thread.
unsafe impl Send for LibraryPtr {}
unsafe impl Sync for LibraryPtr {}

/// The recorded details of the most recent load/lookup failure, consumed by
/// [`DynamicLibraries::library_error_details`].
pub(crate) struct DynlibFailure {
    message: String,
    /// Whether the failing library came from the plugins directory; only
    /// then do end-user remediation hints make sense.
    plugin: bool,
}

fn dlerror_message() -> String {
    let text = unsafe { libc::dlerror() };
    if text.is_null() {
        String::from("unknown dynamic linker error")
    } else {
        unsafe { CStr::from_ptr(text) }.to_string_lossy().into_owned()
    }
}

impl PosixPlatform {
    fn record_dynlib_failure(&self, path: &CpStr) -> PlatformError {
        let plugin = path.starts_with_caseless(CpStr::from_bytes(b"plugins/"));
        *self.dynlib_failure.lock().unwrap() = Some(DynlibFailure {
            message: dlerror_message(),
            plugin,
        });
        // dlerror has no error code to attach; the message is retrieved
        // via library_error_details instead.
        PlatformError::new(ErrorKind::Other)
    }
}

impl DynamicLibraries for PosixPlatform {
    fn library_load(&self, path: &CpStr) -> PlatformResult<LibraryHandle> {
        let native = self.native_path(path);
        let native = CString::new(native.as_os_str().as_bytes())
            .map_err(|_| PlatformError::new(ErrorKind::InvalidArgument))?;

        let lib = unsafe { libc::dlopen(native.as_ptr(), libc::RTLD_NOW) };
        if lib.is_null() {
            return Err(self.record_dynlib_failure(path));
        }
        Ok(LibraryHandle::new(self.libraries.insert(LibraryPtr(lib))))
    }

    fn library_symbol(
        &self,
        library: LibraryHandle,
        name: &str,
    ) -> PlatformResult<*const c_void> {
        let LibraryPtr(lib) = self
            .libraries
            .get(library.inner())
            .ok_or(PlatformError::new(ErrorKind::InvalidArgument))?;
        let name =
            CString::new(name).map_err(|_| PlatformError::new(ErrorKind::InvalidArgument))?;

        // A symbol can legitimately resolve to null, so dlerror (cleared
        // first) is the actual failure signal, not the return value.
        unsafe { libc::dlerror() };
        let addr = unsafe { libc::dlsym(lib, name.as_ptr()) };
        let err = unsafe { libc::dlerror() };
        if !err.is_null() {
            let message = unsafe { CStr::from_ptr(err) }.to_string_lossy().into_owned();
            *self.dynlib_failure.lock().unwrap() = Some(DynlibFailure {
                message,
                plugin: false,
            });
            return Err(PlatformError::new(ErrorKind::Other));
        }
        Ok(addr as *const c_void)
    }

    fn library_error_details(&self) -> Option<String> {
        let failure = self.dynlib_failure.lock().unwrap().take()?;
        let mut text = failure.message;

        if failure.plugin {
            // The classic end-user failure: a plugin built for the other
            // pointer width.
            if text.contains("wrong ELF class") {
                let _ = write!(
                    text,
                    "\n    Try using a {}-bit version of the plugin instead",
                    8 * std::mem::size_of::<usize>()
                );
            }
            if text.contains("undefined symbol") {
                text.push_str("\n    The plugin or your game may be outdated");
            }
        }
        Some(text)
    }
}
