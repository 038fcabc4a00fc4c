// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

use core::ffi::c_void;

use alloc::string::String;

use crate::{CpStr, PlatformResult};

/// Platform-specific handle to a loaded dynamic library.
///
/// Libraries are never unloaded; plugins stay resident for the life of the
/// process.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LibraryHandle(u64);

impl LibraryHandle {
    /// Creates a new [`LibraryHandle`]. Should only be created in the
    /// platform implementation.
    pub fn new(id: u64) -> LibraryHandle {
        LibraryHandle(id)
    }

    /// The platform-specific id this handle was created with.
    pub fn inner(self) -> u64 {
        self.0
    }
}

/// Dynamic library loading, used by the plugin system.
pub trait DynamicLibraries {
    /// Loads the named shared library.
    ///
    /// `path` should already include the platform's library extension (the
    /// plugin list is built from a directory enumeration, so it always
    /// does).
    fn library_load(&self, path: &CpStr) -> PlatformResult<LibraryHandle>;

    /// Resolves a symbol by name from a loaded library.
    fn library_symbol(
        &self,
        library: LibraryHandle,
        name: &str,
    ) -> PlatformResult<*const c_void>;

    /// Describes the most recent [`DynamicLibraries::library_load`] or
    /// [`DynamicLibraries::library_symbol`] failure, and clears it.
    ///
    /// Beyond the native loader's own message, the description includes
    /// remediation hints (a 32/64-bit mismatch, a renamed host executable)
    /// when the failing load came from the `plugins/` directory, since
    /// those are the failures end users actually hit and can fix.
    ///
    /// Returns None if no failure has happened since the last call.
    fn library_error_details(&self) -> Option<String>;
}
