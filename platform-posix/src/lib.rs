// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! The reference [`Platform`] implementation for desktop POSIX systems.
//!
//! Most of the work is done through `std`; `libc` fills in what `std`
//! doesn't expose as-is (guardless pthread mutexes, `localtime_r`,
//! `strerror_r`, non-blocking BSD sockets, `dlopen`). Native error codes
//! are `errno` values.

use std::ffi::CStr;
use std::io::Write as _;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Mutex as StdMutex;

use platform::{
    decode_machine_id, CpStr, ErrorKind, Platform, PlatformError, PlatformResult,
};

mod clock;
mod dynlib;
mod fs;
mod net;
mod registry;
mod sync;

use dynlib::{DynlibFailure, LibraryPtr};
use registry::Registry;
use sync::{RawMutex, ThreadSlot, Waitable};

/// Translates an `errno` value into the portable error model.
///
/// This table is the whole of this backend's "recognized" error space;
/// everything else passes through as [`ErrorKind::Other`] with the raw
/// code attached for diagnostics.
pub(crate) fn errno_error(code: i32) -> PlatformError {
    let kind = if code == libc::ENOENT {
        ErrorKind::FileNotFound
    } else if code == libc::EEXIST {
        ErrorKind::DirectoryExists
    } else if code == libc::EINPROGRESS {
        ErrorKind::InProgress
    } else if code == libc::EAGAIN || code == libc::EWOULDBLOCK {
        ErrorKind::WouldBlock
    } else if code == libc::ETXTBSY {
        ErrorKind::ShareViolation
    } else if code == libc::ENOSYS {
        ErrorKind::NotSupported
    } else if code == libc::EINVAL {
        ErrorKind::InvalidArgument
    } else {
        ErrorKind::Other
    };
    PlatformError::native(kind, code)
}

/// Translates a `std::io::Error` (which wraps an `errno` here) into the
/// portable error model.
pub(crate) fn io_error(err: std::io::Error) -> PlatformError {
    match err.raw_os_error() {
        Some(code) => errno_error(code),
        None => PlatformError::new(ErrorKind::Other),
    }
}

/// Reads the calling thread's current `errno` as a [`PlatformError`].
pub(crate) fn last_errno() -> PlatformError {
    io_error(std::io::Error::last_os_error())
}

/// The desktop POSIX platform.
///
/// All handles returned from the platform traits index into internal
/// tables, so the handles themselves stay plain numbers and the native
/// resources stay owned by the platform object. Construct one per process;
/// everything takes `&self` and is thread-safe.
pub struct PosixPlatform {
    /// All paths given to the filesystem calls are resolved against this.
    root: PathBuf,
    started: std::time::Instant,
    pub(crate) files: Registry<std::sync::Arc<std::fs::File>>,
    pub(crate) threads: Registry<ThreadSlot>,
    pub(crate) mutexes: Registry<std::sync::Arc<RawMutex>>,
    pub(crate) waitables: Registry<std::sync::Arc<Waitable>>,
    pub(crate) sockets: Registry<libc::c_int>,
    pub(crate) libraries: Registry<LibraryPtr>,
    pub(crate) dynlib_failure: StdMutex<Option<DynlibFailure>>,
}

impl PosixPlatform {
    /// Creates a platform rooted at the current working directory, the
    /// desktop convention for where the client keeps its files.
    pub fn new() -> PosixPlatform {
        PosixPlatform::with_root(PathBuf::from("."))
    }

    /// Creates a platform with an explicit root directory. Used by tests,
    /// and by anyone embedding the client somewhere unusual.
    pub fn with_root(root: PathBuf) -> PosixPlatform {
        PosixPlatform {
            root,
            started: std::time::Instant::now(),
            files: Registry::new(),
            threads: Registry::new(),
            mutexes: Registry::new(),
            waitables: Registry::new(),
            sockets: Registry::new(),
            libraries: Registry::new(),
            dynlib_failure: StdMutex::new(None),
        }
    }

    pub(crate) fn native_path(&self, path: &CpStr) -> PathBuf {
        self.root.join(path.decode())
    }
}

impl Default for PosixPlatform {
    fn default() -> PosixPlatform {
        PosixPlatform::new()
    }
}

impl Platform for PosixPlatform {
    fn log(&self, message: &str) {
        // Nowhere to report a logging failure to, so don't try.
        let stdout = std::io::stdout();
        let mut stdout = stdout.lock();
        let _ = writeln!(stdout, "{message}");
    }

    fn describe_error(&self, error: &PlatformError) -> Option<String> {
        let code = error.native_code()?;

        let mut buffer = [0 as libc::c_char; 256];
        let res = unsafe { libc::strerror_r(code, buffer.as_mut_ptr(), buffer.len()) };
        if res != 0 {
            return None;
        }
        let text = unsafe { CStr::from_ptr(buffer.as_ptr()) }
            .to_string_lossy()
            .into_owned();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    fn machine_key(&self) -> PlatformResult<[u32; 4]> {
        // A host without a readable machine-id has no usable identity to
        // bind secrets to; that is NotSupported, not a file error.
        #[cfg(target_os = "linux")]
        {
            match std::fs::read_to_string("/etc/machine-id") {
                Ok(id) => Ok(decode_machine_id(&id)),
                Err(_) => Err(ErrorKind::NotSupported.into()),
            }
        }
        #[cfg(not(target_os = "linux"))]
        {
            Err(ErrorKind::NotSupported.into())
        }
    }

    fn start_open(&self, target: &CpStr) -> PlatformResult<()> {
        let opener = if cfg!(target_os = "macos") {
            "open"
        } else {
            "xdg-open"
        };
        Command::new(opener)
            .arg(target.decode())
            .spawn()
            .map(drop)
            .map_err(io_error)
    }

    fn exit(&self, clean: bool) -> ! {
        std::process::exit(if clean { 0 } else { 1 });
    }

    fn fatal(&self, place: &str, error: PlatformError) -> ! {
        match self.describe_error(&error) {
            Some(details) => self.log(&format!("fatal error {place}: {error} ({details})")),
            None => self.log(&format!("fatal error {place}: {error}")),
        }
        std::process::abort();
    }
}
