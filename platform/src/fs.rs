// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::{CpStr, PlatformResult};

/// Platform-specific file handle.
///
/// The handle is owned by whoever opened it until [`FileSystem::file_close`]
/// is called on it, and is never duplicated implicitly. Using a handle after
/// closing it is a caller bug; backends respond with an error, not a crash.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FileHandle(u64);

impl FileHandle {
    /// Creates a new [`FileHandle`]. Should only be created in the platform
    /// implementation, which also knows how the inner value is going to be
    /// used.
    pub fn new(id: u64) -> FileHandle {
        FileHandle(id)
    }

    /// The platform-specific id this handle was created with.
    pub fn inner(self) -> u64 {
        self.0
    }
}

/// Where a [`FileSystem::file_seek`] offset is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOrigin {
    /// From the start of the file; the offset is an absolute position.
    Start,
    /// From the current position.
    Current,
    /// From the end of the file (an offset of zero seeks to the end).
    End,
}

/// File and directory services of a platform.
///
/// Paths are relative CP437 paths with `/` separators; every implementation
/// resolves them against its own root directory (the working directory on
/// desktop, a fixed per-title directory on consoles), and transcodes them to
/// whatever its native calls want. Path semantics never leak past the
/// implementation.
pub trait FileSystem {
    /// Creates one directory level (not recursive).
    ///
    /// Fails with [`ErrorKind::DirectoryExists`](crate::ErrorKind) if it is
    /// already there, and [`ErrorKind::NotSupported`](crate::ErrorKind) if
    /// there is no writable storage mounted at all.
    fn directory_create(&self, path: &CpStr) -> PlatformResult<()>;

    /// Returns true only if `path` names an existing regular file.
    ///
    /// Directories, missing paths, and unmounted storage all yield false;
    /// none of them is an error.
    fn file_exists(&self, path: &CpStr) -> bool;

    /// Depth-first recursive enumeration of every regular file under
    /// `path`.
    ///
    /// The callback receives the full path relative to the platform root,
    /// once per regular file. Subdirectories are recursed into before the
    /// current listing continues, and the self/parent pseudo-entries are
    /// never reported. The first error aborts the walk and is returned
    /// as-is.
    ///
    /// Entries come in native filesystem order, which is unspecified.
    /// Callers wanting determinism sort afterwards.
    fn directory_enum(
        &self,
        path: &CpStr,
        callback: &mut dyn FnMut(&CpStr),
    ) -> PlatformResult<()>;

    /// Opens an existing file for reading.
    fn file_open(&self, path: &CpStr) -> PlatformResult<FileHandle>;

    /// Creates a file for reading and writing, truncating it if it already
    /// exists.
    fn file_create(&self, path: &CpStr) -> PlatformResult<FileHandle>;

    /// Opens a file for reading and writing, creating it if missing. Never
    /// truncates.
    fn file_open_or_create(&self, path: &CpStr) -> PlatformResult<FileHandle>;

    /// Reads up to `buffer.len()` bytes, returning how many were actually
    /// read. A short read (including zero at end of file) is not an error.
    fn file_read(&self, file: FileHandle, buffer: &mut [u8]) -> PlatformResult<usize>;

    /// Writes up to `data.len()` bytes, returning how many were actually
    /// written. A short write is not an error by itself.
    fn file_write(&self, file: FileHandle, data: &[u8]) -> PlatformResult<usize>;

    /// Moves the file cursor. See [`SeekOrigin`] for the three modes.
    fn file_seek(&self, file: FileHandle, offset: i64, origin: SeekOrigin) -> PlatformResult<()>;

    /// The current file cursor position, in bytes from the start.
    fn file_position(&self, file: FileHandle) -> PlatformResult<u64>;

    /// The current length of the file in bytes. Does not move the cursor.
    fn file_length(&self, file: FileHandle) -> PlatformResult<u64>;

    /// Closes the handle, releasing the native resource. The handle is dead
    /// afterwards no matter what this returns.
    fn file_close(&self, file: FileHandle) -> PlatformResult<()>;
}
