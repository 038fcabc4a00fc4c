// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom};
use std::sync::Arc;

use platform::{
    CpStr, CpString, ErrorKind, FileHandle, FileSystem, PlatformError, PlatformResult, SeekOrigin,
};

use crate::{io_error, PosixPlatform};

impl PosixPlatform {
    /// The one primitive all three open modes go through.
    fn file_do(&self, path: &CpStr, options: &OpenOptions) -> PlatformResult<FileHandle> {
        let file = options.open(self.native_path(path)).map_err(io_error)?;
        Ok(FileHandle::new(self.files.insert(Arc::new(file))))
    }

    /// Resolves a handle to the underlying file, without holding the
    /// registry lock during the I/O that follows.
    fn file(&self, handle: FileHandle) -> PlatformResult<Arc<File>> {
        self.files
            .get(handle.inner())
            .ok_or(PlatformError::new(ErrorKind::InvalidArgument))
    }

    fn enum_dir(&self, dir: &CpStr, callback: &mut dyn FnMut(&CpStr)) -> PlatformResult<()> {
        let entries = std::fs::read_dir(self.native_path(dir)).map_err(io_error)?;

        // The self/parent pseudo-entries are already filtered out by
        // read_dir, so everything we see is a real child.
        for entry in entries {
            let entry = entry.map_err(io_error)?;

            let mut child = CpString::from(dir);
            child.push_byte(b'/');
            for c in entry.file_name().to_string_lossy().chars() {
                child.push_char(c);
            }

            let file_type = entry.file_type().map_err(io_error)?;
            if file_type.is_dir() {
                self.enum_dir(&child, callback)?;
            } else {
                callback(&child);
            }
        }
        Ok(())
    }
}

impl FileSystem for PosixPlatform {
    fn directory_create(&self, path: &CpStr) -> PlatformResult<()> {
        std::fs::create_dir(self.native_path(path)).map_err(io_error)
    }

    fn file_exists(&self, path: &CpStr) -> bool {
        std::fs::metadata(self.native_path(path))
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }

    fn directory_enum(
        &self,
        path: &CpStr,
        callback: &mut dyn FnMut(&CpStr),
    ) -> PlatformResult<()> {
        self.enum_dir(path, callback)
    }

    fn file_open(&self, path: &CpStr) -> PlatformResult<FileHandle> {
        self.file_do(path, OpenOptions::new().read(true))
    }

    fn file_create(&self, path: &CpStr) -> PlatformResult<FileHandle> {
        self.file_do(
            path,
            OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true),
        )
    }

    fn file_open_or_create(&self, path: &CpStr) -> PlatformResult<FileHandle> {
        self.file_do(
            path,
            OpenOptions::new().read(true).write(true).create(true),
        )
    }

    fn file_read(&self, file: FileHandle, buffer: &mut [u8]) -> PlatformResult<usize> {
        let file = self.file(file)?;
        (&*file).read(buffer).map_err(io_error)
    }

    fn file_write(&self, file: FileHandle, data: &[u8]) -> PlatformResult<usize> {
        let file = self.file(file)?;
        std::io::Write::write(&mut &*file, data).map_err(io_error)
    }

    fn file_seek(&self, file: FileHandle, offset: i64, origin: SeekOrigin) -> PlatformResult<()> {
        let file = self.file(file)?;
        let pos = match origin {
            SeekOrigin::Start => SeekFrom::Start(offset as u64),
            SeekOrigin::Current => SeekFrom::Current(offset),
            SeekOrigin::End => SeekFrom::End(offset),
        };
        (&*file).seek(pos).map(drop).map_err(io_error)
    }

    fn file_position(&self, file: FileHandle) -> PlatformResult<u64> {
        let file = self.file(file)?;
        (&*file).stream_position().map_err(io_error)
    }

    fn file_length(&self, file: FileHandle) -> PlatformResult<u64> {
        let file = self.file(file)?;
        file.metadata().map(|meta| meta.len()).map_err(io_error)
    }

    fn file_close(&self, file: FileHandle) -> PlatformResult<()> {
        match self.files.take(file.inner()) {
            Some(_file) => Ok(()),
            None => Err(ErrorKind::InvalidArgument.into()),
        }
    }
}
