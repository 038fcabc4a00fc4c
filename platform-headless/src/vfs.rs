// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! The in-memory file tree.
//!
//! Nodes are keyed by their full relative path in a sorted map, which makes
//! "everything under this directory" a prefix scan and gives enumeration a
//! stable (lexicographic) order.

use std::collections::BTreeMap;

use platform::{ErrorKind, FileHandle, PlatformResult, SeekOrigin};

enum Node {
    Directory,
    File(Vec<u8>),
}

struct OpenFile {
    path: Vec<u8>,
    cursor: u64,
}

pub(crate) struct Vfs {
    pub storage_available: bool,
    nodes: BTreeMap<Vec<u8>, Node>,
    open: Vec<Option<OpenFile>>,
}

impl Default for Vfs {
    fn default() -> Vfs {
        Vfs {
            storage_available: true,
            nodes: BTreeMap::new(),
            open: Vec::new(),
        }
    }
}

impl Vfs {
    fn parent_exists(&self, path: &[u8]) -> bool {
        match path.iter().rposition(|&b| b == b'/') {
            Some(slash) => matches!(self.nodes.get(&path[..slash]), Some(Node::Directory)),
            None => true,
        }
    }

    pub fn directory_create(&mut self, path: &[u8]) -> PlatformResult<()> {
        if !self.storage_available {
            return Err(ErrorKind::NotSupported.into());
        }
        if self.nodes.contains_key(path) {
            return Err(ErrorKind::DirectoryExists.into());
        }
        if !self.parent_exists(path) {
            return Err(ErrorKind::FileNotFound.into());
        }
        self.nodes.insert(path.to_vec(), Node::Directory);
        Ok(())
    }

    pub fn file_exists(&self, path: &[u8]) -> bool {
        self.storage_available && matches!(self.nodes.get(path), Some(Node::File(_)))
    }

    /// Every regular file under `dir`, depth first, subdirectories fully
    /// listed at the point they are encountered.
    pub fn files_under(&self, dir: &[u8]) -> PlatformResult<Vec<Vec<u8>>> {
        if !self.storage_available {
            return Err(ErrorKind::NotSupported.into());
        }
        if !matches!(self.nodes.get(dir), Some(Node::Directory)) {
            return Err(ErrorKind::FileNotFound.into());
        }
        let mut out = Vec::new();
        self.collect_files(dir, &mut out);
        Ok(out)
    }

    fn collect_files(&self, dir: &[u8], out: &mut Vec<Vec<u8>>) {
        let mut prefix = dir.to_vec();
        prefix.push(b'/');

        for (path, node) in &self.nodes {
            let rest = match path.strip_prefix(prefix.as_slice()) {
                Some(rest) => rest,
                None => continue,
            };
            if rest.contains(&b'/') {
                // Not an immediate child; the recursion picks it up.
                continue;
            }
            match node {
                Node::Directory => self.collect_files(path, out),
                Node::File(_) => out.push(path.clone()),
            }
        }
    }

    pub fn open(&mut self, path: &[u8], create: bool, truncate: bool) -> PlatformResult<FileHandle> {
        if !self.storage_available {
            return Err(ErrorKind::NotSupported.into());
        }
        match self.nodes.get_mut(path) {
            Some(Node::File(contents)) => {
                if truncate {
                    contents.clear();
                }
            }
            Some(Node::Directory) => return Err(ErrorKind::InvalidArgument.into()),
            None if create => {
                if !self.parent_exists(path) {
                    return Err(ErrorKind::FileNotFound.into());
                }
                self.nodes.insert(path.to_vec(), Node::File(Vec::new()));
            }
            None => return Err(ErrorKind::FileNotFound.into()),
        }

        self.open.push(Some(OpenFile {
            path: path.to_vec(),
            cursor: 0,
        }));
        Ok(FileHandle::new(self.open.len() as u64))
    }

    fn open_file(&mut self, handle: FileHandle) -> PlatformResult<&mut OpenFile> {
        let index = (handle.inner() as usize)
            .checked_sub(1)
            .ok_or(ErrorKind::InvalidArgument)?;
        self.open
            .get_mut(index)
            .and_then(Option::as_mut)
            .ok_or_else(|| ErrorKind::InvalidArgument.into())
    }

    pub fn read(&mut self, handle: FileHandle, buffer: &mut [u8]) -> PlatformResult<usize> {
        let index = (handle.inner() as usize)
            .checked_sub(1)
            .ok_or(ErrorKind::InvalidArgument)?;
        let file = self
            .open
            .get_mut(index)
            .and_then(Option::as_mut)
            .ok_or(ErrorKind::InvalidArgument)?;
        let contents = match self.nodes.get(&file.path) {
            Some(Node::File(contents)) => contents,
            _ => return Err(ErrorKind::FileNotFound.into()),
        };

        let start = (file.cursor as usize).min(contents.len());
        let count = buffer.len().min(contents.len() - start);
        buffer[..count].copy_from_slice(&contents[start..start + count]);
        file.cursor += count as u64;
        Ok(count)
    }

    pub fn write(&mut self, handle: FileHandle, data: &[u8]) -> PlatformResult<usize> {
        let index = (handle.inner() as usize)
            .checked_sub(1)
            .ok_or(ErrorKind::InvalidArgument)?;
        let file = self
            .open
            .get_mut(index)
            .and_then(Option::as_mut)
            .ok_or(ErrorKind::InvalidArgument)?;
        let contents = match self.nodes.get_mut(&file.path) {
            Some(Node::File(contents)) => contents,
            _ => return Err(ErrorKind::FileNotFound.into()),
        };

        // Writing past the end zero-fills the gap, like a sparse file
        // reads back.
        let start = file.cursor as usize;
        if start > contents.len() {
            contents.resize(start, 0);
        }
        let overlap = data.len().min(contents.len().saturating_sub(start));
        contents[start..start + overlap].copy_from_slice(&data[..overlap]);
        contents.extend_from_slice(&data[overlap..]);

        file.cursor += data.len() as u64;
        Ok(data.len())
    }

    pub fn seek(
        &mut self,
        handle: FileHandle,
        offset: i64,
        origin: SeekOrigin,
    ) -> PlatformResult<()> {
        let length = self.length(handle)?;
        let file = self.open_file(handle)?;

        let base = match origin {
            SeekOrigin::Start => 0,
            SeekOrigin::Current => file.cursor as i64,
            SeekOrigin::End => length as i64,
        };
        let target = base + offset;
        if target < 0 {
            return Err(ErrorKind::InvalidArgument.into());
        }
        file.cursor = target as u64;
        Ok(())
    }

    pub fn position(&mut self, handle: FileHandle) -> PlatformResult<u64> {
        Ok(self.open_file(handle)?.cursor)
    }

    pub fn length(&mut self, handle: FileHandle) -> PlatformResult<u64> {
        let path = self.open_file(handle)?.path.clone();
        match self.nodes.get(&path) {
            Some(Node::File(contents)) => Ok(contents.len() as u64),
            _ => Err(ErrorKind::FileNotFound.into()),
        }
    }

    pub fn close(&mut self, handle: FileHandle) -> PlatformResult<()> {
        let index = (handle.inner() as usize)
            .checked_sub(1)
            .ok_or(ErrorKind::InvalidArgument)?;
        self.open
            .get_mut(index)
            .and_then(Option::take)
            .map(drop)
            .ok_or_else(|| ErrorKind::InvalidArgument.into())
    }
}
