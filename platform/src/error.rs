// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

use core::fmt;

use thiserror::Error;

/// Shorthand for results carrying a [`PlatformError`].
pub type PlatformResult<T> = Result<T, PlatformError>;

/// The closed set of error kinds every backend can produce, regardless of
/// how its native error space is laid out.
///
/// These are the only portable part of an error: two backends reporting the
/// same condition will report the same kind, while their [native
/// codes](PlatformError::native_code) can be arbitrarily different. Code
/// that branches on errors should only ever branch on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The path does not name an existing regular file.
    #[error("file not found")]
    FileNotFound,
    /// The file is already open in a conflicting sharing mode.
    #[error("sharing violation")]
    ShareViolation,
    /// The directory to create already exists.
    #[error("directory already exists")]
    DirectoryExists,
    /// A non-blocking connect has started but not finished yet.
    #[error("operation in progress")]
    InProgress,
    /// A non-blocking operation would have had to block.
    #[error("operation would block")]
    WouldBlock,
    /// The operation is not available on this platform (e.g. no storage
    /// medium is mounted, or the platform has no such facility at all).
    #[error("not supported on this platform")]
    NotSupported,
    /// The input data is malformed and cannot be processed.
    #[error("invalid argument")]
    InvalidArgument,
    /// The input data ended before it could contain what was expected.
    #[error("unexpected end of data")]
    UnexpectedEof,
    /// Any native error outside the recognized set.
    #[error("platform error")]
    Other,
}

/// An error from a platform operation: a portable [`ErrorKind`] plus,
/// when the failure originated in a native call, the raw native code.
///
/// The native code is diagnostic only. Its magnitude means nothing across
/// platforms, and errors synthesized by the abstraction itself (for example
/// [`ErrorKind::NotSupported`] from a backend with no storage) carry no code
/// at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformError {
    kind: ErrorKind,
    raw: Option<i32>,
}

impl PlatformError {
    /// Creates an error tagged by kind only, with no native code attached.
    pub const fn new(kind: ErrorKind) -> PlatformError {
        PlatformError { kind, raw: None }
    }

    /// Creates an error from a native call: the backend's translation of the
    /// raw code into a recognized kind, plus the code itself.
    pub const fn native(kind: ErrorKind, raw: i32) -> PlatformError {
        PlatformError { kind, raw: Some(raw) }
    }

    /// The portable classification of this error.
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The raw error code from the originating native call, if there was
    /// one. Never compare these across platforms.
    pub const fn native_code(&self) -> Option<i32> {
        self.raw
    }

    /// Returns true if this error is of the given kind.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

impl From<ErrorKind> for PlatformError {
    fn from(kind: ErrorKind) -> PlatformError {
        PlatformError::new(kind)
    }
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.raw {
            Some(raw) => write!(f, "{} (native error {})", self.kind, raw),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl core::error::Error for PlatformError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        Some(&self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, PlatformError};

    use alloc::string::ToString;

    #[test]
    fn native_code_is_attached_and_displayed() {
        let err = PlatformError::native(ErrorKind::FileNotFound, 2);
        assert!(err.is(ErrorKind::FileNotFound));
        assert_eq!(Some(2), err.native_code());
        assert_eq!("file not found (native error 2)", err.to_string());
    }

    #[test]
    fn tagged_errors_have_no_native_code() {
        let err = PlatformError::new(ErrorKind::NotSupported);
        assert_eq!(None, err.native_code());
        assert_eq!("not supported on this platform", err.to_string());
    }
}
