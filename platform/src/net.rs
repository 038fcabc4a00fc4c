// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::{CpStr, PlatformError, PlatformResult};

/// Platform-specific socket handle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SocketHandle(u64);

impl SocketHandle {
    /// Creates a new [`SocketHandle`]. Should only be created in the
    /// platform implementation.
    pub fn new(id: u64) -> SocketHandle {
        SocketHandle(id)
    }

    /// The platform-specific id this handle was created with.
    pub fn inner(self) -> u64 {
        self.0
    }
}

/// What [`Sockets::socket_select`] should check for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketSelect {
    /// Is there data to read (or a connection state change to observe)?
    Read,
    /// Can the socket be written to without blocking?
    Write,
}

/// TCP socket services of a platform.
///
/// The client drives its server connection through exactly these calls, in
/// non-blocking mode: connect returns
/// [`ErrorKind::InProgress`](crate::ErrorKind), the client polls with
/// [`Sockets::socket_select`], and reads/writes return
/// [`ErrorKind::WouldBlock`](crate::ErrorKind) instead of blocking the
/// render loop.
pub trait Sockets {
    /// Creates an unconnected TCP socket.
    fn socket_create(&self) -> PlatformResult<SocketHandle>;

    /// Starts connecting to `address:port`. `address` is a numeric IP
    /// address or a hostname.
    ///
    /// On a non-blocking socket this typically returns
    /// [`ErrorKind::InProgress`](crate::ErrorKind); completion is observed
    /// via [`Sockets::socket_select`] for write, and the outcome via
    /// [`Sockets::socket_error`].
    fn socket_connect(&self, socket: SocketHandle, address: &CpStr, port: u16)
        -> PlatformResult<()>;

    /// Switches the socket between blocking and non-blocking mode.
    fn socket_set_blocking(&self, socket: SocketHandle, blocking: bool) -> PlatformResult<()>;

    /// How many bytes can be read right now without blocking.
    fn socket_available(&self, socket: SocketHandle) -> PlatformResult<u32>;

    /// Reads up to `buffer.len()` bytes, returning the count actually read.
    /// Zero means the peer closed the connection.
    fn socket_read(&self, socket: SocketHandle, buffer: &mut [u8]) -> PlatformResult<usize>;

    /// Writes up to `data.len()` bytes, returning the count actually
    /// written.
    fn socket_write(&self, socket: SocketHandle, data: &[u8]) -> PlatformResult<usize>;

    /// Polls (without blocking) whether the socket is ready for the given
    /// operation.
    fn socket_select(&self, socket: SocketHandle, mode: SocketSelect) -> PlatformResult<bool>;

    /// The pending asynchronous error on the socket, if any. Checking
    /// clears it. Used to learn how a non-blocking connect ended.
    fn socket_error(&self, socket: SocketHandle) -> PlatformResult<Option<PlatformError>>;

    /// Closes the socket. The handle is dead afterwards.
    fn socket_close(&self, socket: SocketHandle) -> PlatformResult<()>;
}
