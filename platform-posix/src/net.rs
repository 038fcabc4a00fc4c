// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! BSD socket bodies for the socket contract.
//!
//! `std::net` insists on owning connect (blocking) and has no portable
//! "bytes available" query, so the bodies are written against `libc`
//! directly. Name resolution still goes through `std`, which knows how to
//! talk to the resolver everywhere.

use std::mem;
use std::net::{SocketAddr, ToSocketAddrs};

use platform::{
    CpStr, ErrorKind, PlatformError, PlatformResult, SocketHandle, Sockets, SocketSelect,
};

use crate::{last_errno, PosixPlatform};

impl PosixPlatform {
    fn socket_fd(&self, socket: SocketHandle) -> PlatformResult<libc::c_int> {
        self.sockets
            .get(socket.inner())
            .ok_or(PlatformError::new(ErrorKind::InvalidArgument))
    }
}

/// Resolves `address:port` to the first IPv4 address it maps to. The
/// protocol this feeds is IPv4-only, so v6 results are skipped rather than
/// tried and failed.
fn resolve(address: &str, port: u16) -> PlatformResult<libc::sockaddr_in> {
    let addrs = (address, port)
        .to_socket_addrs()
        .map_err(crate::io_error)?;
    let v4 = addrs
        .filter_map(|addr| match addr {
            SocketAddr::V4(v4) => Some(v4),
            SocketAddr::V6(_) => None,
        })
        .next()
        .ok_or(PlatformError::new(ErrorKind::InvalidArgument))?;

    // sockaddr_in has platform-dependent extra fields (sin_len on the
    // BSDs), hence zeroed() instead of a struct literal.
    let mut sin: libc::sockaddr_in = unsafe { mem::zeroed() };
    sin.sin_family = libc::AF_INET as libc::sa_family_t;
    sin.sin_port = port.to_be();
    sin.sin_addr.s_addr = u32::from(*v4.ip()).to_be();
    Ok(sin)
}

impl Sockets for PosixPlatform {
    fn socket_create(&self) -> PlatformResult<SocketHandle> {
        let fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_STREAM, libc::IPPROTO_TCP) };
        if fd < 0 {
            return Err(last_errno());
        }
        Ok(SocketHandle::new(self.sockets.insert(fd)))
    }

    fn socket_connect(
        &self,
        socket: SocketHandle,
        address: &CpStr,
        port: u16,
    ) -> PlatformResult<()> {
        let fd = self.socket_fd(socket)?;
        let sin = resolve(&address.decode(), port)?;

        let res = unsafe {
            libc::connect(
                fd,
                &sin as *const libc::sockaddr_in as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
            )
        };
        if res < 0 {
            return Err(last_errno());
        }
        Ok(())
    }

    fn socket_set_blocking(&self, socket: SocketHandle, blocking: bool) -> PlatformResult<()> {
        let fd = self.socket_fd(socket)?;

        let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
        if flags < 0 {
            return Err(last_errno());
        }
        let flags = if blocking {
            flags & !libc::O_NONBLOCK
        } else {
            flags | libc::O_NONBLOCK
        };
        if unsafe { libc::fcntl(fd, libc::F_SETFL, flags) } < 0 {
            return Err(last_errno());
        }
        Ok(())
    }

    fn socket_available(&self, socket: SocketHandle) -> PlatformResult<u32> {
        let fd = self.socket_fd(socket)?;

        let mut available: libc::c_int = 0;
        if unsafe { libc::ioctl(fd, libc::FIONREAD, &mut available) } < 0 {
            return Err(last_errno());
        }
        Ok(available.max(0) as u32)
    }

    fn socket_read(&self, socket: SocketHandle, buffer: &mut [u8]) -> PlatformResult<usize> {
        let fd = self.socket_fd(socket)?;

        let count = unsafe {
            libc::recv(
                fd,
                buffer.as_mut_ptr() as *mut libc::c_void,
                buffer.len(),
                0,
            )
        };
        if count < 0 {
            return Err(last_errno());
        }
        Ok(count as usize)
    }

    fn socket_write(&self, socket: SocketHandle, data: &[u8]) -> PlatformResult<usize> {
        let fd = self.socket_fd(socket)?;

        let count =
            unsafe { libc::send(fd, data.as_ptr() as *const libc::c_void, data.len(), 0) };
        if count < 0 {
            return Err(last_errno());
        }
        Ok(count as usize)
    }

    fn socket_select(&self, socket: SocketHandle, mode: SocketSelect) -> PlatformResult<bool> {
        let fd = self.socket_fd(socket)?;

        let mut pollfd = libc::pollfd {
            fd,
            events: match mode {
                SocketSelect::Read => libc::POLLIN,
                SocketSelect::Write => libc::POLLOUT,
            },
            revents: 0,
        };
        let res = unsafe { libc::poll(&mut pollfd, 1, 0) };
        if res < 0 {
            return Err(last_errno());
        }
        Ok(res > 0)
    }

    fn socket_error(&self, socket: SocketHandle) -> PlatformResult<Option<PlatformError>> {
        let fd = self.socket_fd(socket)?;

        let mut pending: libc::c_int = 0;
        let mut len = mem::size_of::<libc::c_int>() as libc::socklen_t;
        let res = unsafe {
            libc::getsockopt(
                fd,
                libc::SOL_SOCKET,
                libc::SO_ERROR,
                &mut pending as *mut libc::c_int as *mut libc::c_void,
                &mut len,
            )
        };
        if res < 0 {
            return Err(last_errno());
        }
        if pending == 0 {
            Ok(None)
        } else {
            Ok(Some(crate::errno_error(pending)))
        }
    }

    fn socket_close(&self, socket: SocketHandle) -> PlatformResult<()> {
        let fd = self
            .sockets
            .take(socket.inner())
            .ok_or(PlatformError::new(ErrorKind::InvalidArgument))?;
        if unsafe { libc::close(fd) } < 0 {
            return Err(last_errno());
        }
        Ok(())
    }
}
