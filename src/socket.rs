//! Socket adapter: open/bind/configure a raw CAN socket and read/write whole frames.
//!
//! `CanSocket` is the Linux SocketCAN implementation of the `SocketAdapter` capability set. Tests
//! and alternative transports substitute their own `SocketAdapter` impl instead.

use std::mem::size_of;
use std::os::unix::io::{AsRawFd, IntoRawFd, RawFd};
use std::time::Duration;

use crate::constants::{CanAddr, CAN_RAW_FD_FRAMES, CANFD_MTU, CAN_MTU, SOL_CAN_RAW};
use crate::error::Error;
use crate::retry::ShouldRetry;
use crate::{constants, util};

/// Capability set a `Messenger` needs from a transport: open, write a frame, read a frame, close.
/// Boxed and stored behind a trait object so tests can swap in a mock without touching the kernel.
pub trait SocketAdapter: Send {
    fn write_frame(&self, bytes: &[u8]) -> Result<(), Error>;
    /// Returns `Ok(None)` on timeout (not an error), `Ok(Some(bytes))` on a received frame.
    fn read_frame(&self, fd_enabled: bool) -> Result<Option<Vec<u8>>, Error>;
}

pub struct CanSocket {
    fd: RawFd,
}

impl CanSocket {
    /// Opens, binds, and configures a raw CAN socket on `interface_name`. Sets `read_timeout` as
    /// the receive timeout and, if `fd_enabled`, enables `CAN_RAW_FD_FRAMES`.
    pub fn open(interface_name: &str, fd_enabled: bool, read_timeout: Duration) -> Result<Self, Error> {
        let interface_index = nix::net::if_::if_nametoindex(interface_name).map_err(|e| {
            log::error!("failed to look up CAN interface {:?}: {}", interface_name, e);
            Error::LookupError(e)
        })?;

        let sock_fd =
            unsafe { libc::socket(constants::PF_CAN, libc::SOCK_RAW, constants::CAN_RAW) };
        if sock_fd == -1 {
            let e = std::io::Error::last_os_error();
            log::error!("failed to create CAN socket on {:?}: {}", interface_name, e);
            return Err(Error::SocketOpenError {
                interface: interface_name.to_string(),
                source: e,
            });
        }

        let bind_result = unsafe {
            let addr = CanAddr::new(interface_index);
            libc::bind(
                sock_fd,
                &addr as *const CanAddr as *const libc::sockaddr,
                size_of::<CanAddr>() as u32,
            )
        };
        if bind_result == -1 {
            let e = std::io::Error::last_os_error();
            log::error!("failed to bind CAN socket on {:?}: {}", interface_name, e);
            unsafe { libc::close(sock_fd) };
            return Err(Error::SocketOpenError {
                interface: interface_name.to_string(),
                source: e,
            });
        }

        let socket = CanSocket { fd: sock_fd };
        socket
            .set_read_timeout(read_timeout)
            .map_err(|source| Error::SocketOpenError {
                interface: interface_name.to_string(),
                source,
            })?;

        if fd_enabled {
            let enable: libc::c_int = 1;
            util::set_socket_option(sock_fd, SOL_CAN_RAW as i32, CAN_RAW_FD_FRAMES as i32, &enable)
                .map_err(|source| Error::SocketOpenError {
                    interface: interface_name.to_string(),
                    source,
                })?;
        }

        Ok(socket)
    }

    pub fn set_read_timeout(&self, duration: Duration) -> std::io::Result<()> {
        util::set_socket_option(
            self.fd,
            libc::SOL_SOCKET,
            libc::SO_RCVTIMEO,
            &util::c_timeval_new(duration),
        )
    }

    fn close(&mut self) -> std::io::Result<()> {
        if unsafe { libc::close(self.fd) } == -1 {
            return Err(std::io::Error::last_os_error());
        }
        Ok(())
    }
}

impl SocketAdapter for CanSocket {
    fn write_frame(&self, bytes: &[u8]) -> Result<(), Error> {
        let result = unsafe {
            libc::write(
                self.fd,
                bytes.as_ptr() as *const libc::c_void,
                bytes.len(),
            )
        };
        if result as usize != bytes.len() {
            let e = std::io::Error::last_os_error();
            log::error!("CAN write failed: {}", e);
            return Err(Error::TransportError(e));
        }
        Ok(())
    }

    fn read_frame(&self, fd_enabled: bool) -> Result<Option<Vec<u8>>, Error> {
        let want = if fd_enabled { CANFD_MTU } else { CAN_MTU };
        let mut buf = vec![0u8; want];
        let result = unsafe {
            libc::read(self.fd, buf.as_mut_ptr() as *mut libc::c_void, want)
        };

        if result == -1 {
            let e = std::io::Error::last_os_error();
            if e.should_retry() {
                return Ok(None);
            }
            log::error!("CAN read failed: {}", e);
            return Err(Error::TransportError(e));
        }

        if result as usize != want {
            log::warn!(
                "short CAN read: got {} bytes, expected {}",
                result,
                want
            );
            return Ok(None);
        }

        Ok(Some(buf))
    }
}

impl Drop for CanSocket {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("error closing CAN socket: {}", e);
        }
    }
}

impl AsRawFd for CanSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl IntoRawFd for CanSocket {
    fn into_raw_fd(self) -> RawFd {
        self.fd
    }
}
