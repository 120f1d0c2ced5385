//! L2CAP sockets for the Bluetooth HID channels.
//!
//! The standard library has no Bluetooth sockets, so the listener and its
//! connections are raw `AF_BLUETOOTH` / `SOCK_SEQPACKET` file descriptors
//! opened with `libc` and driven non-blocking through tokio's [`AsyncFd`].
//! Sequenced packets keep report boundaries: one `send` is one HID frame.
//!
//! Pairing, the SDP record and the adapter's discoverable state are managed
//! by BlueZ outside this process.

use std::io;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

use async_trait::async_trait;
use tokio::io::unix::AsyncFd;
use tracing::info;

use super::address::BdAddr;
use super::multiplexer::{ConnectionListener, PeerConnection, TransportError};

/// `BTPROTO_L2CAP` from `<bluetooth/bluetooth.h>`; libc does not export it.
const BTPROTO_L2CAP: libc::c_int = 0;

/// `struct sockaddr_l2` from `<bluetooth/l2cap.h>`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct SockaddrL2 {
    l2_family: libc::sa_family_t,
    /// Little-endian.
    l2_psm: u16,
    /// Little-endian byte order.
    l2_bdaddr: [u8; 6],
    l2_cid: u16,
    l2_bdaddr_type: u8,
}

impl SockaddrL2 {
    fn new(psm: u16, addr: BdAddr) -> Self {
        Self {
            l2_family: libc::AF_BLUETOOTH as libc::sa_family_t,
            l2_psm: psm.to_le(),
            l2_bdaddr: addr.to_wire(),
            l2_cid: 0,
            l2_bdaddr_type: 0,
        }
    }

    const LEN: libc::socklen_t = mem::size_of::<SockaddrL2>() as libc::socklen_t;
}

/// A listening L2CAP socket on one PSM.
pub struct L2capListener {
    fd: AsyncFd<OwnedFd>,
    psm: u16,
}

impl L2capListener {
    /// Binds to `psm` on every local adapter and starts listening.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Socket`] naming the failed step.
    pub fn bind(psm: u16, backlog: u32) -> Result<Self, TransportError> {
        let fail = |operation| TransportError::Socket {
            operation,
            psm,
            source: io::Error::last_os_error(),
        };

        // SAFETY: socket() takes no pointers; the result is checked below.
        let raw = unsafe {
            libc::socket(
                libc::AF_BLUETOOTH,
                libc::SOCK_SEQPACKET | libc::SOCK_NONBLOCK | libc::SOCK_CLOEXEC,
                BTPROTO_L2CAP,
            )
        };
        if raw < 0 {
            return Err(fail("socket"));
        }
        // SAFETY: raw is a freshly created descriptor owned by nothing else.
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        let addr = SockaddrL2::new(psm, BdAddr::ANY);
        // SAFETY: addr outlives the call and LEN is its exact size.
        let rc = unsafe {
            libc::bind(
                fd.as_raw_fd(),
                (&addr as *const SockaddrL2).cast::<libc::sockaddr>(),
                SockaddrL2::LEN,
            )
        };
        if rc < 0 {
            return Err(fail("bind"));
        }

        let backlog = libc::c_int::try_from(backlog).unwrap_or(libc::c_int::MAX);
        // SAFETY: fd is a valid, bound socket.
        if unsafe { libc::listen(fd.as_raw_fd(), backlog) } < 0 {
            return Err(fail("listen"));
        }

        let fd = AsyncFd::new(fd).map_err(|source| TransportError::Socket {
            operation: "register",
            psm,
            source,
        })?;
        info!(psm, "listening for L2CAP connections");
        Ok(Self { fd, psm })
    }
}

#[async_trait]
impl ConnectionListener for L2capListener {
    type Connection = L2capConnection;

    async fn accept(&self) -> Result<(L2capConnection, BdAddr), TransportError> {
        let psm = self.psm;
        let error = |source| TransportError::Socket {
            operation: "accept",
            psm,
            source,
        };
        loop {
            let mut guard = self.fd.readable().await.map_err(error)?;
            match guard.try_io(|inner| accept_raw(inner.get_ref().as_raw_fd())) {
                Ok(result) => {
                    let (fd, peer) = result.map_err(error)?;
                    let conn = L2capConnection {
                        fd: AsyncFd::new(fd).map_err(error)?,
                    };
                    return Ok((conn, peer));
                }
                Err(_would_block) => continue,
            }
        }
    }
}

fn accept_raw(listener: RawFd) -> io::Result<(OwnedFd, BdAddr)> {
    let mut addr = SockaddrL2::new(0, BdAddr::ANY);
    let mut len = SockaddrL2::LEN;
    // SAFETY: addr and len are valid for writes and len holds addr's size.
    let raw = unsafe {
        libc::accept4(
            listener,
            (&mut addr as *mut SockaddrL2).cast::<libc::sockaddr>(),
            &mut len,
            libc::SOCK_NONBLOCK | libc::SOCK_CLOEXEC,
        )
    };
    if raw < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: accept4 returned a new descriptor that nothing else owns.
    let fd = unsafe { OwnedFd::from_raw_fd(raw) };
    Ok((fd, BdAddr::from_wire(addr.l2_bdaddr)))
}

/// One accepted L2CAP connection.  Dropping it closes the socket.
pub struct L2capConnection {
    fd: AsyncFd<OwnedFd>,
}

#[async_trait]
impl PeerConnection for L2capConnection {
    async fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let mut guard = self.fd.readable().await?;
            let result = guard.try_io(|inner| {
                // SAFETY: buf is valid for writes of buf.len() bytes.
                let n = unsafe {
                    libc::recv(
                        inner.get_ref().as_raw_fd(),
                        buf.as_mut_ptr().cast::<libc::c_void>(),
                        buf.len(),
                        0,
                    )
                };
                if n < 0 {
                    Err(io::Error::last_os_error())
                } else {
                    Ok(n as usize)
                }
            });
            match result {
                Ok(read) => return read,
                Err(_would_block) => continue,
            }
        }
    }

    async fn send(&self, frame: &[u8]) -> io::Result<usize> {
        loop {
            let mut guard = self.fd.writable().await?;
            let result = guard.try_io(|inner| {
                // SAFETY: frame is valid for reads of frame.len() bytes.
                let n = unsafe {
                    libc::send(
                        inner.get_ref().as_raw_fd(),
                        frame.as_ptr().cast::<libc::c_void>(),
                        frame.len(),
                        libc::MSG_NOSIGNAL,
                    )
                };
                if n < 0 {
                    Err(io::Error::last_os_error())
                } else {
                    Ok(n as usize)
                }
            });
            match result {
                Ok(written) => return written,
                Err(_would_block) => continue,
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
