/*!
 * Host Stack
 * Stack objects backed by the host kernel through socket2
 */

use super::{NetworkStack, StackSocket};
use crate::core::errors::{SocketError, SocketResult};
use crate::core::option::*;
use crate::core::types::{AddressFamily, MsgFlags, Protocol, Shutdown, SocketKind, SocketType};
use crate::net::SocketAddress;
use socket2::{Domain, MaybeUninitSlice, Protocol as Socket2Protocol, SockAddr, Socket, Type};
use std::fmt;
use std::io::{self, IoSlice, IoSliceMut};
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::trace;

impl From<AddressFamily> for Domain {
    fn from(family: AddressFamily) -> Self {
        match family {
            AddressFamily::Inet => Domain::IPV4,
            AddressFamily::Inet6 => Domain::IPV6,
        }
    }
}

impl From<SocketType> for Type {
    fn from(ty: SocketType) -> Self {
        match ty {
            SocketType::Stream => Type::STREAM,
            SocketType::Datagram => Type::DGRAM,
        }
    }
}

impl Protocol {
    fn to_socket2(self) -> Option<Socket2Protocol> {
        match self {
            Protocol::Default => None,
            Protocol::Tcp => Some(Socket2Protocol::TCP),
            Protocol::Udp => Some(Socket2Protocol::UDP),
        }
    }
}

/// Stack backed by the host kernel
///
/// Tracks how many objects it has handed out that are still alive.
#[derive(Debug, Clone, Default)]
pub struct HostStack {
    live: Arc<AtomicUsize>,
}

impl HostStack {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NetworkStack for HostStack {
    fn create(&self, kind: SocketKind) -> io::Result<Box<dyn StackSocket>> {
        let inner = Socket::new(
            kind.family.into(),
            kind.socket_type.into(),
            kind.protocol.to_socket2(),
        )?;
        Ok(Box::new(HostSocket::wrap(inner, kind, &self.live)))
    }

    fn open_objects(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }
}

/// A host kernel socket
pub struct HostSocket {
    inner: Socket,
    kind: SocketKind,
    live: Arc<AtomicUsize>,
}

impl HostSocket {
    fn wrap(inner: Socket, kind: SocketKind, live: &Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::AcqRel);
        Self {
            inner,
            kind,
            live: Arc::clone(live),
        }
    }

    fn sock_addr(addr: io::Result<SockAddr>) -> io::Result<SocketAddress> {
        addr?
            .as_socket()
            .map(SocketAddress::from)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "non-IP socket address"))
    }
}

impl Drop for HostSocket {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::AcqRel);
    }
}

impl fmt::Debug for HostSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostSocket")
            .field("kind", &self.kind)
            .field("local", &self.inner.local_addr().ok().and_then(|a| a.as_socket()))
            .finish()
    }
}

/// View initialised bytes as a receive target
fn as_uninit(buf: &mut [u8]) -> &mut [MaybeUninit<u8>] {
    // SAFETY: MaybeUninit<u8> has the layout of u8, and the kernel only ever
    // writes initialised bytes into the region.
    unsafe { &mut *(buf as *mut [u8] as *mut [MaybeUninit<u8>]) }
}

fn uninit_slices<'a>(bufs: &'a mut [IoSliceMut<'_>]) -> Vec<MaybeUninitSlice<'a>> {
    bufs.iter_mut()
        .map(|buf| MaybeUninitSlice::new(as_uninit(buf)))
        .collect()
}

impl StackSocket for HostSocket {
    fn bind(&self, addr: &SocketAddress) -> io::Result<()> {
        self.inner.bind(&SockAddr::from(addr.as_socket_addr()))
    }

    fn listen(&self, backlog: i32) -> io::Result<()> {
        self.inner.listen(backlog)
    }

    fn connect(&self, addr: &SocketAddress) -> io::Result<()> {
        self.inner.connect(&SockAddr::from(addr.as_socket_addr()))
    }

    fn accept(&self) -> io::Result<Box<dyn StackSocket>> {
        let (socket, _) = self.inner.accept()?;
        Ok(Box::new(HostSocket::wrap(socket, self.kind, &self.live)))
    }

    fn send_vectored(&self, bufs: &[IoSlice<'_>], flags: MsgFlags) -> io::Result<usize> {
        self.inner
            .send_vectored_with_flags(bufs, flags.for_send().bits())
    }

    fn recv_vectored(&self, bufs: &mut [IoSliceMut<'_>], flags: MsgFlags) -> io::Result<usize> {
        let mut slices = uninit_slices(bufs);
        let (n, _) = self
            .inner
            .recv_vectored_with_flags(&mut slices, flags.bits())?;
        Ok(n)
    }

    fn send_to_vectored(
        &self,
        bufs: &[IoSlice<'_>],
        dest: &SocketAddress,
        flags: MsgFlags,
    ) -> io::Result<usize> {
        let dest = SockAddr::from(dest.as_socket_addr());
        self.inner
            .send_to_vectored_with_flags(bufs, &dest, flags.for_send().bits())
    }

    fn recv_from_vectored(
        &self,
        bufs: &mut [IoSliceMut<'_>],
        flags: MsgFlags,
    ) -> io::Result<(usize, SocketAddress)> {
        let mut slices = uninit_slices(bufs);
        let (n, recv_flags, from) = self
            .inner
            .recv_from_vectored_with_flags(&mut slices, flags.bits())?;
        if recv_flags.is_truncated() {
            trace!(bytes = n, "datagram truncated to receive buffer");
        }
        Ok((n, Self::sock_addr(Ok(from))?))
    }

    fn shutdown(&self, how: Shutdown) -> io::Result<()> {
        self.inner.shutdown(how.into())
    }

    fn local_addr(&self) -> io::Result<SocketAddress> {
        Self::sock_addr(self.inner.local_addr())
    }

    fn peer_addr(&self) -> io::Result<SocketAddress> {
        Self::sock_addr(self.inner.peer_addr())
    }

    fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        self.inner.set_nonblocking(nonblocking)
    }

    fn has_option(&self, level: i32, name: i32, access: OptionAccess) -> bool {
        match OptionLevel::from_raw(level) {
            OptionLevel::Socket => match name {
                SO_REUSEADDR | SO_KEEPALIVE | SO_BROADCAST | SO_RCVBUF | SO_SNDBUF | SO_LINGER
                | SO_RCVTIMEO | SO_SNDTIMEO => true,
                SO_ERROR | SO_TYPE => access == OptionAccess::Get,
                _ => false,
            },
            OptionLevel::Protocol(IPPROTO_TCP) => name == TCP_NODELAY && self.kind.is_stream(),
            OptionLevel::Protocol(IPPROTO_IP) => {
                name == IP_TTL && self.kind.family == AddressFamily::Inet
            }
            OptionLevel::Protocol(IPPROTO_IPV6) => {
                name == IPV6_V6ONLY && self.kind.family == AddressFamily::Inet6
            }
            OptionLevel::Protocol(_) => false,
        }
    }

    fn set_socket_option(&self, name: i32, value: &[u8]) -> SocketResult<()> {
        match name {
            SO_REUSEADDR => self.inner.set_reuse_address(OptionValue::parse_bool(value)?)?,
            SO_KEEPALIVE => self.inner.set_keepalive(OptionValue::parse_bool(value)?)?,
            SO_BROADCAST => self.inner.set_broadcast(OptionValue::parse_bool(value)?)?,
            SO_RCVBUF => self.inner.set_recv_buffer_size(OptionValue::parse_size(value)?)?,
            SO_SNDBUF => self.inner.set_send_buffer_size(OptionValue::parse_size(value)?)?,
            SO_LINGER => self.inner.set_linger(OptionValue::parse_linger(value)?)?,
            SO_RCVTIMEO => self.inner.set_read_timeout(OptionValue::parse_timeout(value)?)?,
            SO_SNDTIMEO => self.inner.set_write_timeout(OptionValue::parse_timeout(value)?)?,
            _ => {
                return Err(SocketError::UnsupportedOption {
                    level: SOL_SOCKET,
                    name,
                })
            }
        }
        Ok(())
    }

    fn get_socket_option(&self, name: i32) -> SocketResult<Vec<u8>> {
        let value = match name {
            SO_REUSEADDR => OptionValue::bool(self.inner.reuse_address()?),
            SO_KEEPALIVE => OptionValue::bool(self.inner.keepalive()?),
            SO_BROADCAST => OptionValue::bool(self.inner.broadcast()?),
            SO_RCVBUF => OptionValue::int(self.inner.recv_buffer_size()? as i32),
            SO_SNDBUF => OptionValue::int(self.inner.send_buffer_size()? as i32),
            SO_LINGER => OptionValue::linger(self.inner.linger()?),
            SO_RCVTIMEO => OptionValue::timeout(self.inner.read_timeout()?),
            SO_SNDTIMEO => OptionValue::timeout(self.inner.write_timeout()?),
            SO_ERROR => {
                let code = self
                    .inner
                    .take_error()?
                    .and_then(|e| e.raw_os_error())
                    .unwrap_or(0);
                OptionValue::int(code)
            }
            SO_TYPE => OptionValue::int(i32::from(self.inner.r#type()?)),
            _ => {
                return Err(SocketError::UnsupportedOption {
                    level: SOL_SOCKET,
                    name,
                })
            }
        };
        Ok(value)
    }

    fn set_protocol_option(&self, level: i32, name: i32, value: &[u8]) -> SocketResult<()> {
        match (level, name) {
            (IPPROTO_TCP, TCP_NODELAY) => self.inner.set_nodelay(OptionValue::parse_bool(value)?)?,
            (IPPROTO_IP, IP_TTL) => {
                let ttl = OptionValue::parse_int(value)?;
                let ttl = u32::try_from(ttl)
                    .map_err(|_| SocketError::InvalidArgument(format!("negative ttl {}", ttl)))?;
                self.inner.set_ttl(ttl)?
            }
            (IPPROTO_IPV6, IPV6_V6ONLY) => {
                self.inner.set_only_v6(OptionValue::parse_bool(value)?)?
            }
            _ => return Err(SocketError::UnsupportedOption { level, name }),
        }
        Ok(())
    }

    fn get_protocol_option(&self, level: i32, name: i32) -> SocketResult<Vec<u8>> {
        let value = match (level, name) {
            (IPPROTO_TCP, TCP_NODELAY) => OptionValue::bool(self.inner.nodelay()?),
            (IPPROTO_IP, IP_TTL) => OptionValue::int(self.inner.ttl()? as i32),
            (IPPROTO_IPV6, IPV6_V6ONLY) => OptionValue::bool(self.inner.only_v6()?),
            _ => return Err(SocketError::UnsupportedOption { level, name }),
        };
        Ok(value)
    }
}
