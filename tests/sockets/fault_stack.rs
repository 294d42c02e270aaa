/*!
 * Fault-Injecting Stack
 * Host stack wrapper whose accepted sockets cannot report their peer
 */

use ksocket::core::option::OptionAccess;
use ksocket::{HostStack, MsgFlags, NetworkStack, Shutdown, SocketAddress, SocketKind, SocketResult, StackSocket};
use std::io::{self, IoSlice, IoSliceMut};

#[derive(Clone, Default)]
pub struct PeerFailingStack {
    inner: HostStack,
}

impl PeerFailingStack {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NetworkStack for PeerFailingStack {
    fn create(&self, kind: SocketKind) -> io::Result<Box<dyn StackSocket>> {
        Ok(Box::new(PeerFailingSocket {
            inner: self.inner.create(kind)?,
            fail_peer: false,
        }))
    }

    fn open_objects(&self) -> usize {
        self.inner.open_objects()
    }
}

#[derive(Debug)]
struct PeerFailingSocket {
    inner: Box<dyn StackSocket>,
    fail_peer: bool,
}

impl StackSocket for PeerFailingSocket {
    fn bind(&self, addr: &SocketAddress) -> io::Result<()> {
        self.inner.bind(addr)
    }

    fn listen(&self, backlog: i32) -> io::Result<()> {
        self.inner.listen(backlog)
    }

    fn connect(&self, addr: &SocketAddress) -> io::Result<()> {
        self.inner.connect(addr)
    }

    fn accept(&self) -> io::Result<Box<dyn StackSocket>> {
        Ok(Box::new(PeerFailingSocket {
            inner: self.inner.accept()?,
            fail_peer: true,
        }))
    }

    fn send_vectored(&self, bufs: &[IoSlice<'_>], flags: MsgFlags) -> io::Result<usize> {
        self.inner.send_vectored(bufs, flags)
    }

    fn recv_vectored(&self, bufs: &mut [IoSliceMut<'_>], flags: MsgFlags) -> io::Result<usize> {
        self.inner.recv_vectored(bufs, flags)
    }

    fn send_to_vectored(
        &self,
        bufs: &[IoSlice<'_>],
        dest: &SocketAddress,
        flags: MsgFlags,
    ) -> io::Result<usize> {
        self.inner.send_to_vectored(bufs, dest, flags)
    }

    fn recv_from_vectored(
        &self,
        bufs: &mut [IoSliceMut<'_>],
        flags: MsgFlags,
    ) -> io::Result<(usize, SocketAddress)> {
        self.inner.recv_from_vectored(bufs, flags)
    }

    fn shutdown(&self, how: Shutdown) -> io::Result<()> {
        self.inner.shutdown(how)
    }

    fn local_addr(&self) -> io::Result<SocketAddress> {
        self.inner.local_addr()
    }

    fn peer_addr(&self) -> io::Result<SocketAddress> {
        if self.fail_peer {
            return Err(io::Error::from_raw_os_error(libc::ENOBUFS));
        }
        self.inner.peer_addr()
    }

    fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        self.inner.set_nonblocking(nonblocking)
    }

    fn has_option(&self, level: i32, name: i32, access: OptionAccess) -> bool {
        self.inner.has_option(level, name, access)
    }

    fn set_socket_option(&self, name: i32, value: &[u8]) -> SocketResult<()> {
        self.inner.set_socket_option(name, value)
    }

    fn get_socket_option(&self, name: i32) -> SocketResult<Vec<u8>> {
        self.inner.get_socket_option(name)
    }

    fn set_protocol_option(&self, level: i32, name: i32, value: &[u8]) -> SocketResult<()> {
        self.inner.set_protocol_option(level, name, value)
    }

    fn get_protocol_option(&self, level: i32, name: i32) -> SocketResult<Vec<u8>> {
        self.inner.get_protocol_option(level, name)
    }
}
