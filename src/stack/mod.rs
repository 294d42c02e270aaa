/*!
 * Network Stack Interface
 * The direct-object, vectored-buffer socket model the handle layer adapts onto
 *
 * A stack hands out socket objects; each object is used through shared
 * references so that a shutdown issued from one execution context can wake a
 * call blocked in another. Releasing an object is dropping it.
 */

mod host;

pub use host::{HostSocket, HostStack};

use crate::core::errors::SocketResult;
use crate::core::option::OptionAccess;
use crate::core::types::{MsgFlags, Shutdown, SocketKind};
use crate::net::SocketAddress;
use std::fmt;
use std::io::{self, IoSlice, IoSliceMut};

/// Factory for stack socket objects
#[cfg_attr(test, mockall::automock)]
pub trait NetworkStack: Send + Sync {
    /// Allocate a new socket object
    fn create(&self, kind: SocketKind) -> io::Result<Box<dyn StackSocket>>;

    /// Number of socket objects currently alive (resource probe)
    fn open_objects(&self) -> usize;
}

/// One socket object inside the stack
pub trait StackSocket: Send + Sync + fmt::Debug {
    fn bind(&self, addr: &SocketAddress) -> io::Result<()>;

    fn listen(&self, backlog: i32) -> io::Result<()>;

    fn connect(&self, addr: &SocketAddress) -> io::Result<()>;

    /// Block until a pending connection exists and return it as a new object
    fn accept(&self) -> io::Result<Box<dyn StackSocket>>;

    fn send_vectored(&self, bufs: &[IoSlice<'_>], flags: MsgFlags) -> io::Result<usize>;

    fn recv_vectored(&self, bufs: &mut [IoSliceMut<'_>], flags: MsgFlags) -> io::Result<usize>;

    fn send_to_vectored(
        &self,
        bufs: &[IoSlice<'_>],
        dest: &SocketAddress,
        flags: MsgFlags,
    ) -> io::Result<usize>;

    fn recv_from_vectored(
        &self,
        bufs: &mut [IoSliceMut<'_>],
        flags: MsgFlags,
    ) -> io::Result<(usize, SocketAddress)>;

    fn shutdown(&self, how: Shutdown) -> io::Result<()>;

    fn local_addr(&self) -> io::Result<SocketAddress>;

    fn peer_addr(&self) -> io::Result<SocketAddress>;

    fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()>;

    /// Whether this object has a handler for the option
    fn has_option(&self, level: i32, name: i32, access: OptionAccess) -> bool;

    /// Generic socket-level (SOL_SOCKET) option
    fn set_socket_option(&self, name: i32, value: &[u8]) -> SocketResult<()>;

    fn get_socket_option(&self, name: i32) -> SocketResult<Vec<u8>>;

    /// Protocol-level option
    fn set_protocol_option(&self, level: i32, name: i32, value: &[u8]) -> SocketResult<()>;

    fn get_protocol_option(&self, level: i32, name: i32) -> SocketResult<Vec<u8>>;
}
