/*!
 * Control Operations
 * bind, listen, connect, and address queries
 */

use crate::core::errors::{SocketError, SocketResult};
use crate::monitoring::span_operation;
use crate::net::{AddressLen, SocketAddress};
use crate::sockets::{Direction, SocketHandle, SocketManager, SocketState};
use tracing::{debug, info};

impl SocketManager {
    /// Assign a local address to a freshly created handle
    pub fn bind(&self, handle: SocketHandle, addr: impl Into<SocketAddress>) -> SocketResult<()> {
        let addr = addr.into();
        let span = span_operation("socket_bind");
        let _guard = span.enter();
        span.record_handle(handle);
        span.record_address(addr);

        let result = self.entry(handle).and_then(|entry| {
            entry.require_state(&[SocketState::Created], "bind")?;
            entry.socket().bind(&addr)?;
            entry.set_state(SocketState::Bound);
            Ok(())
        });

        if result.is_ok() {
            info!(handle = %handle, addr = %addr, "Bound socket");
        }
        span.finish(result)
    }

    /// Start accepting connections on a stream handle
    ///
    /// A negative backlog, or one above the configured maximum, is clamped to
    /// the maximum.
    pub fn listen(&self, handle: SocketHandle, backlog: i32) -> SocketResult<()> {
        let span = span_operation("socket_listen");
        let _guard = span.enter();
        span.record_handle(handle);

        let max = self.config().max_backlog;
        let backlog = if backlog < 0 || backlog > max {
            max
        } else {
            backlog
        };

        let result = self.entry(handle).and_then(|entry| {
            entry.require_state(&[SocketState::Created, SocketState::Bound], "listen")?;
            if !entry.kind().is_stream() {
                return Err(SocketError::InvalidState(
                    "listen requires a stream socket".into(),
                ));
            }
            entry.socket().listen(backlog)?;
            entry.set_state(SocketState::Listening);
            Ok(())
        });

        if result.is_ok() {
            info!(handle = %handle, backlog, "Socket listening");
        }
        span.finish(result)
    }

    /// Connect to a remote address
    ///
    /// In non-blocking mode the first call reports `WouldBlock` while the
    /// connection is in progress; repeating the call completes it.
    pub fn connect(&self, handle: SocketHandle, addr: impl Into<SocketAddress>) -> SocketResult<()> {
        let addr = addr.into();
        let span = span_operation("socket_connect").blocking();
        let _guard = span.enter();
        span.record_handle(handle);
        span.record_address(addr);

        let result = self.entry(handle).and_then(|entry| {
            entry.require_state(&[SocketState::Created, SocketState::Bound], "connect")?;
            match entry.socket().connect(&addr) {
                Ok(()) => {}
                Err(e) if e.raw_os_error() == Some(libc::EISCONN) => {}
                Err(e) => return Err(entry.classify(e, Direction::Write)),
            }
            entry.set_state(SocketState::Connected);
            Ok(())
        });

        match &result {
            Ok(()) => info!(handle = %handle, addr = %addr, "Connected socket"),
            Err(SocketError::WouldBlock) => debug!(handle = %handle, "connect in progress"),
            Err(_) => {}
        }
        span.finish(result)
    }

    /// Address the handle is bound to
    pub fn local_addr(&self, handle: SocketHandle) -> SocketResult<SocketAddress> {
        let span = span_operation("socket_local_addr");
        let _guard = span.enter();
        span.record_handle(handle);

        let result = self.entry(handle).and_then(|entry| {
            if entry.state() == SocketState::Created {
                return Err(SocketError::NotBound);
            }
            Ok(entry.socket().local_addr()?)
        });

        if let Ok(addr) = &result {
            span.record_address(addr);
        }
        span.finish(result)
    }

    /// Address of the connected peer
    pub fn peer_addr(&self, handle: SocketHandle) -> SocketResult<SocketAddress> {
        let span = span_operation("socket_peer_addr");
        let _guard = span.enter();
        span.record_handle(handle);

        let result = self.entry(handle).and_then(|entry| {
            if entry.state() != SocketState::Connected {
                return Err(SocketError::NotConnected);
            }
            Ok(entry.socket().peer_addr()?)
        });

        if let Ok(addr) = &result {
            span.record_address(addr);
        }
        span.finish(result)
    }

    /// Write the local address into `out` in `sockaddr` layout
    ///
    /// Never writes past `out`; the returned length reports how much was
    /// written and how much the full address needs.
    pub fn local_addr_into(&self, handle: SocketHandle, out: &mut [u8]) -> SocketResult<AddressLen> {
        Ok(self.local_addr(handle)?.encode_into(out))
    }

    /// Write the peer address into `out` in `sockaddr` layout
    pub fn peer_addr_into(&self, handle: SocketHandle, out: &mut [u8]) -> SocketResult<AddressLen> {
        Ok(self.peer_addr(handle)?.encode_into(out))
    }
}
