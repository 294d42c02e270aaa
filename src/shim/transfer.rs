/*!
 * Data Transfer
 * send/recv and sendto/recvfrom over the stack's vectored-buffer calls
 *
 * Each call hands the caller's flat buffer to the stack as exactly one vectored
 * element, borrowed for the duration of the call. A call that returns after a
 * local shutdown or close of its direction reports `SocketError::Shutdown`.
 */

use crate::core::errors::{SocketError, SocketResult};
use crate::core::types::MsgFlags;
use crate::monitoring::span_operation;
use crate::net::{AddressLen, SocketAddress};
use crate::sockets::{Direction, SocketEntry, SocketHandle, SocketManager, SocketState};
use std::io::{IoSlice, IoSliceMut};
use std::sync::Arc;
use tracing::trace;

/// Allocate a zeroed receive buffer without aborting on exhaustion
fn receive_buffer(capacity: usize) -> SocketResult<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(capacity)?;
    buf.resize(capacity, 0);
    Ok(buf)
}

impl SocketManager {
    fn connected_entry(&self, handle: SocketHandle) -> SocketResult<Arc<SocketEntry>> {
        let entry = self.entry(handle)?;
        if entry.state() != SocketState::Connected {
            return Err(SocketError::NotConnected);
        }
        Ok(entry)
    }

    fn datagram_entry(&self, handle: SocketHandle, op: &str) -> SocketResult<Arc<SocketEntry>> {
        let entry = self.entry(handle)?;
        if !entry.kind().is_datagram() {
            return Err(SocketError::InvalidState(format!(
                "{} requires a datagram socket",
                op
            )));
        }
        Ok(entry)
    }

    /// Send on a connected handle
    ///
    /// Returns the number of bytes the stack accepted, which may be fewer than
    /// `buf.len()`.
    pub fn send(&self, handle: SocketHandle, buf: &[u8], flags: MsgFlags) -> SocketResult<usize> {
        let span = span_operation("socket_send").blocking();
        let _guard = span.enter();
        span.record_handle(handle);

        let result = self.connected_entry(handle).and_then(|entry| {
            if entry.is_cancelled(Direction::Write) {
                return Err(SocketError::Shutdown);
            }
            entry
                .socket()
                .send_vectored(&[IoSlice::new(buf)], flags)
                .map_err(|e| entry.classify(e, Direction::Write))
        });

        if let Ok(sent) = result {
            span.record_bytes(sent);
            trace!(handle = %handle, bytes = sent, "sent");
        }
        span.finish(result)
    }

    /// Receive on a connected handle into `buf`
    ///
    /// Returns `0` once the peer has shut down its sending side.
    pub fn recv(&self, handle: SocketHandle, buf: &mut [u8], flags: MsgFlags) -> SocketResult<usize> {
        let span = span_operation("socket_recv").blocking();
        let _guard = span.enter();
        span.record_handle(handle);

        let wants_data = !buf.is_empty();
        let result = self.connected_entry(handle).and_then(|entry| {
            if entry.is_cancelled(Direction::Read) {
                return Err(SocketError::Shutdown);
            }
            match entry
                .socket()
                .recv_vectored(&mut [IoSliceMut::new(buf)], flags)
            {
                Ok(0) if wants_data && entry.is_cancelled(Direction::Read) => {
                    Err(SocketError::Shutdown)
                }
                Ok(n) => Ok(n),
                Err(e) => Err(entry.classify(e, Direction::Read)),
            }
        });

        if let Ok(received) = result {
            span.record_bytes(received);
            trace!(handle = %handle, bytes = received, "received");
        }
        span.finish(result)
    }

    /// Receive up to `capacity` bytes into a new buffer
    pub fn recv_vec(
        &self,
        handle: SocketHandle,
        capacity: usize,
        flags: MsgFlags,
    ) -> SocketResult<Vec<u8>> {
        let mut buf = receive_buffer(capacity)?;
        let n = self.recv(handle, &mut buf, flags)?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Send one datagram to `dest`
    ///
    /// An unbound handle is bound implicitly by the stack and moves to `Bound`.
    pub fn send_to(
        &self,
        handle: SocketHandle,
        buf: &[u8],
        dest: impl Into<SocketAddress>,
        flags: MsgFlags,
    ) -> SocketResult<usize> {
        let dest = dest.into();
        let span = span_operation("socket_send_to").blocking();
        let _guard = span.enter();
        span.record_handle(handle);
        span.record_address(dest);

        let result = self.datagram_entry(handle, "send_to").and_then(|entry| {
            if entry.is_cancelled(Direction::Write) {
                return Err(SocketError::Shutdown);
            }
            let sent = entry
                .socket()
                .send_to_vectored(&[IoSlice::new(buf)], &dest, flags)
                .map_err(|e| entry.classify(e, Direction::Write))?;
            if entry.state() == SocketState::Created {
                entry.set_state(SocketState::Bound);
            }
            Ok(sent)
        });

        if let Ok(sent) = result {
            span.record_bytes(sent);
            trace!(handle = %handle, dest = %dest, bytes = sent, "sent datagram");
        }
        span.finish(result)
    }

    /// Receive one datagram into `buf`, returning its length and source
    ///
    /// A datagram longer than `buf` is truncated to fit.
    pub fn recv_from(
        &self,
        handle: SocketHandle,
        buf: &mut [u8],
        flags: MsgFlags,
    ) -> SocketResult<(usize, SocketAddress)> {
        let span = span_operation("socket_recv_from").blocking();
        let _guard = span.enter();
        span.record_handle(handle);

        let wants_data = !buf.is_empty();
        let result = self.datagram_entry(handle, "recv_from").and_then(|entry| {
            if entry.state() == SocketState::Created {
                return Err(SocketError::NotBound);
            }
            if entry.is_cancelled(Direction::Read) {
                return Err(SocketError::Shutdown);
            }
            match entry
                .socket()
                .recv_from_vectored(&mut [IoSliceMut::new(buf)], flags)
            {
                Ok((0, _)) if wants_data && entry.is_cancelled(Direction::Read) => {
                    Err(SocketError::Shutdown)
                }
                Ok(received) => Ok(received),
                Err(e) => Err(entry.classify(e, Direction::Read)),
            }
        });

        if let Ok((received, from)) = &result {
            span.record_bytes(*received);
            span.record_address(from);
            trace!(handle = %handle, from = %from, bytes = *received, "received datagram");
        }
        span.finish(result)
    }

    /// Receive one datagram of up to `capacity` bytes into a new buffer
    pub fn recv_from_vec(
        &self,
        handle: SocketHandle,
        capacity: usize,
        flags: MsgFlags,
    ) -> SocketResult<(Vec<u8>, SocketAddress)> {
        let mut buf = receive_buffer(capacity)?;
        let (n, from) = self.recv_from(handle, &mut buf, flags)?;
        buf.truncate(n);
        Ok((buf, from))
    }

    /// Receive one datagram, writing its source into `addr_out` in `sockaddr` layout
    pub fn recv_from_into(
        &self,
        handle: SocketHandle,
        buf: &mut [u8],
        addr_out: &mut [u8],
        flags: MsgFlags,
    ) -> SocketResult<(usize, AddressLen)> {
        let (n, from) = self.recv_from(handle, buf, flags)?;
        Ok((n, from.encode_into(addr_out)))
    }
}
