/*!
 * Socket Manager
 * Handle lifecycle: creation, accept, shutdown, and release
 *
 * # Design
 * - **Single table**: every handle resolves through one generation-checked
 *   arena; the table lock is never held across a stack call
 * - **Reserve, then create**: create and accept claim a slot before touching the
 *   stack, and an error on any later step releases both the slot and any object
 *   created so far
 * - **Release last**: close unlinks the handle first, so a concurrent lookup
 *   fails with `InvalidHandle`, and drops the stack object last
 */

use super::entry::{Direction, SocketEntry, SocketState};
use super::handle::SocketHandle;
use super::table::HandleTable;
use crate::config::SocketConfig;
use crate::core::errors::{SocketError, SocketResult};
use crate::core::limits::INITIAL_HANDLE_SLOTS;
use crate::core::types::{AddressFamily, Protocol, Shutdown, SocketKind, SocketType};
use crate::monitoring::span_operation;
use crate::net::SocketAddress;
use crate::stack::{HostStack, NetworkStack};
use serde::{Deserialize, Serialize};
use std::io;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Point-in-time view of the handle table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketStats {
    pub live_handles: usize,
    pub reserved_slots: usize,
    pub capacity: usize,
    pub created: usize,
    pub bound: usize,
    pub listening: usize,
    pub connected: usize,
    pub streams: usize,
    pub datagrams: usize,
    /// Objects the stack reports as alive
    pub open_objects: usize,
}

/// Description of one live handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleInfo {
    pub handle: SocketHandle,
    pub kind: SocketKind,
    pub state: SocketState,
    pub nonblocking: bool,
}

/// BSD-style socket layer over a network stack
///
/// Cloning is cheap; clones share the handle table and the stack.
#[derive(Clone)]
pub struct SocketManager {
    stack: Arc<dyn NetworkStack>,
    table: Arc<HandleTable>,
    config: SocketConfig,
}

impl SocketManager {
    pub fn new(stack: Arc<dyn NetworkStack>, config: SocketConfig) -> Self {
        let table = Arc::new(HandleTable::new(config.max_handles, INITIAL_HANDLE_SLOTS));
        info!(
            capacity = config.max_handles,
            max_backlog = config.max_backlog,
            nonblocking = config.nonblocking,
            "Socket manager initialized"
        );
        Self {
            stack,
            table,
            config,
        }
    }

    /// Manager over the host kernel stack
    pub fn host(config: SocketConfig) -> Self {
        Self::new(Arc::new(HostStack::new()), config)
    }

    pub fn config(&self) -> &SocketConfig {
        &self.config
    }

    pub(crate) fn entry(&self, handle: SocketHandle) -> SocketResult<Arc<SocketEntry>> {
        self.table.get(handle)
    }

    /// Create a socket with the configured default blocking mode
    pub fn create(&self, kind: SocketKind) -> SocketResult<SocketHandle> {
        self.create_with_mode(kind, self.config.nonblocking)
    }

    /// Create a socket from raw AF_*, SOCK_*, and IPPROTO_* values
    ///
    /// `SOCK_NONBLOCK` in `ty` selects non-blocking mode. Values the stack does
    /// not know are refused like any other unsupported combination.
    pub fn create_raw(&self, domain: i32, ty: i32, protocol: i32) -> SocketResult<SocketHandle> {
        let refuse = |e: SocketError| {
            warn!(domain, ty, protocol, error = %e, "refusing socket creation");
            SocketError::AllocationFailed(e.to_string())
        };
        let family = AddressFamily::from_raw(domain).map_err(refuse)?;
        let (socket_type, nonblocking) = SocketType::from_raw(ty).map_err(refuse)?;
        let protocol = Protocol::from_raw(protocol).map_err(refuse)?;

        let kind = SocketKind::new(family, socket_type, protocol);
        self.create_with_mode(kind, nonblocking || self.config.nonblocking)
    }

    fn create_with_mode(&self, kind: SocketKind, nonblocking: bool) -> SocketResult<SocketHandle> {
        let span = span_operation("socket_create");
        let _guard = span.enter();

        let result = self.create_inner(kind, nonblocking);
        if let Ok(handle) = &result {
            span.record_handle(handle);
            info!(
                handle = %handle,
                family = ?kind.family,
                socket_type = ?kind.socket_type,
                nonblocking,
                "Created socket"
            );
        }
        span.finish(result)
    }

    fn create_inner(&self, kind: SocketKind, nonblocking: bool) -> SocketResult<SocketHandle> {
        let reservation = self.table.reserve().map_err(|e| {
            warn!(error = %e, "socket creation refused");
            e
        })?;

        let socket = self.stack.create(kind).map_err(|e| {
            warn!(kind = ?kind, error = %e, "stack refused socket creation");
            SocketError::AllocationFailed(format!("stack refused {:?}: {}", kind, e))
        })?;

        if nonblocking {
            socket.set_nonblocking(true)?;
        }

        Ok(reservation.commit(SocketEntry::new(
            socket,
            kind,
            SocketState::Created,
            nonblocking,
        )))
    }

    /// Take the next pending connection from a listening handle
    ///
    /// The new handle inherits the listener's family, type, and protocol. When
    /// `want_peer` is set and the peer address cannot be read, the new handle is
    /// released before the error is returned.
    pub fn accept(
        &self,
        listener: SocketHandle,
        want_peer: bool,
    ) -> SocketResult<(SocketHandle, Option<SocketAddress>)> {
        let span = span_operation("socket_accept").blocking();
        let _guard = span.enter();
        span.record_handle(listener);

        let result = self.accept_inner(listener, want_peer);
        match &result {
            Ok((handle, peer)) => {
                if let Some(peer) = peer {
                    span.record_address(peer);
                }
                info!(listener = %listener, handle = %handle, peer = ?peer, "Accepted connection");
            }
            Err(SocketError::WouldBlock) => {}
            Err(e) => debug!(listener = %listener, error = %e, "accept failed"),
        }
        span.finish(result)
    }

    fn accept_inner(
        &self,
        listener: SocketHandle,
        want_peer: bool,
    ) -> SocketResult<(SocketHandle, Option<SocketAddress>)> {
        let entry = self.table.get(listener)?;
        entry.require_state(&[SocketState::Listening], "accept")?;
        if entry.is_cancelled(Direction::Read) {
            return Err(SocketError::Shutdown);
        }

        let reservation = self.table.reserve()?;

        let child = entry
            .socket()
            .accept()
            .map_err(|e| entry.classify(e, Direction::Read))?;

        let peer = if want_peer {
            Some(child.peer_addr().map_err(|e| {
                warn!(listener = %listener, error = %e, "peer address unavailable, releasing accepted socket");
                SocketError::from(e)
            })?)
        } else {
            None
        };

        let nonblocking = self.config.nonblocking;
        if nonblocking {
            child.set_nonblocking(true)?;
        }

        let handle = reservation.commit(SocketEntry::new(
            child,
            entry.kind(),
            SocketState::Connected,
            nonblocking,
        ));
        Ok((handle, peer))
    }

    /// Disable receiving, sending, or both without releasing the handle
    ///
    /// Calls blocked on the disabled direction return `SocketError::Shutdown`.
    /// Repeating a shutdown that is already in effect succeeds.
    pub fn shutdown(&self, handle: SocketHandle, how: Shutdown) -> SocketResult<()> {
        let span = span_operation("socket_shutdown");
        let _guard = span.enter();
        span.record_handle(handle);

        let result = self.shutdown_inner(handle, how);
        if result.is_ok() {
            debug!(handle = %handle, how = ?how, "Socket shut down");
        }
        span.finish(result)
    }

    fn shutdown_inner(&self, handle: SocketHandle, how: Shutdown) -> SocketResult<()> {
        let entry = self.table.get(handle)?;

        let previous = entry.mark_shutdown(how);
        if SocketEntry::already_shut(previous, how) {
            return Ok(());
        }

        match entry.socket().shutdown(how) {
            Ok(()) => Ok(()),
            // never connected, or the connection already went away; waiters are
            // woken either way and the recorded bits stay in effect
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            Err(e) => {
                entry.rollback_shutdown(previous, how);
                Err(e.into())
            }
        }
    }

    /// Release a handle and its stack object
    pub fn close(&self, handle: SocketHandle) -> SocketResult<()> {
        let span = span_operation("socket_close");
        let _guard = span.enter();
        span.record_handle(handle);

        let result = self.table.remove(handle).map(|entry| {
            entry.set_state(SocketState::Closed);

            // another context is still inside a call on this object
            if Arc::strong_count(&entry) > 1 {
                entry.mark_shutdown(Shutdown::Both);
                if let Err(e) = entry.socket().shutdown(Shutdown::Both) {
                    debug!(handle = %handle, error = %e, "shutdown during close failed");
                }
            }

            info!(handle = %handle, kind = ?entry.kind(), "Closed socket");
            drop(entry);
        });

        if let Err(e) = &result {
            warn!(handle = %handle, error = %e, "close on released handle");
        }
        span.finish(result)
    }

    /// Switch a handle between blocking and non-blocking mode
    pub fn set_nonblocking(&self, handle: SocketHandle, nonblocking: bool) -> SocketResult<()> {
        let span = span_operation("socket_set_nonblocking");
        let _guard = span.enter();
        span.record_handle(handle);

        let result = self.table.get(handle).and_then(|entry| {
            entry.socket().set_nonblocking(nonblocking)?;
            entry.set_nonblocking_flag(nonblocking);
            Ok(())
        });

        if result.is_ok() {
            debug!(handle = %handle, nonblocking, "Changed blocking mode");
        }
        span.finish(result)
    }

    pub fn handle_info(&self, handle: SocketHandle) -> SocketResult<HandleInfo> {
        let entry = self.table.get(handle)?;
        Ok(HandleInfo {
            handle,
            kind: entry.kind(),
            state: entry.state(),
            nonblocking: entry.is_nonblocking(),
        })
    }

    /// Every live handle, in slot order
    pub fn handles(&self) -> Vec<HandleInfo> {
        self.table
            .entries()
            .into_iter()
            .map(|(handle, entry)| HandleInfo {
                handle,
                kind: entry.kind(),
                state: entry.state(),
                nonblocking: entry.is_nonblocking(),
            })
            .collect()
    }

    /// Objects the stack reports as alive
    pub fn open_objects(&self) -> usize {
        self.stack.open_objects()
    }

    pub fn stats(&self) -> SocketStats {
        let mut stats = SocketStats {
            reserved_slots: self.table.reserved(),
            capacity: self.table.capacity(),
            open_objects: self.stack.open_objects(),
            ..SocketStats::default()
        };

        for (_, entry) in self.table.entries() {
            stats.live_handles += 1;
            match entry.state() {
                SocketState::Created => stats.created += 1,
                SocketState::Bound => stats.bound += 1,
                SocketState::Listening => stats.listening += 1,
                SocketState::Connected => stats.connected += 1,
                SocketState::Closed => {}
            }
            if entry.kind().is_stream() {
                stats.streams += 1;
            } else {
                stats.datagrams += 1;
            }
        }
        stats
    }
}

impl std::fmt::Debug for SocketManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketManager")
            .field("config", &self.config)
            .field("live_handles", &self.table.len())
            .finish()
    }
}
