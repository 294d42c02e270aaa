/*!
 * Socket Entries
 * Per-handle record: the stack object, its identity, state, and shutdown bits
 */

use crate::core::errors::{SocketError, SocketResult};
use crate::core::types::{Shutdown, SocketKind};
use crate::stack::StackSocket;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Lifecycle state of a handle
///
/// `Created → Bound? → {Listening | Connected} → Closed`. Closed entries are no
/// longer reachable through the table; the state is only observed by calls that
/// were already in flight when the handle was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum SocketState {
    Created = 0,
    Bound = 1,
    Listening = 2,
    Connected = 3,
    Closed = 4,
}

impl SocketState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SocketState::Created,
            1 => SocketState::Bound,
            2 => SocketState::Listening,
            3 => SocketState::Connected,
            _ => SocketState::Closed,
        }
    }
}

const SHUT_READ: u8 = 0b01;
const SHUT_WRITE: u8 = 0b10;

fn shutdown_bits(how: Shutdown) -> u8 {
    let mut bits = 0;
    if how.covers_read() {
        bits |= SHUT_READ;
    }
    if how.covers_write() {
        bits |= SHUT_WRITE;
    }
    bits
}

/// Which half of the connection an operation uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Read,
    Write,
}

pub(crate) struct SocketEntry {
    socket: Box<dyn StackSocket>,
    kind: SocketKind,
    state: AtomicU8,
    shutdown: AtomicU8,
    nonblocking: AtomicBool,
}

impl SocketEntry {
    pub(crate) fn new(
        socket: Box<dyn StackSocket>,
        kind: SocketKind,
        state: SocketState,
        nonblocking: bool,
    ) -> Self {
        Self {
            socket,
            kind,
            state: AtomicU8::new(state as u8),
            shutdown: AtomicU8::new(0),
            nonblocking: AtomicBool::new(nonblocking),
        }
    }

    pub(crate) fn socket(&self) -> &dyn StackSocket {
        self.socket.as_ref()
    }

    pub(crate) fn kind(&self) -> SocketKind {
        self.kind
    }

    pub(crate) fn state(&self) -> SocketState {
        SocketState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: SocketState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Fail with `InvalidState` unless the handle is in one of `allowed`
    pub(crate) fn require_state(&self, allowed: &[SocketState], op: &str) -> SocketResult<()> {
        let state = self.state();
        if allowed.contains(&state) {
            Ok(())
        } else {
            Err(SocketError::InvalidState(format!(
                "{} not allowed in state {:?}",
                op, state
            )))
        }
    }

    pub(crate) fn is_nonblocking(&self) -> bool {
        self.nonblocking.load(Ordering::Acquire)
    }

    pub(crate) fn set_nonblocking_flag(&self, nonblocking: bool) {
        self.nonblocking.store(nonblocking, Ordering::Release);
    }

    /// Record a local shutdown, returning the directions that were already shut
    pub(crate) fn mark_shutdown(&self, how: Shutdown) -> u8 {
        self.shutdown.fetch_or(shutdown_bits(how), Ordering::AcqRel)
    }

    /// Clear the bits a failed shutdown added, leaving bits recorded by
    /// anyone else in place
    pub(crate) fn rollback_shutdown(&self, previous: u8, how: Shutdown) {
        let added = shutdown_bits(how) & !previous;
        self.shutdown.fetch_and(!added, Ordering::AcqRel);
    }

    pub(crate) fn already_shut(previous: u8, how: Shutdown) -> bool {
        let bits = shutdown_bits(how);
        previous & bits == bits
    }

    pub(crate) fn is_shut(&self, direction: Direction) -> bool {
        let bits = self.shutdown.load(Ordering::Acquire);
        match direction {
            Direction::Read => bits & SHUT_READ != 0,
            Direction::Write => bits & SHUT_WRITE != 0,
        }
    }

    /// Whether a local shutdown or close has cancelled `direction`
    pub(crate) fn is_cancelled(&self, direction: Direction) -> bool {
        self.is_shut(direction) || self.state() == SocketState::Closed
    }

    /// Classify a failed stack call, surfacing local cancellation uniformly
    pub(crate) fn classify(&self, err: io::Error, direction: Direction) -> SocketError {
        if self.is_cancelled(direction) {
            SocketError::Shutdown
        } else {
            SocketError::from(err)
        }
    }
}

impl fmt::Debug for SocketEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketEntry")
            .field("kind", &self.kind)
            .field("state", &self.state())
            .field("shutdown", &self.shutdown.load(Ordering::Relaxed))
            .field("nonblocking", &self.is_nonblocking())
            .finish()
    }
}
