/*!
 * Socket Handles
 * Opaque, generation-checked references into the handle table
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque reference to one socket object
///
/// A handle names a table slot plus the generation the slot had when the handle
/// was issued. Closing a handle bumps the slot's generation, so a stale copy of a
/// released handle never resolves to whatever reuses the slot later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SocketHandle {
    index: u32,
    generation: u32,
}

impl SocketHandle {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub(crate) fn index(&self) -> usize {
        self.index as usize
    }

    pub(crate) fn generation(&self) -> u32 {
        self.generation
    }

    /// Pack into a single integer for callers that pass descriptors around
    pub fn into_raw(self) -> u64 {
        ((self.generation as u64) << 32) | self.index as u64
    }

    /// Rebuild a handle from [`SocketHandle::into_raw`]
    ///
    /// Any value is accepted; liveness is checked when the handle is used.
    pub fn from_raw(raw: u64) -> Self {
        Self {
            index: raw as u32,
            generation: (raw >> 32) as u32,
        }
    }
}

impl fmt::Display for SocketHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sock#{}.{}", self.index, self.generation)
    }
}
