/*!
 * Handle Table
 * Single authoritative arena of socket entries with generation-checked slots
 *
 * # Design
 * - Slots are reused through a free list; each release bumps the slot's
 *   generation so stale handles fail the lookup
 * - New handles go through a [`Reservation`]: the slot is claimed first, the
 *   stack object is created second, and the reservation either commits or, when
 *   dropped on an error path, returns the slot untouched
 * - Lookups clone an `Arc` to the entry and drop the table lock before any stack
 *   call, so a blocked call on one handle never stalls another handle
 */

use super::entry::SocketEntry;
use super::handle::SocketHandle;
use crate::core::errors::{SocketError, SocketResult};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::trace;

enum Slot {
    Vacant,
    Reserved,
    Occupied(Arc<SocketEntry>),
}

struct SlotEntry {
    generation: u32,
    slot: Slot,
}

struct Slots {
    entries: Vec<SlotEntry>,
    free: Vec<u32>,
    live: usize,
    reserved: usize,
}

pub(crate) struct HandleTable {
    inner: Mutex<Slots>,
    capacity: usize,
}

impl HandleTable {
    pub(crate) fn new(capacity: usize, initial_slots: usize) -> Self {
        let initial = initial_slots.min(capacity);
        Self {
            inner: Mutex::new(Slots {
                entries: Vec::with_capacity(initial),
                free: Vec::with_capacity(initial),
                live: 0,
                reserved: 0,
            }),
            capacity,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Claim a slot for a handle that is about to be created
    pub(crate) fn reserve(&self) -> SocketResult<Reservation<'_>> {
        let mut slots = self.inner.lock();

        if slots.live + slots.reserved >= self.capacity {
            return Err(SocketError::AllocationFailed(format!(
                "handle table full ({} handles)",
                self.capacity
            )));
        }

        let index = match slots.free.pop() {
            Some(index) => index,
            None => {
                slots.entries.try_reserve(1)?;
                // room for every index to sit on the free list at once
                let free_needed = slots.entries.len() + 1 - slots.free.len();
                slots.free.try_reserve(free_needed)?;
                let index = u32::try_from(slots.entries.len()).map_err(|_| {
                    SocketError::AllocationFailed("handle index space exhausted".into())
                })?;
                slots.entries.push(SlotEntry {
                    generation: 0,
                    slot: Slot::Vacant,
                });
                index
            }
        };

        let entry = &mut slots.entries[index as usize];
        entry.slot = Slot::Reserved;
        let generation = entry.generation;
        slots.reserved += 1;

        trace!(index, generation, "reserved handle slot");
        Ok(Reservation {
            table: self,
            handle: SocketHandle::new(index, generation),
            committed: false,
        })
    }

    /// Resolve a live handle
    pub(crate) fn get(&self, handle: SocketHandle) -> SocketResult<Arc<SocketEntry>> {
        let slots = self.inner.lock();
        match slots.entries.get(handle.index()) {
            Some(SlotEntry {
                generation,
                slot: Slot::Occupied(entry),
            }) if *generation == handle.generation() => Ok(Arc::clone(entry)),
            _ => Err(SocketError::InvalidHandle(handle.to_string())),
        }
    }

    /// Release a live handle, returning its entry
    ///
    /// The slot is vacated and its generation bumped before the entry is handed
    /// back, so the handle is dead to every other caller from this point on.
    pub(crate) fn remove(&self, handle: SocketHandle) -> SocketResult<Arc<SocketEntry>> {
        let mut slots = self.inner.lock();
        let slot_entry = match slots.entries.get_mut(handle.index()) {
            Some(slot_entry) if slot_entry.generation == handle.generation() => slot_entry,
            _ => return Err(SocketError::InvalidHandle(handle.to_string())),
        };

        let entry = match std::mem::replace(&mut slot_entry.slot, Slot::Vacant) {
            Slot::Occupied(entry) => entry,
            other => {
                slot_entry.slot = other;
                return Err(SocketError::InvalidHandle(handle.to_string()));
            }
        };
        slot_entry.generation = slot_entry.generation.wrapping_add(1);

        // free list capacity covers every slot, so this never reallocates
        slots.free.push(handle.index() as u32);
        slots.live -= 1;
        Ok(entry)
    }

    /// Number of live handles
    pub(crate) fn len(&self) -> usize {
        self.inner.lock().live
    }

    /// Number of slots claimed by in-progress creations
    pub(crate) fn reserved(&self) -> usize {
        self.inner.lock().reserved
    }

    /// Snapshot of every live entry
    pub(crate) fn entries(&self) -> Vec<(SocketHandle, Arc<SocketEntry>)> {
        let slots = self.inner.lock();
        slots
            .entries
            .iter()
            .enumerate()
            .filter_map(|(index, slot_entry)| match &slot_entry.slot {
                Slot::Occupied(entry) => Some((
                    SocketHandle::new(index as u32, slot_entry.generation),
                    Arc::clone(entry),
                )),
                _ => None,
            })
            .collect()
    }

    fn commit(&self, handle: SocketHandle, entry: SocketEntry) {
        let mut slots = self.inner.lock();
        slots.entries[handle.index()].slot = Slot::Occupied(Arc::new(entry));
        slots.reserved -= 1;
        slots.live += 1;
    }

    fn abandon(&self, handle: SocketHandle) {
        let mut slots = self.inner.lock();
        let slot_entry = &mut slots.entries[handle.index()];
        slot_entry.slot = Slot::Vacant;
        slot_entry.generation = slot_entry.generation.wrapping_add(1);
        slots.free.push(handle.index() as u32);
        slots.reserved -= 1;
        trace!(%handle, "abandoned handle reservation");
    }
}

/// A claimed slot awaiting its socket object
///
/// Dropping an uncommitted reservation returns the slot to the free list.
pub(crate) struct Reservation<'a> {
    table: &'a HandleTable,
    handle: SocketHandle,
    committed: bool,
}

impl Reservation<'_> {
    #[cfg(test)]
    pub(crate) fn handle(&self) -> SocketHandle {
        self.handle
    }

    pub(crate) fn commit(mut self, entry: SocketEntry) -> SocketHandle {
        self.table.commit(self.handle, entry);
        self.committed = true;
        self.handle
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.table.abandon(self.handle);
        }
    }
}
