//! Handle table
//!
//! Collections move objects, so clients never hold addresses. They hold a
//! [`Handle`], a stable index into this table, and the table holds the
//! object's current [`Address`]. The collectors rewrite the table entry
//! every time they move a block.
//!
//! Slots are handed out in order and never reused. A released slot stays
//! empty for the life of the heap.

use std::fmt;

use super::allocator::Address;
use crate::error::HeapError;

/// Stable reference to a managed object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u32);

impl Handle {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Raw slot number, as stored in block headers
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Handle(raw)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Append-only table of handle slots
#[derive(Debug, Clone)]
pub struct HandleTable {
    slots: Vec<Option<Address>>,
    capacity: usize,
}

impl HandleTable {
    pub fn new(capacity: usize) -> Self {
        HandleTable {
            slots: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Number of slots handed out so far, released ones included
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.slots.len() >= self.capacity
    }

    /// Number of slots that still resolve
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Take the next slot for `address`
    pub fn push(&mut self, address: Address) -> Result<Handle, HeapError> {
        if self.is_full() {
            return Err(HeapError::TableFull {
                capacity: self.capacity,
            });
        }
        let handle = Handle(self.slots.len() as u32);
        self.slots.push(Some(address));
        Ok(handle)
    }

    /// Current address behind `handle`
    pub fn get(&self, handle: Handle) -> Result<Address, HeapError> {
        match self.slots.get(handle.index()) {
            Some(Some(address)) => Ok(*address),
            Some(None) => Err(HeapError::UseAfterRelease(handle)),
            None => Err(HeapError::InvalidHandle(handle)),
        }
    }

    /// Point a live slot at a new address
    pub(crate) fn set(&mut self, handle: Handle, address: Address) {
        if let Some(slot) = self.slots.get_mut(handle.index()) {
            debug_assert!(slot.is_some(), "retargeting released handle {}", handle);
            *slot = Some(address);
        }
    }

    /// Empty the slot behind `handle`
    pub(crate) fn clear_slot(&mut self, handle: Handle) {
        if let Some(slot) = self.slots.get_mut(handle.index()) {
            *slot = None;
        }
    }

    /// All slots in table order
    pub fn iter(&self) -> impl Iterator<Item = (Handle, Option<Address>)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, slot)| (Handle(index as u32), *slot))
    }

    /// Slots that still resolve, in table order
    pub fn live(&self) -> impl Iterator<Item = (Handle, Address)> + '_ {
        self.iter()
            .filter_map(|(handle, slot)| slot.map(|address| (handle, address)))
    }
}
