//! The managed heap
//!
//! A `Heap` owns two young semi-spaces, one old space and the handle table.
//! Clients allocate, read, write and release objects through handles;
//! collections are triggered explicitly with
//! [`minor_collection`](Heap::minor_collection) and
//! [`major_collection`](Heap::major_collection).

use super::allocator::{Address, Arena, SpaceId};
use super::handles::{Handle, HandleTable};
use super::header::HEADER_SIZE;
use crate::config::HeapConfig;
use crate::error::{ConfigError, HeapError};

/// Read-only view of one block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    /// Offset of the block header within its arena
    pub offset: usize,
    pub free: bool,
    /// Payload size in bytes
    pub size: usize,
    /// Owning handle, for used blocks
    pub handle: Option<Handle>,
    /// Minor collections survived
    pub survival: u32,
}

/// Generational heap context
pub struct Heap {
    pub(super) config: HeapConfig,
    /// Indexed by [`SpaceId::index`]
    pub(super) arenas: [Arena; 3],
    pub(super) handles: HandleTable,
    /// Young space new objects go to
    pub(super) current: SpaceId,
}

impl Heap {
    /// Create a heap laid out according to `config`
    pub fn new(config: HeapConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Heap {
            arenas: [
                Arena::new(SpaceId::Young0, config.young_size),
                Arena::new(SpaceId::Young1, config.young_size),
                Arena::new(SpaceId::Old, config.old_size),
            ],
            handles: HandleTable::new(config.handle_capacity),
            current: SpaceId::Young0,
            config,
        })
    }

    /// Discard all objects and rebuild the heap with a new configuration
    ///
    /// Every arena becomes a single free block and all handles are dropped.
    pub fn configure(&mut self, config: HeapConfig) -> Result<(), ConfigError> {
        *self = Heap::new(config)?;
        log::debug!("heap reconfigured: {:?}", self.config);
        Ok(())
    }

    #[inline]
    pub fn config(&self) -> &HeapConfig {
        &self.config
    }

    /// Young space currently receiving allocations
    #[inline]
    pub fn current_young(&self) -> SpaceId {
        self.current
    }

    #[inline]
    pub fn arena(&self, space: SpaceId) -> &Arena {
        &self.arenas[space.index()]
    }

    #[inline]
    pub(super) fn arena_mut(&mut self, space: SpaceId) -> &mut Arena {
        &mut self.arenas[space.index()]
    }

    #[inline]
    pub fn handles(&self) -> &HandleTable {
        &self.handles
    }

    /// Allocate an object of `size` bytes in the current young space
    pub fn allocate(&mut self, size: usize) -> Result<Handle, HeapError> {
        if self.handles.is_full() {
            log::warn!("handle table full, refusing {} bytes", size);
            return Err(HeapError::TableFull {
                capacity: self.handles.capacity(),
            });
        }

        let space = self.current;
        let strategy = self.config.strategy;
        let offset = self.arena_mut(space).allocate(size, strategy)?;
        let address = Address::new(space, offset);
        let handle = self.handles.push(address)?;

        let arena = self.arena_mut(space);
        let mut header = arena.header(address.header_offset());
        header.handle = Some(handle.raw());
        arena.set_header(address.header_offset(), &header);

        log::debug!("allocated {} -> {} ({} bytes)", handle, address, size);
        Ok(handle)
    }

    /// Free the object behind `handle` and retire the handle
    pub fn release(&mut self, handle: Handle) -> Result<(), HeapError> {
        let address = self.handles.get(handle)?;
        self.arena_mut(address.space).free(address.offset)?;
        self.handles.clear_slot(handle);

        log::debug!("released {} at {}", handle, address);
        Ok(())
    }

    /// Current address of the object behind `handle`
    pub fn dereference(&self, handle: Handle) -> Result<Address, HeapError> {
        self.handles.get(handle)
    }

    /// Payload bytes of the object behind `handle`
    pub fn payload(&self, handle: Handle) -> Result<&[u8], HeapError> {
        let address = self.handles.get(handle)?;
        Ok(self.arena(address.space).payload(address.offset))
    }

    /// Mutable payload bytes of the object behind `handle`
    pub fn payload_mut(&mut self, handle: Handle) -> Result<&mut [u8], HeapError> {
        let address = self.handles.get(handle)?;
        Ok(self.arena_mut(address.space).payload_mut(address.offset))
    }

    /// Blocks of `space` in address order
    pub fn blocks(&self, space: SpaceId) -> impl Iterator<Item = BlockInfo> + '_ {
        self.arena(space).blocks().map(|(offset, header)| BlockInfo {
            offset,
            free: header.free,
            size: header.size,
            handle: if header.free {
                None
            } else {
                header.handle.map(Handle::from_raw)
            },
            survival: header.survival,
        })
    }

    /// Header offsets on the free list of `space`, ascending
    #[inline]
    pub fn free_list(&self, space: SpaceId) -> &[usize] {
        self.arena(space).free_list()
    }

    /// Free payload bytes in `space`
    #[inline]
    pub fn free_bytes(&self, space: SpaceId) -> usize {
        self.arena(space).free_bytes()
    }

    /// Bytes, headers included, taken by live objects in `space`
    pub fn used_bytes(&self, space: SpaceId) -> usize {
        self.blocks(space)
            .filter(|block| !block.free)
            .map(|block| block.size + HEADER_SIZE)
            .sum()
    }
}
