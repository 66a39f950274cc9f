//! Error types
//!
//! `HeapError` covers everything a client call can run into,
//! `ConfigError` is raised when a heap is (re)configured and
//! `IntegrityError` is reported by [`Heap::verify`](crate::Heap::verify).

use std::fmt;

use crate::gc::{Handle, SpaceId};

/// Error from an allocation, release, lookup or collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeapError {
    /// No free block in `space` is large enough for the request
    OutOfMemory { space: SpaceId, requested: usize },
    /// Every handle slot has been handed out
    TableFull { capacity: usize },
    /// The handle was released earlier
    UseAfterRelease(Handle),
    /// The handle was never issued by this heap
    InvalidHandle(Handle),
    /// Tried to free a block that is not in use
    NotAllocated { space: SpaceId, offset: usize },
    /// A minor collection could not promote an object; nothing was changed
    PromotionFailed { handle: Handle, size: usize },
}

impl fmt::Display for HeapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeapError::OutOfMemory { space, requested } => {
                write!(f, "out of memory in {}: no block for {} bytes", space, requested)
            }
            HeapError::TableFull { capacity } => {
                write!(f, "handle table full ({} slots)", capacity)
            }
            HeapError::UseAfterRelease(handle) => write!(f, "use of released handle {}", handle),
            HeapError::InvalidHandle(handle) => write!(f, "invalid handle {}", handle),
            HeapError::NotAllocated { space, offset } => {
                write!(f, "block at {}+{:#x} is not allocated", space, offset)
            }
            HeapError::PromotionFailed { handle, size } => write!(
                f,
                "minor collection aborted: old space cannot hold {} ({} bytes)",
                handle, size
            ),
        }
    }
}

impl std::error::Error for HeapError {}

/// Invalid heap configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Arena size is not a multiple of the allocation alignment
    Misaligned { arena: &'static str, size: usize },
    /// Arena cannot hold even a single block header
    TooSmall { arena: &'static str, size: usize },
    /// Arena offsets would not fit in a block header
    TooLarge { arena: &'static str, size: usize },
    /// Handle table capacity out of range
    HandleCapacity(usize),
    /// A promotion threshold of zero would promote at allocation time
    ZeroPromotionThreshold,
    /// Unrecognised strategy name
    UnknownStrategy(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Misaligned { arena, size } => {
                write!(f, "{} arena size {} is not a multiple of 8", arena, size)
            }
            ConfigError::TooSmall { arena, size } => {
                write!(f, "{} arena size {} cannot hold a block header", arena, size)
            }
            ConfigError::TooLarge { arena, size } => {
                write!(f, "{} arena size {} is too large", arena, size)
            }
            ConfigError::HandleCapacity(capacity) => {
                write!(f, "invalid handle capacity {}", capacity)
            }
            ConfigError::ZeroPromotionThreshold => {
                write!(f, "promotion threshold must be at least 1")
            }
            ConfigError::UnknownStrategy(name) => write!(f, "unknown strategy '{}'", name),
        }
    }
}

impl std::error::Error for ConfigError {}

/// A broken heap invariant found by the integrity checker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    /// Blocks do not tile the arena exactly
    Partition { space: SpaceId, offset: usize },
    /// A payload size is not aligned
    Misaligned { space: SpaceId, offset: usize, size: usize },
    /// Free list is not strictly ascending
    FreeListOrder { space: SpaceId, offset: usize },
    /// Free list entry does not name a free block
    FreeListEntry { space: SpaceId, offset: usize },
    /// A free block is missing from the free list
    FreeListMissing { space: SpaceId, offset: usize },
    /// A live handle points somewhere other than the payload of its block
    DanglingHandle(Handle),
    /// A used block is not referenced by its handle slot
    OrphanBlock { space: SpaceId, offset: usize },
}

impl fmt::Display for IntegrityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityError::Partition { space, offset } => {
                write!(f, "{}: blocks do not tile the arena at {:#x}", space, offset)
            }
            IntegrityError::Misaligned {
                space,
                offset,
                size,
            } => write!(f, "{}: block at {:#x} has unaligned size {}", space, offset, size),
            IntegrityError::FreeListOrder { space, offset } => {
                write!(f, "{}: free list out of order at {:#x}", space, offset)
            }
            IntegrityError::FreeListEntry { space, offset } => {
                write!(f, "{}: free list entry {:#x} is not a free block", space, offset)
            }
            IntegrityError::FreeListMissing { space, offset } => {
                write!(f, "{}: free block at {:#x} is not on the free list", space, offset)
            }
            IntegrityError::DanglingHandle(handle) => {
                write!(f, "handle {} does not resolve to its block", handle)
            }
            IntegrityError::OrphanBlock { space, offset } => {
                write!(f, "{}: used block at {:#x} has no handle", space, offset)
            }
        }
    }
}

impl std::error::Error for IntegrityError {}
