//! Block headers
//!
//! Every block in every arena starts with a header. It is stored in the
//! arena bytes themselves so that moving a block moves its header with it.
//!
//! Layout (little-endian):
//! ```text
//! +--------+--------+--------------+--------------+------------------
//! | flags  |  size  | handle index | survival amt | payload ...
//! |  u32   |  u32   |     u32      |     u32      | (size bytes)
//! +--------+--------+--------------+--------------+------------------
//! 0        4        8              12             16
//! ```
//!
//! Free-list links are kept by the arena, not in the header.

/// Size of a block header in bytes
pub const HEADER_SIZE: usize = 16;

/// Flag bit set on free blocks
const FLAG_FREE: u32 = 1;

/// Handle index stored on blocks without an owner
const NO_HANDLE: u32 = u32::MAX;

/// Decoded block header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Whether the block is on its arena's free list
    pub free: bool,
    /// Payload size in bytes, excluding the header
    pub size: usize,
    /// Handle slot owning this block (used blocks only)
    pub handle: Option<u32>,
    /// Minor collections survived without promotion
    pub survival: u32,
}

impl BlockHeader {
    /// Header of a free block
    #[inline]
    pub const fn free(size: usize) -> Self {
        BlockHeader {
            free: true,
            size,
            handle: None,
            survival: 0,
        }
    }

    /// Header of a freshly allocated block
    #[inline]
    pub const fn used(size: usize) -> Self {
        BlockHeader {
            free: false,
            size,
            handle: None,
            survival: 0,
        }
    }

    /// Header plus payload size in bytes
    #[inline]
    pub const fn total_size(&self) -> usize {
        HEADER_SIZE + self.size
    }

    /// Decode the header stored at `offset`
    pub fn read(bytes: &[u8], offset: usize) -> Self {
        let word = |i: usize| {
            let at = offset + i * 4;
            u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
        };
        let handle = word(2);
        BlockHeader {
            free: word(0) & FLAG_FREE != 0,
            size: word(1) as usize,
            handle: (handle != NO_HANDLE).then_some(handle),
            survival: word(3),
        }
    }

    /// Encode this header at `offset`
    pub fn write(&self, bytes: &mut [u8], offset: usize) {
        let words = [
            if self.free { FLAG_FREE } else { 0 },
            self.size as u32,
            self.handle.unwrap_or(NO_HANDLE),
            self.survival,
        ];
        for (i, word) in words.iter().enumerate() {
            let at = offset + i * 4;
            bytes[at..at + 4].copy_from_slice(&word.to_le_bytes());
        }
    }
}
