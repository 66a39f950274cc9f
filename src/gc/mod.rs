//! Generational heap and garbage collector
//!
//! The heap is split into two young semi-spaces and one old space.
//! New objects go to the current young space. A minor collection copies
//! the live young objects into the other semi-space, or into the old space
//! once they have survived enough collections. A major collection compacts
//! the old space in place.
//!
//! Objects are only reachable through handles, so moving them is safe as
//! long as the handle table is updated in the same step.

mod allocator;
mod collector;
mod handles;
mod header;
mod heap;
mod major;
mod minor;
mod verify;

pub use allocator::{Address, Arena, Blocks, SpaceId};
pub use collector::GcStats;
pub use handles::{Handle, HandleTable};
pub use header::{BlockHeader, HEADER_SIZE};
pub use heap::{BlockInfo, Heap};

use crate::error::{HeapError, IntegrityError};

impl Heap {
    /// Run a minor (young generation) collection
    ///
    /// On error nothing has been changed.
    pub fn minor_collection(&mut self) -> Result<GcStats, HeapError> {
        let stats = minor::collect(self)?;
        #[cfg(feature = "dump")]
        log::debug!("{}", self.dump());
        Ok(stats)
    }

    /// Run a major (old generation) collection
    pub fn major_collection(&mut self) -> GcStats {
        let stats = major::collect(self);
        #[cfg(feature = "dump")]
        log::debug!("{}", self.dump());
        stats
    }

    /// Check every heap invariant
    pub fn verify(&self) -> Result<(), IntegrityError> {
        verify::verify(self)
    }
}
