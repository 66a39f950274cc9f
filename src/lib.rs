//! duMalloc - a simulated generational heap
//!
//! A fixed-capacity heap made of three arenas: two young semi-spaces and
//! one old space. Objects are allocated from address-ordered free lists
//! (first-fit or best-fit) and are only reachable through handles, which
//! lets the collectors move them freely.
//!
//! # Features
//! - Header-prefixed blocks tiling each arena without gaps
//! - First-fit and best-fit allocation with block splitting
//! - Minor collection: semi-space copying with promotion after 3 survivals
//! - Major collection: in-place sliding compaction of the old space
//! - Integrity checker and memory dumps
//!
//! # Example
//! ```
//! use dumalloc::{Heap, HeapConfig, SpaceId, Strategy};
//!
//! let mut heap = Heap::new(HeapConfig::new(Strategy::BestFit)).unwrap();
//! let h = heap.allocate(24).unwrap();
//! heap.payload_mut(h).unwrap().fill(7);
//!
//! heap.minor_collection().unwrap();
//! assert_eq!(heap.dereference(h).unwrap().space, SpaceId::Young1);
//! assert!(heap.payload(h).unwrap().iter().all(|&b| b == 7));
//! ```

// Configuration and errors
pub mod config;
pub mod error;

// Heap, allocator and collectors
pub mod gc;

// Diagnostics
pub mod dump;

// Command interpreter used by the binary
pub mod shell;

// Re-export main types
pub use config::{HeapConfig, Strategy};
pub use error::{ConfigError, HeapError, IntegrityError};
pub use gc::{Address, GcStats, Handle, Heap, SpaceId};
