//! Collection statistics

use std::fmt;

/// Summary of one collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcStats {
    /// Live objects examined
    pub objects_visited: usize,
    /// Objects relocated within their generation
    pub objects_moved: usize,
    /// Objects moved from the young to the old generation
    pub objects_promoted: usize,
    /// Bytes copied, headers included
    pub bytes_moved: usize,
    /// Free payload bytes in the collected space afterwards
    pub free_bytes: usize,
}

impl fmt::Display for GcStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "visited {}, moved {}, promoted {}, {} bytes copied, {} bytes free",
            self.objects_visited,
            self.objects_moved,
            self.objects_promoted,
            self.bytes_moved,
            self.free_bytes
        )
    }
}
