//! Heap configuration
//!
//! A heap is sized once, up front. The defaults reproduce the classic
//! duMalloc layout: three 1 KiB arenas, one handle slot per 8 bytes of
//! arena and promotion after three minor collections.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::gc::HEADER_SIZE;

/// Allocation granularity in bytes. Every payload size is a multiple of this.
pub const ALIGNMENT: usize = 8;

/// Default size of each arena in bytes
pub const DEFAULT_ARENA_SIZE: usize = 128 * ALIGNMENT;

/// Default number of minor collections an object survives before promotion
pub const DEFAULT_PROMOTION_THRESHOLD: u32 = 3;

/// Free-block selection strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Take the lowest-addressed free block that is large enough
    #[default]
    FirstFit,
    /// Take the smallest free block that is large enough
    BestFit,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::FirstFit => write!(f, "first-fit"),
            Strategy::BestFit => write!(f, "best-fit"),
        }
    }
}

impl FromStr for Strategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first" | "first-fit" | "firstfit" | "0" => Ok(Strategy::FirstFit),
            "best" | "best-fit" | "bestfit" | "1" => Ok(Strategy::BestFit),
            _ => Err(ConfigError::UnknownStrategy(s.to_string())),
        }
    }
}

/// Sizes and policies fixed at configuration time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapConfig {
    /// Free-block selection strategy used by every arena
    pub strategy: Strategy,
    /// Size of each of the two young arenas in bytes
    pub young_size: usize,
    /// Size of the old arena in bytes
    pub old_size: usize,
    /// Number of handle slots
    pub handle_capacity: usize,
    /// Survival count at which a young object moves to the old arena
    pub promotion_threshold: u32,
}

impl Default for HeapConfig {
    fn default() -> Self {
        HeapConfig {
            strategy: Strategy::default(),
            young_size: DEFAULT_ARENA_SIZE,
            old_size: DEFAULT_ARENA_SIZE,
            handle_capacity: DEFAULT_ARENA_SIZE / ALIGNMENT,
            promotion_threshold: DEFAULT_PROMOTION_THRESHOLD,
        }
    }
}

impl HeapConfig {
    /// Default configuration with the given strategy
    pub fn new(strategy: Strategy) -> Self {
        HeapConfig {
            strategy,
            ..Default::default()
        }
    }

    pub fn with_young_size(mut self, size: usize) -> Self {
        self.young_size = size;
        self
    }

    pub fn with_old_size(mut self, size: usize) -> Self {
        self.old_size = size;
        self
    }

    pub fn with_handle_capacity(mut self, capacity: usize) -> Self {
        self.handle_capacity = capacity;
        self
    }

    pub fn with_promotion_threshold(mut self, threshold: u32) -> Self {
        self.promotion_threshold = threshold;
        self
    }

    /// Check that the configuration describes a usable heap
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, size) in [("young", self.young_size), ("old", self.old_size)] {
            if size % ALIGNMENT != 0 {
                return Err(ConfigError::Misaligned { arena: name, size });
            }
            if size < HEADER_SIZE {
                return Err(ConfigError::TooSmall { arena: name, size });
            }
            if size > u32::MAX as usize {
                return Err(ConfigError::TooLarge { arena: name, size });
            }
        }
        if self.handle_capacity == 0 || self.handle_capacity > u32::MAX as usize {
            return Err(ConfigError::HandleCapacity(self.handle_capacity));
        }
        if self.promotion_threshold == 0 {
            return Err(ConfigError::ZeroPromotionThreshold);
        }
        Ok(())
    }
}

/// Round `size` up to the next multiple of [`ALIGNMENT`], or `None` if that
/// does not fit in a `usize`
#[inline]
pub const fn align_up(size: usize) -> Option<usize> {
    match size.checked_add(ALIGNMENT - 1) {
        Some(padded) => Some(padded & !(ALIGNMENT - 1)),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HeapConfig::default();
        assert_eq!(config.strategy, Strategy::FirstFit);
        assert_eq!(config.young_size, 1024);
        assert_eq!(config.old_size, 1024);
        assert_eq!(config.handle_capacity, 128);
        assert_eq!(config.promotion_threshold, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0), Some(0));
        assert_eq!(align_up(1), Some(8));
        assert_eq!(align_up(8), Some(8));
        assert_eq!(align_up(9), Some(16));
        assert_eq!(align_up(24), Some(24));
        assert_eq!(align_up(usize::MAX - 7), Some(usize::MAX - 7));
        assert_eq!(align_up(usize::MAX - 6), None);
        assert_eq!(align_up(usize::MAX), None);
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("first".parse::<Strategy>().unwrap(), Strategy::FirstFit);
        assert_eq!("Best-Fit".parse::<Strategy>().unwrap(), Strategy::BestFit);
        assert_eq!("1".parse::<Strategy>().unwrap(), Strategy::BestFit);
        assert!("worst".parse::<Strategy>().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_sizes() {
        let misaligned = HeapConfig::default().with_young_size(1000 + 4);
        assert_eq!(
            misaligned.validate(),
            Err(ConfigError::Misaligned {
                arena: "young",
                size: 1004
            })
        );

        let tiny = HeapConfig::default().with_old_size(8);
        assert_eq!(
            tiny.validate(),
            Err(ConfigError::TooSmall {
                arena: "old",
                size: 8
            })
        );

        let no_handles = HeapConfig::default().with_handle_capacity(0);
        assert_eq!(no_handles.validate(), Err(ConfigError::HandleCapacity(0)));

        let never_promote = HeapConfig::default().with_promotion_threshold(0);
        assert_eq!(
            never_promote.validate(),
            Err(ConfigError::ZeroPromotionThreshold)
        );
    }
}
