//! Linear allocator configuration parameters.

use strata_core::is_power_of_two;

use crate::error::ArenaError;

/// Configuration for the linear allocator.
///
/// Controls the size of the first owned block and the alignment every
/// owned block is requested with. Validated by
/// [`LinearAllocator::with_config`](crate::LinearAllocator::with_config).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Minimum size in bytes of the first owned block.
    ///
    /// Each subsequent owned block is at least twice the previous one.
    /// Default: 64. Must be non-zero.
    pub initial_block_size: usize,

    /// Alignment in bytes requested for every owned block.
    ///
    /// Default: 8. Must be a power of two.
    pub block_alignment: usize,
}

impl ArenaConfig {
    /// Default size of the first owned block.
    pub const DEFAULT_INITIAL_BLOCK_SIZE: usize = 64;

    /// Default alignment of owned blocks.
    pub const DEFAULT_BLOCK_ALIGNMENT: usize = 8;

    /// Create a config whose first owned block holds at least
    /// `initial_block_size` bytes.
    pub fn new(initial_block_size: usize) -> Self {
        Self {
            initial_block_size,
            block_alignment: Self::DEFAULT_BLOCK_ALIGNMENT,
        }
    }

    /// Check every parameter, reporting the first invalid one.
    pub fn validate(&self) -> Result<(), ArenaError> {
        if self.initial_block_size == 0 {
            return Err(ArenaError::InvalidConfig {
                reason: "initial_block_size must be non-zero".into(),
            });
        }
        if !is_power_of_two(self.block_alignment) {
            return Err(ArenaError::InvalidConfig {
                reason: format!(
                    "block_alignment must be a power of two (got {})",
                    self.block_alignment
                ),
            });
        }
        Ok(())
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INITIAL_BLOCK_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ArenaConfig::default();
        assert_eq!(config.initial_block_size, 64);
        assert_eq!(config.block_alignment, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_block_size_rejected() {
        let config = ArenaConfig::new(0);
        assert!(matches!(
            config.validate(),
            Err(ArenaError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn non_power_of_two_alignment_rejected() {
        let config = ArenaConfig {
            block_alignment: 12,
            ..ArenaConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("got 12"));
    }
}
