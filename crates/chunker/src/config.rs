//! Chunker tuning parameters.

use checksums::DEFAULT_WINDOW_LEN;

use crate::error::ChunkerError;

/// Parameters controlling where block boundaries fall.
///
/// `min`, `avg` and `max` are block-size bounds in bytes; `avg` must be a
/// power of two because the boundary test masks the fingerprint with
/// `avg - 1`. These values shape the block-size distribution only, they are
/// not part of the on-disk format, so stores written with different
/// parameters remain readable (dedup ratio across them just degrades).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ChunkerConfig {
    /// Rolling-fingerprint window length in bytes.
    pub window_len: usize,
    /// Minimum block size; no boundary is accepted before this many bytes.
    pub min_block: usize,
    /// Target average block size; must be a power of two.
    pub avg_block: usize,
    /// Maximum block size; a boundary is forced at this many bytes.
    pub max_block: usize,
}

impl ChunkerConfig {
    /// Default minimum block size: 4 KiB.
    pub const DEFAULT_MIN: usize = 4 * 1024;
    /// Default average block size: 16 KiB.
    pub const DEFAULT_AVG: usize = 16 * 1024;
    /// Default maximum block size: 48 KiB.
    pub const DEFAULT_MAX: usize = 48 * 1024;

    /// Hard ceiling on `max_block`.
    ///
    /// A block payload travels and is stored as a single record, whose
    /// 4-hex-digit length field caps it at 65535 bytes.
    pub const MAX_BLOCK_LEN: usize = 0xFFFF;

    /// Validates the configuration, returning it unchanged on success.
    pub fn validated(self) -> Result<Self, ChunkerError> {
        if self.window_len == 0 {
            return Err(ChunkerError::InvalidConfig(
                "window length must be non-zero".to_owned(),
            ));
        }
        if !self.avg_block.is_power_of_two() {
            return Err(ChunkerError::InvalidConfig(format!(
                "average block size {} is not a power of two",
                self.avg_block
            )));
        }
        if self.min_block == 0 || self.min_block > self.avg_block || self.avg_block > self.max_block
        {
            return Err(ChunkerError::InvalidConfig(format!(
                "block size bounds must satisfy 0 < min ({}) <= avg ({}) <= max ({})",
                self.min_block, self.avg_block, self.max_block
            )));
        }
        if self.max_block > Self::MAX_BLOCK_LEN {
            return Err(ChunkerError::InvalidConfig(format!(
                "maximum block size {} exceeds the {}-byte record payload limit",
                self.max_block,
                Self::MAX_BLOCK_LEN
            )));
        }
        Ok(self)
    }

    /// Mask applied to the fingerprint for the boundary test.
    #[must_use]
    pub const fn boundary_mask(&self) -> u64 {
        (self.avg_block - 1) as u64
    }
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            window_len: DEFAULT_WINDOW_LEN,
            min_block: Self::DEFAULT_MIN,
            avg_block: Self::DEFAULT_AVG,
            max_block: Self::DEFAULT_MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(ChunkerConfig::default().validated().is_ok());
    }

    #[test]
    fn rejects_non_power_of_two_average() {
        let config = ChunkerConfig {
            avg_block: 100_000,
            ..ChunkerConfig::default()
        };
        assert!(matches!(
            config.validated(),
            Err(ChunkerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_inverted_bounds() {
        let config = ChunkerConfig {
            min_block: 1024 * 1024,
            avg_block: 65536,
            max_block: 65536,
            ..ChunkerConfig::default()
        };
        assert!(matches!(
            config.validated(),
            Err(ChunkerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn boundary_mask_covers_average_minus_one() {
        let config = ChunkerConfig::default();
        assert_eq!(config.boundary_mask(), (16 * 1024 - 1) as u64);
    }

    #[test]
    fn rejects_blocks_too_large_for_one_record() {
        let config = ChunkerConfig {
            min_block: 64 * 1024,
            avg_block: 256 * 1024,
            max_block: 1024 * 1024,
            ..ChunkerConfig::default()
        };
        assert!(matches!(
            config.validated(),
            Err(ChunkerError::InvalidConfig(_))
        ));
        // The default maximum sits under the limit.
        assert!(ChunkerConfig::default().max_block <= ChunkerConfig::MAX_BLOCK_LEN);
    }
}
