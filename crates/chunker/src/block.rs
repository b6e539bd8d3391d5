//! A single content-defined block.

use checksums::{StrongSum, WeakSum};

/// One variable-length block cut from an input stream.
///
/// The weak sum is the rolling fingerprint at the block's boundary, the
/// strong sum is the MD5 of the block bytes. `index` is the block's
/// zero-based position within the stream it was cut from; the dedup session
/// echoes it back in verdicts so producers can match answers to blocks.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Block {
    index: u64,
    data: Vec<u8>,
    weak: WeakSum,
    strong: StrongSum,
}

impl Block {
    pub(crate) const fn new(index: u64, data: Vec<u8>, weak: WeakSum, strong: StrongSum) -> Self {
        Self {
            index,
            data,
            weak,
            strong,
        }
    }

    /// Builds a block from parts produced elsewhere (e.g. decoded from the wire).
    #[must_use]
    pub const fn from_parts(index: u64, data: Vec<u8>, weak: WeakSum, strong: StrongSum) -> Self {
        Self::new(index, data, weak, strong)
    }

    /// Zero-based position of the block within its stream.
    #[inline]
    #[must_use]
    pub const fn index(&self) -> u64 {
        self.index
    }

    /// The block's bytes.
    #[inline]
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the block, returning ownership of its bytes.
    #[must_use]
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Weak fingerprint at the block boundary.
    #[inline]
    #[must_use]
    pub const fn weak(&self) -> WeakSum {
        self.weak
    }

    /// Strong fingerprint of the block bytes.
    #[inline]
    #[must_use]
    pub const fn strong(&self) -> &StrongSum {
        &self.strong
    }

    /// Block length in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Reports whether the block is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
