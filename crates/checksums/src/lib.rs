#![deny(unsafe_code)]
//! Block fingerprints for the deduplicating store.
//!
//! Every stored block carries a two-level fingerprint:
//!
//! - a **weak sum**: the 64-bit Rabin rolling fingerprint at the block's
//!   content-defined boundary, cheap to compute and to roll, printed as
//!   16 uppercase hex characters. Collisions between distinct blocks are
//!   expected and tolerated.
//! - a **strong sum**: the MD5 digest of the block's bytes, printed as
//!   32 lowercase hex characters, used to disambiguate weak collisions and
//!   as the final proof of content equality.
//!
//! Both sums are deterministic functions of the block bytes, so any index
//! lookup keyed on them is reproducible.

mod error;
mod rolling;
mod strong;
mod weak;

pub use error::ChecksumError;
pub use rolling::{RabinRoller, DEFAULT_WINDOW_LEN, RABIN_MULTIPLIER};
pub use strong::{strong_sum, StrongSum};
pub use weak::WeakSum;

/// Returns `true` for the reserved empty-block fingerprint pair.
///
/// The all-zero weak sum paired with the MD5 of the empty input stands for a
/// zero-length block and is always treated as already stored, without any
/// index lookup and without consuming a storage address.
#[must_use]
pub fn is_reserved_pair(weak: WeakSum, strong: &StrongSum) -> bool {
    weak == WeakSum::ZERO && *strong == StrongSum::EMPTY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_pair_matches_zero_weak_and_empty_strong() {
        assert!(is_reserved_pair(WeakSum::ZERO, &StrongSum::EMPTY));
        assert!(!is_reserved_pair(WeakSum::new(1), &StrongSum::EMPTY));
        assert!(!is_reserved_pair(WeakSum::ZERO, &strong_sum(b"x")));
    }

    #[test]
    fn empty_strong_is_md5_of_empty_input() {
        assert_eq!(strong_sum(b""), StrongSum::EMPTY);
    }
}
