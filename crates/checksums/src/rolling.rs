//! Rabin rolling fingerprint over a fixed-size byte window.
//!
//! The roller maintains `H = c_1 * a^(k-1) + c_2 * a^(k-2) + ... + c_k`
//! modulo 2^64, where `a` is [`RABIN_MULTIPLIER`] and `k` is the window
//! length. Pushing a byte multiplies by `a`, adds the incoming byte and,
//! once the window is full, subtracts the outgoing byte's `a^k` term, so the
//! fingerprint always covers exactly the last `k` bytes seen.

/// Polynomial multiplier for the Rabin fingerprint.
pub const RABIN_MULTIPLIER: u64 = 3;

/// Default window length, in bytes, covered by the fingerprint.
pub const DEFAULT_WINDOW_LEN: usize = 48;

/// Incremental Rabin fingerprint state.
///
/// The fingerprint value at a content-defined block boundary becomes that
/// block's weak sum.
#[derive(Clone, Debug)]
pub struct RabinRoller {
    window: Vec<u8>,
    /// Next slot to overwrite in the circular window buffer.
    pos: usize,
    /// Number of bytes currently in the window (saturates at the window length).
    filled: usize,
    fingerprint: u64,
    /// `RABIN_MULTIPLIER` raised to the window length, for the drop-out term.
    multiplier_pow_window: u64,
}

impl RabinRoller {
    /// Creates a roller with the default window length.
    #[must_use]
    pub fn new() -> Self {
        Self::with_window_len(DEFAULT_WINDOW_LEN)
    }

    /// Creates a roller covering the last `window_len` bytes.
    ///
    /// A window length of zero is nonsensical and clamped to one byte.
    #[must_use]
    pub fn with_window_len(window_len: usize) -> Self {
        let window_len = window_len.max(1);
        let mut pow = 1u64;
        for _ in 0..window_len {
            pow = pow.wrapping_mul(RABIN_MULTIPLIER);
        }
        Self {
            window: vec![0; window_len],
            pos: 0,
            filled: 0,
            fingerprint: 0,
            multiplier_pow_window: pow,
        }
    }

    /// Returns the window length this roller covers.
    #[must_use]
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Returns the current fingerprint value.
    #[must_use]
    pub const fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Clears the state back to an empty window.
    pub fn reset(&mut self) {
        self.window.fill(0);
        self.pos = 0;
        self.filled = 0;
        self.fingerprint = 0;
    }

    /// Rolls one byte into the window and returns the updated fingerprint.
    ///
    /// Until the window has filled once, bytes only accumulate; afterwards
    /// the oldest byte drops out as each new byte enters.
    #[inline]
    pub fn push(&mut self, byte: u8) -> u64 {
        let outgoing = self.window[self.pos];
        self.window[self.pos] = byte;
        self.pos = (self.pos + 1) % self.window.len();

        self.fingerprint = self
            .fingerprint
            .wrapping_mul(RABIN_MULTIPLIER)
            .wrapping_add(u64::from(byte));

        if self.filled == self.window.len() {
            self.fingerprint = self
                .fingerprint
                .wrapping_sub(self.multiplier_pow_window.wrapping_mul(u64::from(outgoing)));
        } else {
            self.filled += 1;
        }

        self.fingerprint
    }

    /// Rolls a whole slice through the window and returns the final
    /// fingerprint, equivalent to pushing every byte in order.
    pub fn push_slice(&mut self, data: &[u8]) -> u64 {
        for &byte in data {
            self.push(byte);
        }
        self.fingerprint
    }
}

impl Default for RabinRoller {
    fn default() -> Self {
        Self::new()
    }
}
