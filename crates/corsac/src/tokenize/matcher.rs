//! Constant-time membership test over the full byte range.

use bitvec::prelude::*;

/// A 256-entry lookup table answering "is this byte one of the configured
/// set" in O(1).
///
/// Built once from a small set of bytes (separators, line terminators) and
/// immutable afterwards. Bytes index the table directly; `u8` is already
/// unsigned, so every possible input maps to a valid slot.
#[derive(Debug, Clone)]
pub struct ByteMatcher {
    table: BitArr!(for 256, in u64, Lsb0),
}

impl ByteMatcher {
    /// Builds a matcher for the given set of bytes.
    pub fn new(bytes: &[u8]) -> Self {
        let mut table = bitarr![u64, Lsb0; 0; 256];
        for &b in bytes {
            table.set(b as usize, true);
        }
        Self { table }
    }

    /// Returns `true` when `byte` is in the configured set.
    #[inline]
    pub fn check(&self, byte: u8) -> bool {
        self.table[byte as usize]
    }
}
