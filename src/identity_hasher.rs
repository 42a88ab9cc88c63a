//! Deterministic identity hashing for integer keys.
//!
//! With [`BuildIdentityHasher`], a `u64` key hashes to itself, so a store with
//! `m` slots places key `k` at home slot `k mod m`. That makes collisions easy
//! to arrange on purpose, which is what demos and tests want. It offers no
//! protection against adversarial keys.

use core::hash::{BuildHasher, Hasher};

/// `BuildHasher` producing [`IdentityHasher`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildIdentityHasher;

impl BuildHasher for BuildIdentityHasher {
    type Hasher = IdentityHasher;

    fn build_hasher(&self) -> Self::Hasher {
        IdentityHasher::default()
    }
}

/// Hasher whose output for a single integer write is that integer.
///
/// Unsigned integers come out unchanged; signed integers come out as their
/// two's-complement bit pattern. Multiple writes (tuples, strings) are folded
/// with a `31 * h + x` polynomial.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityHasher(u64);

impl IdentityHasher {
    #[inline]
    fn mix(&mut self, x: u64) {
        self.0 = self.0.wrapping_mul(31).wrapping_add(x);
    }
}

impl Hasher for IdentityHasher {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.mix(u64::from(b));
        }
    }

    fn write_u8(&mut self, i: u8) {
        self.mix(u64::from(i));
    }

    fn write_u16(&mut self, i: u16) {
        self.mix(u64::from(i));
    }

    fn write_u32(&mut self, i: u32) {
        self.mix(u64::from(i));
    }

    fn write_u64(&mut self, i: u64) {
        self.mix(i);
    }

    fn write_usize(&mut self, i: usize) {
        self.mix(i as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_hash_to_themselves() {
        let s = BuildIdentityHasher;
        assert_eq!(s.hash_one(17u64), 17);
        assert_eq!(s.hash_one(402u32), 402);
        assert_eq!(s.hash_one(9usize), 9);
        assert_eq!(s.hash_one(-1i32), u64::from(u32::MAX));
    }

    #[test]
    fn strings_are_folded_deterministically() {
        let s = BuildIdentityHasher;
        assert_eq!(s.hash_one("ab"), s.hash_one("ab"));
        assert_ne!(s.hash_one("ab"), s.hash_one("ba"));
    }
}
