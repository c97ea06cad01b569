//! Deterministic hashing for state fingerprints and step signatures.
//!
//! `std`'s `RandomState` is seeded per process, which would make two runs of
//! the same program disagree on every fingerprint. [`DetHasher`] has a fixed
//! seed, so hashing the same logical value always yields the same `u64`.

use std::hash::{BuildHasher, Hasher};

/// Deterministic, non-cryptographic hasher.
#[derive(Debug, Clone)]
pub struct DetHasher {
    state: u64,
}

impl DetHasher {
    const SEED: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    /// Creates a hasher whose state is perturbed by `salt`.
    ///
    /// Used to keep hashes of different domains (actors vs. monitors)
    /// apart even when their fields coincide.
    #[must_use]
    pub fn with_salt(salt: u64) -> Self {
        let mut hasher = Self::default();
        hasher.write_u64(salt);
        hasher
    }
}

impl Default for DetHasher {
    fn default() -> Self {
        Self { state: Self::SEED }
    }
}

impl Hasher for DetHasher {
    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state ^= u64::from(byte);
            self.state = self.state.wrapping_mul(Self::PRIME);
        }
    }

    fn write_u64(&mut self, i: u64) {
        self.write(&i.to_le_bytes());
    }

    fn finish(&self) -> u64 {
        // splitmix finalizer
        let mut h = self.state;
        h ^= h >> 30;
        h = h.wrapping_mul(0xbf58_476d_1ce4_e5b9);
        h ^= h >> 27;
        h = h.wrapping_mul(0x94d0_49bb_1331_11eb);
        h ^= h >> 31;
        h
    }
}

/// Builder for deterministic hashers.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetBuildHasher;

impl BuildHasher for DetBuildHasher {
    type Hasher = DetHasher;

    fn build_hasher(&self) -> Self::Hasher {
        DetHasher::default()
    }
}

/// `HashMap` with reproducible hashing across runs.
pub type DetHashMap<K, V> = std::collections::HashMap<K, V, DetBuildHasher>;

/// `HashSet` with reproducible hashing across runs.
pub type DetHashSet<K> = std::collections::HashSet<K, DetBuildHasher>;
