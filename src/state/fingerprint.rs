//! Signatures and state fingerprints.
//!
//! A [`Signature`] is a stable hash of one logical thing: an actor's fields,
//! a message payload, a pending operation. A [`Fingerprint`] combines the
//! signatures of every actor and monitor into the identity of a whole
//! program state, which is what cycle detection compares.
//!
//! Both are computed with [`DetHasher`], so two runs that reach the same
//! logical state produce the same fingerprint regardless of allocation
//! addresses or process-level hash seeds.

use crate::util::DetHasher;
use core::fmt;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// A deterministic hash of a logical value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(u64);

impl Signature {
    /// Wraps a raw signature value.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Computes the signature of any hashable value.
    #[must_use]
    pub fn of<T: Hash + ?Sized>(value: &T) -> Self {
        let mut hasher = DetHasher::default();
        value.hash(&mut hasher);
        Self(hasher.finish())
    }

    /// Starts building a signature from several parts.
    #[must_use]
    pub fn builder() -> SignatureBuilder {
        SignatureBuilder {
            hasher: DetHasher::default(),
        }
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({:016x})", self.0)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Incrementally combines parts into a [`Signature`].
///
/// Order matters: `a` then `b` differs from `b` then `a`.
#[derive(Debug, Clone)]
pub struct SignatureBuilder {
    hasher: DetHasher,
}

impl SignatureBuilder {
    /// Mixes in a hashable value.
    #[must_use]
    pub fn with<T: Hash + ?Sized>(mut self, value: &T) -> Self {
        value.hash(&mut self.hasher);
        self
    }

    /// Mixes in a previously computed signature.
    #[must_use]
    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.hasher.write_u64(signature.0);
        self
    }

    /// Finishes the signature.
    #[must_use]
    pub fn finish(self) -> Signature {
        Signature(self.hasher.finish())
    }
}

/// Identity of a whole program state.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// Wraps a raw fingerprint value.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({:016x})", self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Accumulates actor and monitor contributions into a [`Fingerprint`].
///
/// Callers must feed parts in a canonical order (ascending id), which
/// [`crate::schedule::ProgramState::fingerprint`] guarantees by iterating
/// ordered maps.
#[derive(Debug, Clone)]
pub struct FingerprintBuilder {
    hasher: DetHasher,
}

impl FingerprintBuilder {
    const ACTOR_SALT: u64 = 0xa5a5_0001;
    const MONITOR_SALT: u64 = 0xa5a5_0002;

    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            hasher: DetHasher::default(),
        }
    }

    /// Adds one actor's identity and signature.
    pub fn actor(&mut self, id: u64, signature: Signature) {
        self.hasher.write_u64(Self::ACTOR_SALT);
        self.hasher.write_u64(id);
        self.hasher.write_u64(signature.0);
    }

    /// Adds one monitor's identity and signature.
    pub fn monitor(&mut self, id: u64, signature: Signature) {
        self.hasher.write_u64(Self::MONITOR_SALT);
        self.hasher.write_u64(id);
        self.hasher.write_u64(signature.0);
    }

    /// Finishes the fingerprint.
    #[must_use]
    pub fn finish(&self) -> Fingerprint {
        Fingerprint(self.hasher.finish())
    }
}

impl Default for FingerprintBuilder {
    fn default() -> Self {
        Self::new()
    }
}
