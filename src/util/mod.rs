//! Internal utilities.
//!
//! Kept dependency-free so that exploration stays deterministic.

pub mod det_hash;
pub mod det_rng;

pub use det_hash::{DetBuildHasher, DetHashMap, DetHashSet, DetHasher};
pub use det_rng::DetRng;
