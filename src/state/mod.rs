//! Abstract program state: signatures, fingerprints, and the fingerprint
//! cache used by cycle detection.

pub mod cache;
pub mod fingerprint;

pub use cache::{CapturedState, StateCache};
pub use fingerprint::{Fingerprint, Signature};
