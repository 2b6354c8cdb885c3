//! Small value types shared across the consensus engine.
//!
//! Block and vote identifiers are not cryptographic hashes in this
//! simulator — they are sampled nonces used only to tell objects apart.
//! [`Hash`] exists as a newtype anyway so the rest of the crate never
//! confuses a block/vote identifier with a validator id or a height.

use std::fmt;

/// Identifier of a validator. Stable for the lifetime of a simulation run.
pub type ValidatorId = u64;

/// Identifier of a [`crate::consensus::block::Dynasty`]. Monotonically
/// increasing, starting at 0 for the genesis dynasty.
pub type DynastyId = u64;

/// Opaque identifier of a block or a vote.
///
/// Sampled uniformly at random when the object is created; collisions are
/// not handled because with a 64-bit space and the validator counts this
/// simulator runs at, they do not happen in practice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash(pub u64);

impl fmt::Display for Hash {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:016x}", self.0)
  }
}

impl From<u64> for Hash {
  fn from(value: u64) -> Self {
    Hash(value)
  }
}
