//! Votes cast by validators between a source and a target checkpoint.

use rand::RngCore;
use rand_chacha::ChaCha8Rng;

use crate::primitives::{Hash, ValidatorId};

/// A single validator's vote linking a justified source checkpoint to a
/// candidate target checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vote {
  pub hash: Hash,
  pub source: Hash,
  pub target: Hash,
  pub epoch_source: u64,
  pub epoch_target: u64,
  pub sender: ValidatorId,
}

impl Vote {
  pub fn new(
    rng: &mut ChaCha8Rng,
    source: Hash,
    target: Hash,
    epoch_source: u64,
    epoch_target: u64,
    sender: ValidatorId,
  ) -> Vote {
    Vote {
      hash: Hash(rng.next_u64()),
      source,
      target,
      epoch_source,
      epoch_target,
      sender,
    }
  }
}
