//! Blocks and validator-set rotation.
//!
//! A dynasty is the validator set active over a span of epochs. Each
//! block carries the three dynasties relevant to casting and counting
//! votes against it: the one before its parent's, its parent's, and the
//! one it samples for its own children.

use rand::seq::index::sample;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;

use crate::parameters::Parameters;
use crate::primitives::{DynastyId, Hash, ValidatorId};

/// A validator set sampled for a span of the chain.
///
/// Equality and hashing are structural over `(id, members)`: two
/// dynasties sampled independently with the same id and membership are
/// the same dynasty as far as the finality rules care.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dynasty {
  pub id: DynastyId,
  pub members: Vec<ValidatorId>,
}

impl Dynasty {
  pub fn contains(&self, validator: ValidatorId) -> bool {
    self.members.contains(&validator)
  }
}

/// A block in the simulated chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
  pub hash: Hash,
  pub height: u64,
  pub prev_hash: Hash,
  pub prev_dynasty: Dynasty,
  pub current_dynasty: Dynasty,
  pub next_dynasty: Dynasty,
}

impl Block {
  /// Builds the genesis block. Its dynasty triple all point at the
  /// initial validator set except `next_dynasty`, which is already
  /// sampled for whoever follows it.
  pub fn genesis(params: &Parameters, rng: &mut ChaCha8Rng) -> Block {
    let hash = Hash(rng.next_u64());
    let initial = Dynasty {
      id: 0,
      members: params.initial_validators.clone(),
    };
    let next_dynasty = Self::sample_next_dynasty(hash, initial.id, params);
    Block {
      hash,
      height: 0,
      prev_hash: Hash(0),
      prev_dynasty: initial.clone(),
      current_dynasty: initial,
      next_dynasty,
    }
  }

  /// Mints a child of `parent`. `finalized_dynasties` decides whether
  /// the proposer has observed `parent.current_dynasty` becoming final:
  /// if so, the dynasty window slides forward one slot.
  pub fn propose(
    parent: &Block,
    finalized_dynasties: &HashSet<Dynasty>,
    params: &Parameters,
    rng: &mut ChaCha8Rng,
  ) -> Block {
    let hash = Hash(rng.next_u64());
    let next_dynasty = Self::sample_next_dynasty(hash, parent.current_dynasty.id, params);
    let (prev_dynasty, current_dynasty) = if finalized_dynasties.contains(&parent.current_dynasty) {
      (parent.current_dynasty.clone(), parent.next_dynasty.clone())
    } else {
      (parent.prev_dynasty.clone(), parent.current_dynasty.clone())
    };
    Block {
      hash,
      height: parent.height + 1,
      prev_hash: parent.hash,
      prev_dynasty,
      current_dynasty,
      next_dynasty,
    }
  }

  pub fn is_checkpoint(&self, params: &Parameters) -> bool {
    self.height % params.epoch_size == 0
  }

  pub fn epoch(&self, params: &Parameters) -> u64 {
    self.height / params.epoch_size
  }

  /// Samples the dynasty a block's children will use as their
  /// `next_dynasty`, deterministically from the block's own hash.
  ///
  /// Uses an independent `ChaCha8Rng` stream seeded from the hash rather
  /// than reseeding a shared generator, so sampling one block's dynasty
  /// never perturbs any other validator's RNG sequence.
  fn sample_next_dynasty(block_hash: Hash, prev_id: DynastyId, params: &Parameters) -> Dynasty {
    let mut rng = ChaCha8Rng::seed_from_u64(block_hash.0);
    let indices = sample(
      &mut rng,
      params.validator_universe.len(),
      params.num_validators as usize,
    );
    let members = indices
      .iter()
      .map(|i| params.validator_universe[i])
      .collect();
    Dynasty {
      id: prev_id + 1,
      members,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::SeedableRng;

  fn params() -> Parameters {
    Parameters {
      num_validators: 4,
      validator_universe: (0..8).collect(),
      initial_validators: (0..4).collect(),
      block_proposal_time: 10,
      epoch_size: 5,
      avg_latency: 2,
    }
  }

  #[test]
  fn genesis_is_height_zero_checkpoint() {
    let params = params();
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let genesis = Block::genesis(&params, &mut rng);
    assert_eq!(genesis.height, 0);
    assert!(genesis.is_checkpoint(&params));
    assert_eq!(genesis.current_dynasty.id, 0);
    assert_eq!(genesis.next_dynasty.id, 1);
  }

  #[test]
  fn propose_slides_window_only_after_finalization() {
    let params = params();
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let genesis = Block::genesis(&params, &mut rng);

    let not_finalized = HashSet::new();
    let child = Block::propose(&genesis, &not_finalized, &params, &mut rng);
    assert_eq!(child.current_dynasty, genesis.current_dynasty);
    assert_eq!(child.prev_dynasty, genesis.prev_dynasty);

    let mut finalized = HashSet::new();
    finalized.insert(genesis.current_dynasty.clone());
    let child2 = Block::propose(&genesis, &finalized, &params, &mut rng);
    assert_eq!(child2.current_dynasty, genesis.next_dynasty);
    assert_eq!(child2.prev_dynasty, genesis.current_dynasty);
  }

  #[test]
  fn dynasty_sampling_is_deterministic_in_hash() {
    let params = params();
    let a = Block::sample_next_dynasty(Hash(42), 0, &params);
    let b = Block::sample_next_dynasty(Hash(42), 0, &params);
    assert_eq!(a, b);
  }
}
