//! Observability over a validator's local view, independent of the
//! finality gadget itself. Used by the reference driver to summarize a
//! run and by tests to assert on simulation-wide properties.

use std::collections::HashMap;

use crate::consensus::Validator;
use crate::primitives::Hash;

/// Fraction of checkpoints from genesis to the highest justified
/// checkpoint that are justified, finalized, and justified-but-forked
/// (justified checkpoints this validator knows about that never made it
/// onto its own main chain).
pub struct JustificationFractions {
  pub justified: f64,
  pub finalized: f64,
  pub forked_justified: f64,
}

pub fn justification_fractions(validator: &Validator) -> JustificationFractions {
  let mut checkpoint = Some(validator.highest_justified_checkpoint().hash);
  let mut total = 0u64;
  let mut justified = 0u64;
  let mut finalized = 0u64;

  while let Some(hash) = checkpoint {
    total += 1;
    if validator.is_justified(hash) {
      justified += 1;
    }
    if validator.is_finalized(hash) {
      finalized += 1;
    }
    checkpoint = validator.get_checkpoint_parent(hash);
  }

  let forked_justified = validator.justified_count() as u64 - justified;
  JustificationFractions {
    justified: justified as f64 / total as f64,
    finalized: finalized as f64 / total as f64,
    forked_justified: forked_justified as f64 / total as f64,
  }
}

/// Number of blocks from genesis to the highest justified checkpoint,
/// inclusive.
pub fn main_chain_size(validator: &Validator) -> u64 {
  validator.highest_justified_checkpoint().height + 1
}

/// Count of processed blocks at or below the highest justified
/// checkpoint's height, main chain or not.
pub fn blocks_under_highest_justified(validator: &Validator) -> usize {
  let ceiling = validator.highest_justified_checkpoint().height;
  validator.processed_blocks().filter(|b| b.height <= ceiling).count()
}

/// Total number of blocks this validator has processed.
pub fn total_height_blocks(validator: &Validator) -> usize {
  validator.processed_blocks().count()
}

/// For every block at or below the highest justified checkpoint, the
/// number of blocks by which it forks off the main chain. Returns a
/// histogram: fork length -> number of main-chain blocks with a
/// longest-known fork of that length (0 means no fork off that block).
pub fn fork_length_histogram(validator: &Validator) -> HashMap<u64, u64> {
  let justified_height = validator.highest_justified_checkpoint().height;

  let mut main_chain = vec![validator.highest_justified_checkpoint().hash];
  let mut cursor = validator.highest_justified_checkpoint().clone();
  while cursor.height > 0 {
    cursor = validator
      .get_block(cursor.prev_hash)
      .expect("ancestors of a processed block are always processed")
      .clone();
    main_chain.push(cursor.hash);
  }
  let main_chain: std::collections::HashSet<Hash> = main_chain.into_iter().collect();

  let mut longest_fork: HashMap<Hash, u64> = HashMap::new();
  for block in validator.processed_blocks() {
    if block.height > justified_height {
      continue;
    }
    let mut hash = block.hash;
    let mut length = 0u64;
    while !main_chain.contains(&hash) {
      length += 1;
      hash = validator
        .get_block(hash)
        .expect("ancestors of a processed block are always processed")
        .prev_hash;
    }
    let entry = longest_fork.entry(hash).or_insert(0);
    *entry = (*entry).max(length);
  }

  let mut histogram = HashMap::new();
  for length in longest_fork.values() {
    *histogram.entry(*length).or_insert(0) += 1;
  }
  histogram
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::network::{ExponentialLatency, Network};
  use crate::parameters::Parameters;

  fn params() -> Parameters {
    Parameters {
      num_validators: 4,
      validator_universe: (0..8).collect(),
      initial_validators: (0..4).collect(),
      block_proposal_time: 3,
      epoch_size: 2,
      avg_latency: 1,
    }
  }

  #[test]
  fn main_chain_size_tracks_justified_height() {
    let latency = Box::new(ExponentialLatency::new(1));
    let mut network = Network::new(params(), latency, 9).unwrap();
    network.run(300);
    for validator in network.validators() {
      assert_eq!(
        main_chain_size(validator),
        validator.highest_justified_checkpoint().height + 1
      );
    }
  }

  #[test]
  fn fork_histogram_accounts_for_every_main_chain_block() {
    let latency = Box::new(ExponentialLatency::new(1));
    let mut network = Network::new(params(), latency, 11).unwrap();
    network.run(300);
    for validator in network.validators() {
      let histogram = fork_length_histogram(validator);
      let total: u64 = histogram.values().sum();
      assert_eq!(total, validator.highest_justified_checkpoint().height + 1);
    }
  }
}
