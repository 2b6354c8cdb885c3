//! Runtime configuration for a simulation run.
//!
//! Plain struct fields rather than module-level constants, so a binary
//! (or a test) can vary them without recompiling.

use thiserror::Error;

use crate::primitives::ValidatorId;

/// Tunables for a single simulation run.
#[derive(Debug, Clone)]
pub struct Parameters {
  /// Size of the active validator set sampled into each dynasty.
  pub num_validators: u64,
  /// Pool of validator ids a dynasty may sample from. Must contain at
  /// least `num_validators` entries.
  pub validator_universe: Vec<ValidatorId>,
  /// Validators active in the genesis dynasty.
  pub initial_validators: Vec<ValidatorId>,
  /// Ticks between a validator's successive block proposals.
  pub block_proposal_time: u64,
  /// Number of blocks per epoch; heights divisible by this are checkpoints.
  pub epoch_size: u64,
  /// Mean of the exponential latency distribution, in ticks.
  pub avg_latency: u64,
}

/// Errors raised while validating or running a configuration.
#[derive(Debug, Error)]
pub enum SimulationError {
  #[error("num_validators must be greater than zero")]
  ZeroValidators,
  #[error("validator universe has {found} members, need at least {needed}")]
  UniverseTooSmall { found: usize, needed: u64 },
  #[error("epoch_size must be greater than zero")]
  ZeroEpochSize,
  #[error("block_proposal_time must be greater than zero")]
  ZeroProposalTime,
}

impl Default for Parameters {
  fn default() -> Self {
    let num_validators = 100;
    Parameters {
      num_validators,
      validator_universe: (0..num_validators * 2).collect(),
      initial_validators: (0..num_validators).collect(),
      block_proposal_time: 100,
      epoch_size: 5,
      avg_latency: 10,
    }
  }
}

impl Parameters {
  pub fn validate(&self) -> Result<(), SimulationError> {
    if self.num_validators == 0 {
      return Err(SimulationError::ZeroValidators);
    }
    if (self.validator_universe.len() as u64) < self.num_validators {
      return Err(SimulationError::UniverseTooSmall {
        found: self.validator_universe.len(),
        needed: self.num_validators,
      });
    }
    if self.epoch_size == 0 {
      return Err(SimulationError::ZeroEpochSize);
    }
    if self.block_proposal_time == 0 {
      return Err(SimulationError::ZeroProposalTime);
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_parameters_validate() {
    assert!(Parameters::default().validate().is_ok());
  }

  #[test]
  fn rejects_undersized_universe() {
    let mut params = Parameters::default();
    params.validator_universe.truncate(10);
    assert!(matches!(
      params.validate(),
      Err(SimulationError::UniverseTooSmall { .. })
    ));
  }

  #[test]
  fn rejects_zero_epoch_size() {
    let mut params = Parameters::default();
    params.epoch_size = 0;
    assert!(matches!(params.validate(), Err(SimulationError::ZeroEpochSize)));
  }
}
