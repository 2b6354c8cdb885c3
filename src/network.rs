//! The discrete-event message bus connecting validators.
//!
//! Time advances in discrete ticks. A broadcast message is delivered to
//! every attached validator after an independently sampled latency, and
//! messages that land on the same tick are delivered in the order they
//! were broadcast.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Exp};
use tracing::trace;

use crate::consensus::fault::LoggingSlashObserver;
use crate::consensus::{Block, Message, Validator};
use crate::parameters::{Parameters, SimulationError};

/// Supplies per-message delivery latency in ticks.
pub trait LatencySampler {
  fn sample(&mut self, rng: &mut ChaCha8Rng) -> u64;
}

/// An exponential distribution with a configurable mean, floored at
/// 1 tick so nothing is ever delivered in the same tick it was sent.
pub struct ExponentialLatency {
  avg_latency: u64,
  dist: Exp<f64>,
}

impl ExponentialLatency {
  pub fn new(avg_latency: u64) -> ExponentialLatency {
    ExponentialLatency {
      avg_latency,
      dist: Exp::new(1.0).expect("rate 1.0 is always a valid Exp parameter"),
    }
  }
}

impl LatencySampler for ExponentialLatency {
  fn sample(&mut self, rng: &mut ChaCha8Rng) -> u64 {
    let scaled = self.dist.sample(rng) * self.avg_latency as f64;
    1 + scaled as u64
  }
}

/// A fixed delivery delay, useful for deterministic tests.
pub struct ConstantLatency(pub u64);

impl LatencySampler for ConstantLatency {
  fn sample(&mut self, _rng: &mut ChaCha8Rng) -> u64 {
    assert!(self.0 >= 1, "delay is 0, which will lose some messages!");
    self.0
  }
}

/// The message bus. Owns every validator in the simulation and drives
/// them forward one tick at a time.
pub struct Network {
  validators: Vec<Validator>,
  time: u64,
  arrivals: HashMap<u64, Vec<(usize, Message)>>,
  latency: Box<dyn LatencySampler>,
  rng: ChaCha8Rng,
  partitioned: HashSet<usize>,
}

impl Network {
  /// An empty bus with no validators attached yet.
  pub fn empty(latency: Box<dyn LatencySampler>, seed: u64) -> Network {
    Network {
      validators: Vec::new(),
      time: 0,
      arrivals: HashMap::new(),
      latency,
      rng: ChaCha8Rng::seed_from_u64(seed),
      partitioned: HashSet::new(),
    }
  }

  /// Appends a validator to the node list. The returned index is also
  /// its routing id: the position arrivals and `Network::partition`
  /// address it by.
  pub fn attach(&mut self, validator: Validator) -> usize {
    let id = self.validators.len();
    self.validators.push(validator);
    id
  }

  /// Builds a network with `params.num_validators` validators attached,
  /// all starting from a freshly sampled genesis block.
  pub fn new(
    params: Parameters,
    latency: Box<dyn LatencySampler>,
    seed: u64,
  ) -> Result<Network, SimulationError> {
    params.validate()?;
    let params = Rc::new(params);

    let mut genesis_rng = ChaCha8Rng::seed_from_u64(seed);
    let genesis = Block::genesis(&params, &mut genesis_rng);

    let mut network = Network::empty(latency, seed.wrapping_add(1));

    let slash_observer = Rc::new(LoggingSlashObserver);
    for id in 0..params.num_validators {
      let validator_rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(2).wrapping_add(id));
      let validator = Validator::new(
        id,
        genesis.clone(),
        Rc::clone(&params),
        validator_rng,
        Rc::clone(&slash_observer) as Rc<dyn crate::consensus::SlashObserver>,
      );
      network.attach(validator);
    }

    Ok(network)
  }

  pub fn time(&self) -> u64 {
    self.time
  }

  pub fn validators(&self) -> &[Validator] {
    &self.validators
  }

  /// Disconnects a validator: it neither proposes nor receives until
  /// [`Network::restore`] is called.
  pub fn partition(&mut self, id: usize) {
    self.partitioned.insert(id);
  }

  pub fn restore(&mut self, id: usize) {
    self.partitioned.remove(&id);
  }

  /// Schedules `msg` for delivery to every attached, non-partitioned
  /// validator, each with its own independently sampled latency.
  fn broadcast(&mut self, msg: Message) {
    for idx in 0..self.validators.len() {
      if self.partitioned.contains(&idx) {
        continue;
      }
      let delay = self.latency.sample(&mut self.rng);
      assert!(delay >= 1, "delay is 0, which will lose some messages!");
      trace!(idx, delay, msg = %msg, "scheduling delivery");
      self.arrivals.entry(self.time + delay).or_default().push((idx, msg.clone()));
    }
  }

  /// Advances the simulation by one tick: delivers everything scheduled
  /// to arrive now, then lets every validator run its periodic handler,
  /// broadcasting anything either step produces.
  pub fn tick(&mut self) {
    if let Some(arrivals) = self.arrivals.remove(&self.time) {
      for (idx, msg) in arrivals {
        if self.partitioned.contains(&idx) {
          continue;
        }
        self.validators[idx].on_receive(msg);
        for outgoing in self.validators[idx].take_outbox() {
          self.broadcast(outgoing);
        }
      }
    }

    for idx in 0..self.validators.len() {
      if self.partitioned.contains(&idx) {
        continue;
      }
      self.validators[idx].tick(self.time);
      for outgoing in self.validators[idx].take_outbox() {
        self.broadcast(outgoing);
      }
    }

    self.time += 1;
  }

  pub fn run(&mut self, ticks: u64) {
    for _ in 0..ticks {
      self.tick();
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn params() -> Parameters {
    Parameters {
      num_validators: 4,
      validator_universe: (0..8).collect(),
      initial_validators: (0..4).collect(),
      block_proposal_time: 5,
      epoch_size: 2,
      avg_latency: 2,
    }
  }

  #[test]
  fn rejects_invalid_parameters() {
    let mut bad = params();
    bad.num_validators = 0;
    let latency = Box::new(ExponentialLatency::new(2));
    assert!(Network::new(bad, latency, 1).is_err());
  }

  #[test]
  fn advances_chain_height_over_time() {
    let latency = Box::new(ExponentialLatency::new(2));
    let mut network = Network::new(params(), latency, 42).unwrap();
    network.run(200);
    let heights: Vec<u64> = network.validators().iter().map(|v| v.head().height).collect();
    assert!(heights.iter().all(|&h| h > 0));
  }

  #[test]
  fn partitioned_validator_does_not_advance() {
    let latency = Box::new(ExponentialLatency::new(2));
    let mut network = Network::new(params(), latency, 7).unwrap();
    network.partition(0);
    network.run(100);
    assert_eq!(network.validators()[0].head().height, 0);
  }
}
