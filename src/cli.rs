use clap::Parser;

/// Command-line options for the reference simulation driver.
#[derive(Debug, Parser)]
#[clap(version, about)]
pub struct CliOpts {
  #[clap(long, help = "number of validators sampled into each dynasty", default_value = "100")]
  pub num_validators: u64,

  #[clap(long, help = "ticks between a validator's successive block proposals", default_value = "100")]
  pub block_proposal_time: u64,

  #[clap(long, help = "number of blocks per epoch", default_value = "5")]
  pub epoch_size: u64,

  #[clap(long, help = "mean network latency in ticks", default_value = "10")]
  pub avg_latency: u64,

  #[clap(long, help = "number of ticks to run the simulation for", default_value = "50000")]
  pub ticks: u64,

  #[clap(long, help = "seed for every deterministic random stream in the run", default_value = "1")]
  pub seed: u64,

  #[clap(long, help = "fraction of validators to disconnect for the whole run", default_value = "0.0")]
  pub disconnected_fraction: f64,

  #[clap(short, long, parse(from_occurrences), help = "use verbose output (-vv very verbose output)")]
  pub verbose: u64,
}

impl CliOpts {
  pub fn parameters(&self) -> crate::parameters::Parameters {
    crate::parameters::Parameters {
      num_validators: self.num_validators,
      validator_universe: (0..self.num_validators * 2).collect(),
      initial_validators: (0..self.num_validators).collect(),
      block_proposal_time: self.block_proposal_time,
      epoch_size: self.epoch_size,
      avg_latency: self.avg_latency,
    }
  }
}
