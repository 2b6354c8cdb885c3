use casper_sim::cli::CliOpts;
use casper_sim::metrics;
use casper_sim::{ExponentialLatency, Network};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{prelude::*, util::SubscriberInitExt, Layer};

fn main() -> anyhow::Result<()> {
  let opts = CliOpts::parse();

  let loglevel = match opts.verbose {
    0 => Level::INFO,
    1 => Level::DEBUG,
    _ => Level::TRACE,
  };
  tracing_subscriber::registry()
    .with(tracing_subscriber::fmt::layer().with_filter(
      tracing_subscriber::filter::LevelFilter::from_level(loglevel),
    ))
    .init();

  info!("starting casper-sim");
  info!(seed = opts.seed, ticks = opts.ticks, "run parameters");

  let params = opts.parameters();
  let latency = Box::new(ExponentialLatency::new(params.avg_latency));
  let mut network = Network::new(params.clone(), latency, opts.seed)?;

  let disconnected = (opts.disconnected_fraction * params.num_validators as f64) as usize;
  for id in 0..disconnected {
    network.partition(id);
  }
  if disconnected > 0 {
    info!(disconnected, "partitioned validators for the whole run");
  }

  network.run(opts.ticks);

  for validator in network.validators() {
    let fractions = metrics::justification_fractions(validator);
    info!(
      validator = validator.id(),
      head_height = validator.head().height,
      main_chain_size = metrics::main_chain_size(validator),
      justified_fraction = fractions.justified,
      finalized_fraction = fractions.finalized,
      forked_justified_fraction = fractions.forked_justified,
      "validator summary"
    );
  }

  Ok(())
}
