//! Discrete-event simulation of a Casper-style finality gadget.
//!
//! A [`network::Network`] owns a set of [`consensus::Validator`]s and
//! advances them tick by tick, delivering blocks and votes after an
//! independently sampled latency per recipient. Each validator
//! independently runs the checkpoint-tree fork choice and the
//! justification/finalization voting rule over whatever it has
//! received so far.

pub mod cli;
pub mod consensus;
pub mod metrics;
pub mod network;
pub mod parameters;
pub mod primitives;

pub use consensus::{Accept, Block, Dynasty, Message, SlashEvent, SlashObserver, SlashReason, Validator, Vote};
pub use network::{ConstantLatency, ExponentialLatency, LatencySampler, Network};
pub use parameters::{Parameters, SimulationError};
