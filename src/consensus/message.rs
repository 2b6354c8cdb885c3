//! The two object kinds that travel over the network.

use std::fmt;

use super::block::Block;
use super::vote::Vote;
use crate::primitives::Hash;

/// A network object, tagged by kind, dispatched on with exhaustiveness
/// checked at compile time rather than a runtime type check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
  Block(Block),
  Vote(Vote),
}

impl Message {
  pub fn hash(&self) -> Hash {
    match self {
      Message::Block(block) => block.hash,
      Message::Vote(vote) => vote.hash,
    }
  }
}

impl fmt::Display for Message {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Message::Block(block) => write!(f, "block {} (height {})", block.hash, block.height),
      Message::Vote(vote) => write!(f, "vote {} ({} -> {})", vote.hash, vote.source, vote.target),
    }
  }
}

/// An object a validator has accepted into its local view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Processed {
  Block(Block),
  Vote(Vote),
}

impl Processed {
  pub fn as_block(&self) -> Option<&Block> {
    match self {
      Processed::Block(block) => Some(block),
      Processed::Vote(_) => None,
    }
  }
}

impl From<Message> for Processed {
  fn from(msg: Message) -> Self {
    match msg {
      Message::Block(block) => Processed::Block(block),
      Message::Vote(vote) => Processed::Vote(vote),
    }
  }
}
