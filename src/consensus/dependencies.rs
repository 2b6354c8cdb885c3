//! Buffers objects that reference a hash this validator has not yet
//! processed, and releases them once that hash arrives.
//!
//! Delivery order over the network is not guaranteed to match causal
//! order, but the finality rules here only ever need to resolve a single
//! missing parent hash per object, not an unbounded descendant tree, so
//! a flat map is enough.

use std::collections::HashMap;

use super::message::Message;
use crate::primitives::Hash;

#[derive(Debug, Default)]
pub struct DependencyBuffer {
  pending: HashMap<Hash, Vec<Message>>,
}

impl DependencyBuffer {
  pub fn new() -> Self {
    DependencyBuffer {
      pending: HashMap::new(),
    }
  }

  /// Buffers `item` until `on` is processed.
  pub fn defer(&mut self, on: Hash, item: Message) {
    self.pending.entry(on).or_default().push(item);
  }

  /// Removes and returns every item waiting on `resolved`, if any.
  pub fn take_ready(&mut self, resolved: Hash) -> Vec<Message> {
    self.pending.remove(&resolved).unwrap_or_default()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::consensus::vote::Vote;
  use rand::SeedableRng;
  use rand_chacha::ChaCha8Rng;

  #[test]
  fn flushes_only_the_resolved_bucket() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut buf = DependencyBuffer::new();
    let v1 = Vote::new(&mut rng, Hash(1), Hash(2), 0, 1, 0);
    let v2 = Vote::new(&mut rng, Hash(3), Hash(4), 0, 1, 1);
    buf.defer(Hash(1), Message::Vote(v1.clone()));
    buf.defer(Hash(3), Message::Vote(v2));

    let ready = buf.take_ready(Hash(1));
    assert_eq!(ready, vec![Message::Vote(v1)]);
    assert!(buf.take_ready(Hash(1)).is_empty());
    assert_eq!(buf.take_ready(Hash(3)).len(), 1);
  }
}
