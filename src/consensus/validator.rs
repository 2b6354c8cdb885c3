//! A single validator's view of the chain: block and vote acceptance,
//! the checkpoint-tree fork choice, and the finality gadget's voting
//! rule.

use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use rand_chacha::ChaCha8Rng;

use super::block::{Block, Dynasty};
use super::dependencies::DependencyBuffer;
use super::fault::{SlashEvent, SlashObserver, SlashReason};
use super::message::{Message, Processed};
use super::vote::Vote;
use crate::parameters::Parameters;
use crate::primitives::{Hash, ValidatorId};

/// Outcome of handing a block or a vote to [`Validator::accept_block`] or
/// [`Validator::accept_vote`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accept {
  /// Applied to local state.
  Processed,
  /// Buffered until a referenced hash is processed.
  Deferred,
  /// Fails a validity check and is discarded.
  Rejected,
}

/// One validator's local view of the network.
///
/// Everything here is local state: two validators holding the same set
/// of processed objects will compute the same head, the same justified
/// set and the same finalized set, but there is no shared mutable state
/// between them — they only interact by exchanging [`Message`]s through
/// a [`crate::network::Network`].
pub struct Validator {
  id: ValidatorId,
  params: Rc<Parameters>,

  processed: HashMap<Hash, Processed>,
  dependencies: DependencyBuffer,

  /// checkpoint hash -> highest processed descendant block before the
  /// next checkpoint (the "tail" of that checkpoint's epoch).
  tails: HashMap<Hash, Block>,
  /// block hash -> checkpoint hash of the nearest ancestor checkpoint
  /// (a checkpoint is its own entry).
  tail_membership: HashMap<Hash, Hash>,

  justified: HashSet<Hash>,
  finalized: HashSet<Hash>,
  finalized_dynasties: HashSet<Dynasty>,
  highest_justified_checkpoint: Block,
  head: Block,
  current_epoch: u64,

  votes: HashMap<ValidatorId, Vec<Vote>>,
  vote_count: HashMap<Hash, HashMap<Hash, u64>>,

  rng: ChaCha8Rng,
  slash_observer: Rc<dyn SlashObserver>,
  outbox: VecDeque<Message>,
}

impl Validator {
  pub fn new(
    id: ValidatorId,
    genesis: Block,
    params: Rc<Parameters>,
    rng: ChaCha8Rng,
    slash_observer: Rc<dyn SlashObserver>,
  ) -> Validator {
    let mut processed = HashMap::new();
    processed.insert(genesis.hash, Processed::Block(genesis.clone()));
    let mut tails = HashMap::new();
    tails.insert(genesis.hash, genesis.clone());
    let mut tail_membership = HashMap::new();
    tail_membership.insert(genesis.hash, genesis.hash);
    let mut justified = HashSet::new();
    justified.insert(genesis.hash);
    let mut finalized = HashSet::new();
    finalized.insert(genesis.hash);
    let mut finalized_dynasties = HashSet::new();
    finalized_dynasties.insert(genesis.current_dynasty.clone());

    Validator {
      id,
      params,
      processed,
      dependencies: DependencyBuffer::new(),
      tails,
      tail_membership,
      justified,
      finalized,
      finalized_dynasties,
      highest_justified_checkpoint: genesis.clone(),
      head: genesis,
      current_epoch: 0,
      votes: HashMap::new(),
      vote_count: HashMap::new(),
      rng,
      slash_observer,
      outbox: VecDeque::new(),
    }
  }

  pub fn id(&self) -> ValidatorId {
    self.id
  }

  pub fn head(&self) -> &Block {
    &self.head
  }

  pub fn highest_justified_checkpoint(&self) -> &Block {
    &self.highest_justified_checkpoint
  }

  pub fn is_justified(&self, hash: Hash) -> bool {
    self.justified.contains(&hash)
  }

  pub fn is_finalized(&self, hash: Hash) -> bool {
    self.finalized.contains(&hash)
  }

  pub fn justified_count(&self) -> usize {
    self.justified.len()
  }

  pub fn justified(&self) -> impl Iterator<Item = Hash> + '_ {
    self.justified.iter().copied()
  }

  pub fn finalized(&self) -> impl Iterator<Item = Hash> + '_ {
    self.finalized.iter().copied()
  }

  /// The checkpoint `hash` belongs to: itself if `hash` is a checkpoint,
  /// otherwise the checkpoint at the root of its tail.
  pub fn checkpoint_of(&self, hash: Hash) -> Option<Hash> {
    self.tail_membership.get(&hash).copied()
  }

  pub fn block_count(&self) -> usize {
    self.processed.values().filter(|p| p.as_block().is_some()).count()
  }

  pub fn processed_blocks(&self) -> impl Iterator<Item = &Block> {
    self.processed.values().filter_map(|p| p.as_block())
  }

  /// Highest block height reached by any tail this validator tracks.
  pub fn tails(&self) -> impl Iterator<Item = &Block> {
    self.tails.values()
  }

  pub fn get_block(&self, hash: Hash) -> Option<&Block> {
    match self.processed.get(&hash) {
      Some(Processed::Block(block)) => Some(block),
      _ => None,
    }
  }

  /// Checkpoint hash of the ancestor checkpoint preceding `checkpoint`,
  /// or `None` if `checkpoint` is the genesis checkpoint.
  pub fn get_checkpoint_parent(&self, checkpoint: Hash) -> Option<Hash> {
    let block = self.get_block(checkpoint)?;
    if block.height == 0 {
      return None;
    }
    self.tail_membership.get(&block.prev_hash).copied()
  }

  fn epoch(&self, height: u64) -> u64 {
    height / self.params.epoch_size
  }

  fn is_checkpoint(&self, block: &Block) -> bool {
    block.is_checkpoint(&self.params)
  }

  /// Called once per tick. Proposes a block if it is this validator's
  /// turn, broadcasting it and applying it to local state immediately.
  pub fn tick(&mut self, time: u64) {
    let slot = time / self.params.block_proposal_time;
    let is_my_turn = time % self.params.block_proposal_time == 0
      && slot % self.params.num_validators == self.id;
    if !is_my_turn {
      return;
    }
    let block = Block::propose(&self.head, &self.finalized_dynasties, &self.params, &mut self.rng);
    self.outbox.push_back(Message::Block(block.clone()));
    self.on_receive(Message::Block(block));
  }

  /// Drains messages this validator has queued for broadcast since the
  /// last call.
  pub fn take_outbox(&mut self) -> Vec<Message> {
    self.outbox.drain(..).collect()
  }

  /// Top-level dispatcher: rejects already-seen objects, applies new
  /// ones, and flushes anything buffered on the newly resolved hash.
  pub fn on_receive(&mut self, msg: Message) {
    let hash = msg.hash();
    if self.processed.contains_key(&hash) {
      return;
    }
    let accepted = match msg.clone() {
      Message::Block(block) => matches!(self.accept_block(block), Accept::Processed),
      Message::Vote(vote) => matches!(self.accept_vote(vote), Accept::Processed),
    };
    if accepted {
      self.processed.entry(hash).or_insert_with(|| Processed::from(msg));
      for dependent in self.dependencies.take_ready(hash) {
        self.on_receive(dependent);
      }
    }
  }

  fn accept_block(&mut self, block: Block) -> Accept {
    if !self.processed.contains_key(&block.prev_hash) {
      self.dependencies.defer(block.prev_hash, Message::Block(block));
      return Accept::Deferred;
    }

    let hash = block.hash;
    self.processed.insert(hash, Processed::Block(block.clone()));

    if self.is_checkpoint(&block) {
      self.tail_membership.insert(hash, hash);
      self.tails.insert(hash, block.clone());
      self.maybe_vote_last_checkpoint(&block);
    } else {
      let checkpoint = *self
        .tail_membership
        .get(&block.prev_hash)
        .expect("a processed block's parent checkpoint is always recorded");
      self.tail_membership.insert(hash, checkpoint);
      let replace = match self.tails.get(&checkpoint) {
        Some(tail) => block.height > tail.height,
        None => true,
      };
      if replace {
        self.tails.insert(checkpoint, block.clone());
      }
    }

    self.check_head(&block);
    Accept::Processed
  }

  /// Casts a vote from the highest justified checkpoint to `target` if
  /// this epoch has not already been voted on and the source is an
  /// ancestor of the target.
  fn maybe_vote_last_checkpoint(&mut self, target: &Block) {
    debug_assert!(self.is_checkpoint(target));
    let target_epoch = self.epoch(target.height);
    if target_epoch <= self.current_epoch {
      return;
    }

    let source = self.highest_justified_checkpoint.clone();
    debug_assert!(target_epoch > self.epoch(source.height));
    self.current_epoch = target_epoch;

    if self.is_ancestor(source.hash, target.hash) {
      let vote = Vote::new(
        &mut self.rng,
        source.hash,
        target.hash,
        self.epoch(source.height),
        target_epoch,
        self.id,
      );
      self.outbox.push_back(Message::Vote(vote));
    }
  }

  /// Recomputes the head after `block` is applied: stays on the current
  /// head if it still descends from the highest justified checkpoint,
  /// otherwise picks the tallest tail descending from it.
  fn check_head(&mut self, block: &Block) {
    let justified = self.highest_justified_checkpoint.hash;
    let block_checkpoint = self.tail_membership[&block.hash];
    if self.is_ancestor(justified, block_checkpoint) {
      self.head = block.clone();
      return;
    }

    let mut best: Option<&Block> = None;
    for (checkpoint, tail) in self.tails.iter() {
      if self.is_ancestor(justified, *checkpoint) && best.map_or(true, |b| tail.height > b.height) {
        best = Some(tail);
      }
    }
    self.head = best.cloned().unwrap_or_else(|| self.highest_justified_checkpoint.clone());
  }

  fn accept_vote(&mut self, vote: Vote) -> Accept {
    if !self.processed.contains_key(&vote.source) {
      self.dependencies.defer(vote.source, Message::Vote(vote));
      return Accept::Deferred;
    }
    if !self.justified.contains(&vote.source) {
      return Accept::Rejected;
    }
    if !self.processed.contains_key(&vote.target) {
      self.dependencies.defer(vote.target, Message::Vote(vote));
      return Accept::Deferred;
    }
    if !self.is_ancestor(vote.source, vote.target) {
      return Accept::Rejected;
    }

    let target_block = self.get_block(vote.target).expect("checked above").clone();
    if !target_block.current_dynasty.contains(vote.sender) && !target_block.prev_dynasty.contains(vote.sender) {
      return Accept::Rejected;
    }

    if let Some(history) = self.votes.get(&vote.sender) {
      for past in history {
        if past.epoch_target == vote.epoch_target {
          self.slash(SlashReason::DoubleVote, past.clone(), vote);
          return Accept::Rejected;
        }
        let surrounds = (past.epoch_source < vote.epoch_source && past.epoch_target > vote.epoch_target)
          || (past.epoch_source > vote.epoch_source && past.epoch_target < vote.epoch_target);
        if surrounds {
          self.slash(SlashReason::SurroundVote, past.clone(), vote);
          return Accept::Rejected;
        }
      }
    }

    self.votes.entry(vote.sender).or_default().push(vote.clone());
    let count = self
      .vote_count
      .entry(vote.source)
      .or_default()
      .entry(vote.target)
      .or_insert(0);
    *count += 1;

    if *count as u64 * 3 > self.params.num_validators * 2 {
      self.justified.insert(vote.target);
      if vote.epoch_target > self.epoch(self.highest_justified_checkpoint.height) {
        self.highest_justified_checkpoint = target_block;
      }
      if vote.epoch_source + 1 == vote.epoch_target {
        self.finalized.insert(vote.source);
      }
    }

    Accept::Processed
  }

  fn slash(&self, reason: SlashReason, existing: Vote, offending: Vote) {
    self.slash_observer.on_slash(&SlashEvent {
      sender: offending.sender,
      reason,
      existing,
      offending,
    });
  }

  /// Whether `ancestor` is `descendant` or a checkpoint ancestor of it,
  /// walking the checkpoint chain via [`Validator::get_checkpoint_parent`].
  ///
  /// Both arguments must be checkpoints; calling this on a non-checkpoint
  /// block is a programming error, not a value this function is meant to
  /// handle gracefully.
  fn is_ancestor(&self, ancestor: Hash, descendant: Hash) -> bool {
    assert!(
      self.is_checkpoint(self.get_block(ancestor).expect("is_ancestor called on an unprocessed hash")),
      "is_ancestor called with a non-checkpoint ancestor"
    );
    assert!(
      self.is_checkpoint(self.get_block(descendant).expect("is_ancestor called on an unprocessed hash")),
      "is_ancestor called with a non-checkpoint descendant"
    );

    let mut cursor = Some(descendant);
    while let Some(hash) = cursor {
      if hash == ancestor {
        return true;
      }
      cursor = self.get_checkpoint_parent(hash);
    }
    false
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::consensus::fault::LoggingSlashObserver;
  use rand::SeedableRng;

  fn small_params() -> Parameters {
    Parameters {
      num_validators: 3,
      validator_universe: (0..6).collect(),
      initial_validators: (0..3).collect(),
      block_proposal_time: 1,
      epoch_size: 2,
      avg_latency: 1,
    }
  }

  fn new_validator(id: ValidatorId, genesis: &Block, params: &Rc<Parameters>, seed: u64) -> Validator {
    Validator::new(
      id,
      genesis.clone(),
      Rc::clone(params),
      ChaCha8Rng::seed_from_u64(seed),
      Rc::new(LoggingSlashObserver),
    )
  }

  #[test]
  fn genesis_checkpoint_is_justified_and_finalized() {
    let params = Rc::new(small_params());
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let genesis = Block::genesis(&params, &mut rng);
    let validator = new_validator(0, &genesis, &params, 2);
    assert!(validator.is_justified(genesis.hash));
    assert!(validator.is_finalized(genesis.hash));
    assert_eq!(validator.head().hash, genesis.hash);
  }

  #[test]
  fn accept_block_defers_on_missing_parent() {
    let params = Rc::new(small_params());
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let genesis = Block::genesis(&params, &mut rng);
    let mut validator = new_validator(0, &genesis, &params, 2);

    let child = Block::propose(&genesis, &HashSet::new(), &params, &mut rng);
    let grandchild = Block::propose(&child, &HashSet::new(), &params, &mut rng);

    validator.on_receive(Message::Block(grandchild.clone()));
    assert!(validator.get_block(grandchild.hash).is_none());
    assert_eq!(validator.head().hash, genesis.hash);

    validator.on_receive(Message::Block(child));
    assert!(validator.get_block(grandchild.hash).is_some());
    assert_eq!(validator.head().hash, grandchild.hash);
  }

  #[test]
  fn vote_below_quorum_does_not_justify() {
    let params = Rc::new(small_params());
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let genesis = Block::genesis(&params, &mut rng);
    let mut validator = new_validator(0, &genesis, &params, 4);

    let mut checkpoint = genesis.clone();
    for _ in 0..params.epoch_size {
      checkpoint = Block::propose(&checkpoint, &HashSet::new(), &params, &mut rng);
      validator.on_receive(Message::Block(checkpoint.clone()));
    }
    assert!(validator.is_checkpoint(&checkpoint));

    let vote = Vote::new(&mut rng, genesis.hash, checkpoint.hash, 0, 1, 1);
    validator.on_receive(Message::Vote(vote));
    assert!(!validator.is_justified(checkpoint.hash));
  }

  #[test]
  fn double_vote_is_slashed_and_rejected() {
    let params = Rc::new(small_params());
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let genesis = Block::genesis(&params, &mut rng);
    let mut validator = new_validator(0, &genesis, &params, 6);

    let mut target_a = genesis.clone();
    for _ in 0..params.epoch_size {
      target_a = Block::propose(&target_a, &HashSet::new(), &params, &mut rng);
      validator.on_receive(Message::Block(target_a.clone()));
    }

    let first = Vote::new(&mut rng, genesis.hash, target_a.hash, 0, 1, 2);
    validator.on_receive(Message::Vote(first));
    let second = Vote::new(&mut rng, genesis.hash, target_a.hash, 0, 1, 2);
    let outcome = validator.accept_vote(second);
    assert_eq!(outcome, Accept::Rejected);
  }
}
