//! The finality gadget: block and vote objects, the per-validator view
//! of the chain, and the Casper slashing conditions.

pub mod block;
pub mod dependencies;
pub mod fault;
pub mod message;
pub mod validator;
pub mod vote;

pub use block::{Block, Dynasty};
pub use fault::{LoggingSlashObserver, SlashEvent, SlashObserver, SlashReason};
pub use message::Message;
pub use validator::{Accept, Validator};
pub use vote::Vote;
