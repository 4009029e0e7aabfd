//! Remember the last N distinct messages seen from peers in a gossip network.
//!
//! A [`MessageTracker`] records [messages][Message] in the order they arrive,
//! ignores any message whose ID it has already recorded, and forgets the oldest
//! message once it holds its configured capacity. Callers use it to avoid
//! re-processing (or re-broadcasting) a message they have already seen, to look
//! up a recent message by ID, and to list recent history in arrival order.
//!
//! [`History`] is the same structure without the lock, for callers which
//! already hold `&mut` access.

mod config;
mod error;
mod history;
mod message;
mod tracker;

pub use config::Config;
pub use error::Error;
pub use history::{Added, History, Iter};
pub use message::Message;
pub use tracker::MessageTracker;
