use std::num::NonZeroUsize;

use crate::{Error, MessageTracker};

/// Configuration for a [`MessageTracker`].
#[derive(PartialEq, Eq, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// The maximum number of distinct messages retained. Must be positive.
    pub capacity: usize,
}

impl Config {
    /// The number of messages retained when not otherwise configured.
    pub const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(1024) {
        Some(n) => n,
        None => unreachable!(),
    };

    /// Build a [`MessageTracker`] from this configuration.
    pub fn build(&self) -> Result<MessageTracker, Error> {
        MessageTracker::from_config(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: Self::DEFAULT_CAPACITY.get(),
        }
    }
}
