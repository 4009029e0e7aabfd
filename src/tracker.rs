use std::{num::NonZeroUsize, sync::Arc};

use parking_lot::Mutex;

use crate::{history::Added, Config, Error, History, Message};

/// Tracks the most recent distinct [messages][Message] received from peers.
///
/// A `MessageTracker` is a [`History`] behind a lock, so it can be shared (e.g.,
/// in an [`Arc`]) between a network receive loop calling
/// [`add`][MessageTracker::add] and whatever else inspects or prunes the
/// record. Every operation takes the lock exactly once, so no caller ever
/// observes a half-applied change.
///
/// ```
/// use msgtrap::{Message, MessageTracker};
///
/// let tracker = MessageTracker::new(2)?;
///
/// tracker.add(Message::new("1", "alice", "first"));
/// tracker.add(Message::new("2", "bob", "second"));
/// tracker.add(Message::new("3", "alice", "third"));
///
/// let ids: Vec<_> = tracker.messages().iter().map(|m| m.id.clone()).collect();
/// assert_eq!(ids, ["2", "3"]);
/// assert!(tracker.message("1").is_err());
/// # Ok::<(), msgtrap::Error>(())
/// ```
#[derive(Debug)]
pub struct MessageTracker {
    capacity: NonZeroUsize,
    history: Mutex<History>,
}

impl MessageTracker {
    /// Create a tracker which retains up to `capacity` messages.
    ///
    /// Fails with [`Error::InvalidCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, Error> {
        History::try_new(capacity).map(Self::from)
    }

    /// Create a tracker which retains up to `capacity` messages.
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self::from(History::new(capacity))
    }

    /// Create a tracker from [configuration][Config].
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Self::new(config.capacity)
    }

    /// Record a message received from a peer.
    ///
    /// If the tracker is full, the oldest message is evicted to make room. If a
    /// message with the same ID has already been recorded, this is a no-op: the
    /// existing entry keeps its position, payload and peer.
    pub fn add(&self, message: impl Into<Arc<Message>>) -> Added {
        self.history.lock().add(message)
    }

    /// Forget the message with the given ID, returning it.
    pub fn delete(&self, id: &str) -> Result<Arc<Message>, Error> {
        self.history.lock().delete(id)
    }

    /// Look up a message by ID. The message is retained.
    pub fn message(&self, id: &str) -> Result<Arc<Message>, Error> {
        self.history.lock().message(id)
    }

    /// Copy out every retained message, in the order they were received.
    ///
    /// The returned `Vec` is a snapshot; later changes to the tracker are not
    /// reflected in it.
    pub fn messages(&self) -> Vec<Arc<Message>> {
        self.history.lock().messages()
    }

    /// Whether a message with the given ID has been seen (and not yet evicted
    /// or deleted).
    pub fn contains(&self, id: &str) -> bool {
        self.history.lock().contains(id)
    }

    pub fn len(&self) -> usize {
        self.history.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.lock().is_empty()
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Unwrap the underlying [`History`].
    pub fn into_inner(self) -> History {
        self.history.into_inner()
    }
}

impl From<History> for MessageTracker {
    fn from(history: History) -> Self {
        Self {
            capacity: history.capacity,
            history: Mutex::new(history),
        }
    }
}

impl Default for MessageTracker {
    /// Create a tracker with the [default capacity][Config::DEFAULT_CAPACITY].
    fn default() -> Self {
        Self::with_capacity(Config::DEFAULT_CAPACITY)
    }
}
