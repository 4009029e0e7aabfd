use std::{collections::HashMap, fmt, iter::FusedIterator, num::NonZeroUsize, sync::Arc};

use tracing::{debug, trace};

use crate::{Error, Message};

/// A bounded, first-in-first-out record of distinct [messages][Message].
///
/// A `History` retains at most [`capacity`][History::capacity] messages, in the
/// order they were [added][History::add]. Adding a new message to a full
/// history evicts the oldest one; adding a message whose ID is already present
/// does nothing at all (the original entry keeps its place and its
/// [`peer`][Message::peer]).
///
/// Messages live in a slab of at most `capacity` slots, threaded into a
/// doubly-linked list from oldest to newest, with an index from message ID to
/// slot. Adding, deleting, looking up and evicting are all O(1).
///
/// `History` requires `&mut self` to change; see
/// [`MessageTracker`][crate::MessageTracker] for a version which can be shared
/// between threads.
pub struct History {
    pub(crate) capacity: NonZeroUsize,
    slots: Vec<Slot>,
    free: Vec<usize>,
    index: HashMap<String, usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

#[derive(Clone, Default, Debug)]
struct Slot {
    message: Option<Arc<Message>>,
    prev: Option<usize>,
    next: Option<usize>,
}

impl History {
    /// Upper bound on the number of slots reserved up front.
    const PREALLOCATE: usize = 1024;

    /// Create an empty `History` which retains up to `capacity` messages.
    pub fn new(capacity: NonZeroUsize) -> Self {
        let reserve = capacity.get().min(Self::PREALLOCATE);

        Self {
            capacity,
            slots: Vec::with_capacity(reserve),
            free: Vec::new(),
            index: HashMap::with_capacity(reserve),
            head: None,
            tail: None,
        }
    }

    /// Create an empty `History`, failing if `capacity` is zero.
    pub fn try_new(capacity: usize) -> Result<Self, Error> {
        NonZeroUsize::new(capacity)
            .map(Self::new)
            .ok_or(Error::InvalidCapacity(capacity))
    }

    /// The maximum number of messages retained.
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// The number of messages currently retained.
    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    /// Record a message, evicting the oldest message if the history is full.
    ///
    /// If a message with the same ID is already retained, nothing changes and
    /// [`Added::Duplicate`] is returned.
    pub fn add(&mut self, message: impl Into<Arc<Message>>) -> Added {
        let message = message.into();

        if self.index.contains_key(&message.id) {
            trace!(id = %message.id, peer = %message.peer, "duplicate message");
            return Added::Duplicate;
        }

        let evicted = if self.is_full() {
            self.pop_oldest()
        } else {
            None
        };

        trace!(id = %message.id, peer = %message.peer, "stored message");
        let id = message.id.clone();
        let slot = self.push_newest(message);
        self.index.insert(id, slot);

        match evicted {
            Some(old) => {
                debug!(evicted = %old.id, peer = %old.peer, "evicted oldest message");
                Added::Evicted(old)
            }
            None => Added::Stored,
        }
    }

    /// Remove the message with the given ID, returning it.
    ///
    /// The remaining messages keep their relative order.
    pub fn delete(&mut self, id: &str) -> Result<Arc<Message>, Error> {
        let slot = self.index.remove(id).ok_or_else(|| Error::not_found(id))?;
        let message = self.unlink(slot).ok_or_else(|| Error::not_found(id))?;

        trace!(id, "deleted message");
        Ok(message)
    }

    /// Look up a retained message by ID. The message stays in the history.
    pub fn message(&self, id: &str) -> Result<Arc<Message>, Error> {
        self.get(id).cloned().ok_or_else(|| Error::not_found(id))
    }

    /// Borrow a retained message by ID.
    pub fn get(&self, id: &str) -> Option<&Arc<Message>> {
        self.index
            .get(id)
            .and_then(|&slot| self.slots[slot].message.as_ref())
    }

    /// Whether a message with the given ID is retained.
    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Copy out every retained message, oldest first.
    pub fn messages(&self) -> Vec<Arc<Message>> {
        self.iter().cloned().collect()
    }

    /// Iterate over retained messages, oldest first.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            slots: &self.slots,
            front: self.head,
            back: self.tail,
            remaining: self.len(),
        }
    }

    /// The message which would be evicted next.
    pub fn oldest(&self) -> Option<&Arc<Message>> {
        self.head.and_then(|slot| self.slots[slot].message.as_ref())
    }

    /// The most recently added message.
    pub fn newest(&self) -> Option<&Arc<Message>> {
        self.tail.and_then(|slot| self.slots[slot].message.as_ref())
    }

    fn pop_oldest(&mut self) -> Option<Arc<Message>> {
        let slot = self.head?;
        let message = self.unlink(slot)?;
        self.index.remove(&message.id);

        Some(message)
    }

    fn push_newest(&mut self, message: Arc<Message>) -> usize {
        let node = Slot {
            message: Some(message),
            prev: self.tail,
            next: None,
        };

        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = node;
                slot
            }
            None => {
                self.slots.push(node);
                self.slots.len() - 1
            }
        };

        match self.tail {
            Some(tail) => self.slots[tail].next = Some(slot),
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);

        slot
    }

    /// Detach `slot` from the list, return it to the free list, and hand back
    /// its message. The caller is responsible for the index entry.
    fn unlink(&mut self, slot: usize) -> Option<Arc<Message>> {
        let Slot {
            message,
            prev,
            next,
        } = std::mem::take(&mut self.slots[slot]);

        match prev {
            Some(prev) => self.slots[prev].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.slots[next].prev = prev,
            None => self.tail = prev,
        }

        self.free.push(slot);

        debug_assert!(message.is_some(), "unlinked a vacant slot");
        message
    }
}

impl fmt::Debug for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("History")
            .field("capacity", &self.capacity)
            .field("ids", &IdList(self))
            .finish()
    }
}

struct IdList<'a>(&'a History);

impl fmt::Debug for IdList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.0.iter().map(|message| &message.id))
            .finish()
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a Arc<Message>;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// The outcome of [adding][History::add] a message.
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum Added {
    /// The message was stored, and nothing was evicted.
    Stored,
    /// The message was stored, evicting the oldest message to make room.
    Evicted(Arc<Message>),
    /// A message with the same ID was already present; nothing changed.
    Duplicate,
}

impl Added {
    #[inline]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Added::Duplicate)
    }

    /// The message evicted to make room, if any.
    pub fn evicted(&self) -> Option<&Arc<Message>> {
        match self {
            Added::Evicted(message) => Some(message),
            _ => None,
        }
    }
}

/// Iterator over the messages in a [`History`], oldest first.
#[derive(Clone, Debug)]
pub struct Iter<'a> {
    slots: &'a [Slot],
    front: Option<usize>,
    back: Option<usize>,
    remaining: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Arc<Message>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let slot = &self.slots[self.front?];
        self.front = slot.next;
        self.remaining -= 1;

        slot.message.as_ref()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl DoubleEndedIterator for Iter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let slot = &self.slots[self.back?];
        self.back = slot.prev;
        self.remaining -= 1;

        slot.message.as_ref()
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl FusedIterator for Iter<'_> {}

#[cfg(test)]
mod test {
    use std::collections::VecDeque;
    use std::num::NonZeroUsize;

    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::{Added, History};
    use crate::{Error, Message};

    fn history(capacity: usize) -> History {
        History::new(NonZeroUsize::new(capacity).unwrap())
    }

    fn message(id: &str) -> Message {
        Message::new(id, "peer", id.as_bytes().to_vec())
    }

    fn ids(history: &History) -> Vec<&str> {
        history.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn zero_capacity() {
        assert_eq!(History::try_new(0).unwrap_err(), Error::InvalidCapacity(0));
        assert_eq!(History::try_new(3).unwrap().capacity(), 3);
    }

    #[test]
    fn evicts_oldest() {
        let mut history = history(2);

        assert_eq!(history.add(message("1")), Added::Stored);
        assert_eq!(history.add(message("2")), Added::Stored);
        assert!(history.is_full());

        let added = history.add(message("3"));
        assert_eq!(added.evicted().map(|m| m.id.as_str()), Some("1"));

        assert_eq!(ids(&history), ["2", "3"]);
        assert_eq!(history.message("1"), Err(Error::not_found("1")));
    }

    #[test]
    fn fifo_order() {
        let mut history = history(4);

        for i in 0..5 {
            history.add(message(&i.to_string()));
        }

        assert_eq!(history.len(), 4);
        assert!(!history.contains("0"));
        assert_eq!(ids(&history), ["1", "2", "3", "4"]);
        assert_eq!(history.oldest().unwrap().id, "1");
        assert_eq!(history.newest().unwrap().id, "4");
    }

    #[test]
    fn duplicates_are_ignored() {
        let mut history = history(3);

        history.add(message("a"));
        history.add(message("b"));

        let again = Message::new("a", "someone-else", &b"other"[..]);
        assert_eq!(history.add(again), Added::Duplicate);

        assert_eq!(ids(&history), ["a", "b"]);
        assert_eq!(*history.message("a").unwrap(), message("a"));
    }

    #[test]
    fn duplicate_does_not_refresh() {
        let mut history = history(2);

        history.add(message("a"));
        history.add(message("b"));
        history.add(message("a"));
        history.add(message("c"));

        assert_eq!(ids(&history), ["b", "c"]);
    }

    #[test]
    fn lookup() {
        let mut history = history(2);
        let m = Message::new("x", "alice", &b"payload"[..]);

        history.add(m.clone());

        assert_eq!(*history.message("x").unwrap(), m);
        assert_eq!(*history.message("x").unwrap(), m);
        assert_eq!(history.len(), 1);
        assert!(history.message("y").unwrap_err().is_not_found());
    }

    #[test]
    fn delete_preserves_order() {
        let mut history = history(5);

        for id in ["a", "b", "c"] {
            history.add(message(id));
        }

        let removed = history.delete("b").unwrap();
        assert_eq!(removed.id, "b");
        assert_eq!(ids(&history), ["a", "c"]);

        assert_eq!(history.delete("b"), Err(Error::not_found("b")));
        assert_eq!(ids(&history), ["a", "c"]);
    }

    #[test]
    fn delete_ends() {
        let mut history = history(3);

        for id in ["a", "b", "c"] {
            history.add(message(id));
        }

        history.delete("a").unwrap();
        history.delete("c").unwrap();
        assert_eq!(ids(&history), ["b"]);

        history.delete("b").unwrap();
        assert!(history.is_empty());
        assert!(history.oldest().is_none());
        assert!(history.newest().is_none());

        history.add(message("d"));
        assert_eq!(ids(&history), ["d"]);
    }

    #[test]
    fn free_slots_are_vacant() {
        let mut history = history(4);

        for i in 0..40 {
            history.add(message(&i.to_string()));
            if i % 3 == 0 {
                history.delete(&i.to_string()).unwrap();
            }

            for &slot in &history.free {
                assert!(history.slots[slot].message.is_none());
            }
            for (id, &slot) in &history.index {
                assert_eq!(history.slots[slot].message.as_ref().unwrap().id, *id);
            }
            assert_eq!(history.len() + history.free.len(), history.slots.len());
        }

        assert_eq!(history.len(), 3);
        history.add(message("filler"));
        let evicted = history.add(message("next"));
        assert!(evicted.evicted().is_some());
        assert!(history.delete("next").is_ok());
        assert!(history.delete("next").unwrap_err().is_not_found());
    }

    #[test]
    fn snapshot_is_detached() {
        let mut history = history(2);

        history.add(message("a"));
        history.add(message("b"));
        let snapshot = history.messages();

        history.delete("a").unwrap();
        history.add(message("c"));
        history.add(message("d"));

        let snapshot: Vec<_> = snapshot.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(snapshot, ["a", "b"]);
        assert_eq!(ids(&history), ["c", "d"]);
    }

    #[test]
    fn slots_are_reused() {
        let mut history = history(3);

        for i in 0..100 {
            history.add(message(&i.to_string()));
            if i % 7 == 0 {
                history.delete(&i.to_string()).unwrap();
            }
        }

        assert!(history.slots.len() <= 3);
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn iterate_both_ways() {
        let mut history = history(4);

        for id in ["a", "b", "c", "d"] {
            history.add(message(id));
        }

        let mut iter = history.iter();
        assert_eq!(iter.len(), 4);
        assert_eq!(iter.next().unwrap().id, "a");
        assert_eq!(iter.next_back().unwrap().id, "d");
        assert_eq!(iter.next().unwrap().id, "b");
        assert_eq!(iter.next_back().unwrap().id, "c");
        assert!(iter.next().is_none());
        assert!(iter.next_back().is_none());

        let reversed: Vec<_> = history.iter().rev().map(|m| m.id.as_str()).collect();
        assert_eq!(reversed, ["d", "c", "b", "a"]);
    }

    #[test]
    fn debug_lists_ids() {
        let mut history = history(2);
        history.add(message("a"));
        history.add(message("b"));

        assert_eq!(
            "History { capacity: 2, ids: [\"a\", \"b\"] }",
            format!("{history:?}")
        );
    }

    #[test]
    fn matches_naive_model() {
        const CAPACITY: usize = 5;

        let mut rng = StdRng::seed_from_u64(0x6d73_6774);
        let mut history = history(CAPACITY);
        let mut model: VecDeque<String> = VecDeque::new();

        for _ in 0..10_000 {
            let id = rng.gen_range(0..16).to_string();

            if rng.gen_bool(0.75) {
                let added = history.add(message(&id));

                if model.contains(&id) {
                    assert_eq!(added, Added::Duplicate);
                } else {
                    let evicted = if model.len() == CAPACITY {
                        model.pop_front()
                    } else {
                        None
                    };
                    model.push_back(id);

                    assert_eq!(added.evicted().map(|m| m.id.clone()), evicted);
                }
            } else {
                let deleted = history.delete(&id);

                match model.iter().position(|m| *m == id) {
                    Some(i) => {
                        model.remove(i);
                        assert_eq!(deleted.unwrap().id, id);
                    }
                    None => assert_eq!(deleted, Err(Error::not_found(&id))),
                }
            }

            assert!(history.len() <= CAPACITY);
            assert_eq!(history.len(), history.index.len());
            assert_eq!(ids(&history), model.iter().map(String::as_str).collect::<Vec<_>>());
        }
    }
}
