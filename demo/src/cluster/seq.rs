use std::fmt;

use rand::{thread_rng, Rng};

/// Generate [sequential][Seq] message ID's for one node.
///
/// To provide some level of collision resistance after a node restarts, bits
/// 20-28 of the initial value of a [new][Counter::new] counter are random.
#[derive(Clone, Debug)]
pub struct Counter {
    origin: String,
    next: u32,
}

impl Counter {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            next: seed() | 1,
        }
    }
}

impl Iterator for Counter {
    type Item = Seq;

    fn next(&mut self) -> Option<Self::Item> {
        let (c, n) = (self.next, self.next.wrapping_add(1));
        self.next = n;

        Some(Seq {
            origin: self.origin.clone(),
            value: c,
        })
    }
}

#[inline]
fn seed() -> u32 {
    let b: u8 = thread_rng().gen();
    (b as u32) << 20
}

/// A message ID: the originating node's name and a sequence number.
#[derive(Clone, Hash, PartialEq, Eq, Debug)]
pub struct Seq {
    origin: String,
    value: u32,
}

impl fmt::Display for Seq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{:08x}", self.origin, self.value)
    }
}
