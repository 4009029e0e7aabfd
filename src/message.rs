use std::fmt;

use bytes::Bytes;

/// A message received from a peer in a gossip network.
///
/// Only the [`id`][Message::id] matters to a [tracker][crate::MessageTracker]:
/// two peers relaying the same ID are relaying the same message. The payload is
/// carried along untouched.
#[derive(PartialEq, Eq, Hash, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Message {
    /// The identifier assigned by the sender, used to detect duplicates.
    pub id: String,

    /// The peer which delivered this message to us.
    pub peer: String,

    /// The opaque message payload.
    pub data: Bytes,
}

impl Message {
    pub fn new(id: impl Into<String>, peer: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            id: id.into(),
            peer: peer.into(),
            data: data.into(),
        }
    }

    /// Re-address this message as if `peer` had delivered it, keeping the same
    /// ID and (shared) payload.
    pub fn relayed_by(&self, peer: impl Into<String>) -> Self {
        Self {
            id: self.id.clone(),
            peer: peer.into(),
            data: self.data.clone(),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (from {}, {} bytes)",
            self.id,
            self.peer,
            self.data.len()
        )
    }
}
