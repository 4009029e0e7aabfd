use std::sync::Arc;

use msgtrap::{Added, Message, MessageTracker};
use tokio::{select, sync::mpsc, sync::watch};
use tracing::{debug, trace};

use super::flight::InFlight;

/// A message in flight between two nodes.
#[derive(Clone, Debug)]
pub struct Envelope {
    pub from: String,
    /// Remaining hops; a node receiving an envelope with `ttl == 0` stores the
    /// message but does not relay it.
    pub ttl: u8,
    pub message: Message,
}

pub type Inbox = mpsc::UnboundedReceiver<Envelope>;
pub type Outbox = mpsc::UnboundedSender<Envelope>;

/// A simulated gossip node: every new message is stored and flooded to each
/// neighbor except the one it came from; messages already seen are dropped.
#[derive(Debug)]
pub struct Node {
    pub name: String,
    tracker: Arc<MessageTracker>,
    neighbors: Vec<(String, Outbox)>,
    inbox: Inbox,
    flight: Arc<InFlight>,
}

/// What a [`Node`] saw before the cluster stopped.
#[derive(Clone, Debug, Default)]
pub struct Report {
    pub name: String,
    pub stored: usize,
    pub evicted: usize,
    pub duplicates: usize,
    pub retained: Vec<Arc<Message>>,
}

impl Node {
    pub fn new(
        name: impl Into<String>,
        tracker: Arc<MessageTracker>,
        inbox: Inbox,
        flight: Arc<InFlight>,
    ) -> Self {
        Self {
            name: name.into(),
            tracker,
            neighbors: Vec::new(),
            inbox,
            flight,
        }
    }

    pub fn connect(&mut self, name: impl Into<String>, outbox: Outbox) {
        self.neighbors.push((name.into(), outbox));
    }

    pub async fn run(mut self, mut stop: watch::Receiver<bool>) -> Report {
        let mut report = Report {
            name: self.name.clone(),
            ..Default::default()
        };

        loop {
            select! {
                envelope = self.inbox.recv() => match envelope {
                    Some(envelope) => {
                        self.receive(envelope, &mut report);
                        self.flight.done();
                    }
                    None => break,
                },

                _ = stop.changed() => {
                    break;
                }
            }
        }

        report.retained = self.tracker.messages();
        report
    }

    fn receive(&self, envelope: Envelope, report: &mut Report) {
        let Envelope { from, ttl, message } = envelope;

        match self.tracker.add(message.relayed_by(&from)) {
            Added::Duplicate => {
                trace!(node = %self.name, id = %message.id, %from, "dropped duplicate");
                report.duplicates += 1;
                return;
            }
            Added::Evicted(old) => {
                debug!(node = %self.name, evicted = %old.id, "history full");
                report.evicted += 1;
            }
            Added::Stored => {}
        }
        report.stored += 1;

        match ttl.checked_sub(1) {
            Some(ttl) => self.flood(&from, ttl, &message),
            None => trace!(node = %self.name, id = %message.id, "hop budget spent"),
        }
    }

    fn flood(&self, from: &str, ttl: u8, message: &Message) {
        for (name, outbox) in &self.neighbors {
            if name == from {
                continue;
            }

            let envelope = Envelope {
                from: self.name.clone(),
                ttl,
                message: message.clone(),
            };
            if !self.flight.send(outbox, envelope) {
                trace!(node = %self.name, neighbor = %name, "neighbor stopped");
            }
        }
    }
}
