use std::sync::Arc;

use bytes::Bytes;
use msgtrap::{Config, Message};
use rand::{seq::SliceRandom as _, thread_rng};
use tokio::{
    sync::{mpsc, watch},
    task::JoinSet,
};

mod flight;
mod node;
mod seq;

pub use flight::InFlight;
pub use node::{Envelope, Node, Outbox, Report};
pub use seq::Counter;

/// Knobs for a simulated [`Cluster`].
#[derive(Clone, Debug)]
pub struct Settings {
    pub nodes: usize,
    pub links: usize,
    pub tracker: Config,
    /// How many times a message may be relayed after it is injected.
    pub ttl: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            nodes: 8,
            links: 2,
            tracker: Config { capacity: 32 },
            ttl: 6,
        }
    }
}

/// A mesh of gossiping [nodes][Node], each connected to its ring neighbors
/// plus a few random others.
#[derive(Debug)]
pub struct Cluster {
    nodes: Vec<Node>,
    entry: Vec<Outbox>,
    flight: Arc<InFlight>,
    ttl: u8,
}

impl Cluster {
    pub fn new(settings: &Settings) -> Result<Self, msgtrap::Error> {
        let n = settings.nodes.max(2);
        let flight = Arc::new(InFlight::default());

        let mut nodes = Vec::with_capacity(n);
        let mut outboxes = Vec::with_capacity(n);

        for i in 0..n {
            let (tx, rx) = mpsc::unbounded_channel();
            let tracker = Arc::new(settings.tracker.build()?);

            nodes.push(Node::new(name(i), tracker, rx, flight.clone()));
            outboxes.push(tx);
        }

        let mut rng = thread_rng();
        for (i, node) in nodes.iter_mut().enumerate() {
            let mut neighbors = vec![(i + 1) % n, (i + n - 1) % n];

            let mut others: Vec<usize> = (0..n)
                .filter(|j| *j != i && !neighbors.contains(j))
                .collect();
            others.shuffle(&mut rng);
            neighbors.extend(others.into_iter().take(settings.links));
            neighbors.dedup();

            for j in neighbors {
                node.connect(name(j), outboxes[j].clone());
            }
        }

        Ok(Self {
            nodes,
            entry: outboxes,
            flight,
            ttl: settings.ttl,
        })
    }

    /// Start every node, inject `count` messages at random nodes, and wait
    /// until every relayed copy has been handled.
    pub async fn run(self, count: usize) -> Vec<Report> {
        let Cluster {
            nodes,
            entry,
            flight,
            ttl,
        } = self;
        let (stop_tx, stop_rx) = watch::channel(false);

        let mut tasks = JoinSet::new();
        for node in nodes {
            tasks.spawn(node.run(stop_rx.clone()));
        }

        // nothing is quiet until every message has been injected
        flight.hold();
        {
            let mut rng = thread_rng();

            for seq in Counter::new("client").take(count) {
                let Some(outbox) = entry.choose(&mut rng) else {
                    break;
                };
                let id = seq.to_string();
                let data = Bytes::from(format!("payload for {id}"));

                flight.send(
                    outbox,
                    Envelope {
                        from: "client".to_owned(),
                        ttl,
                        message: Message::new(id, "client", data),
                    },
                );
            }
        }
        flight.done();

        flight.quiet().await;
        let _ = stop_tx.send(true);

        let mut reports = Vec::new();
        while let Some(report) = tasks.join_next().await {
            match report {
                Ok(report) => reports.push(report),
                Err(err) => tracing::warn!(?err, "node task failed"),
            }
        }

        reports.sort_by(|a, b| a.name.cmp(&b.name));
        reports
    }
}

fn name(i: usize) -> String {
    format!("n{i}")
}
