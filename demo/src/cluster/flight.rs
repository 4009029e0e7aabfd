use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;

use super::node::{Envelope, Outbox};

/// Counts envelopes which have been sent but not yet handled, so the cluster
/// can tell when gossip has died down.
#[derive(Debug, Default)]
pub struct InFlight {
    count: AtomicUsize,
    quiet: Notify,
}

impl InFlight {
    /// Send `envelope`, counting it as in flight until a node calls
    /// [`done`][InFlight::done] for it.
    pub fn send(&self, outbox: &Outbox, envelope: Envelope) -> bool {
        self.hold();

        if outbox.send(envelope).is_err() {
            self.done();
            false
        } else {
            true
        }
    }

    /// Keep the cluster from going quiet until a matching [`done`][InFlight::done].
    pub fn hold(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
    }

    pub fn done(&self) {
        if self.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.quiet.notify_one();
        }
    }

    /// Wait until nothing is in flight.
    pub async fn quiet(&self) {
        while self.count.load(Ordering::Acquire) > 0 {
            self.quiet.notified().await;
        }
    }
}
