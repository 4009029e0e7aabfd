use std::{sync::Arc, thread};

use msgtrap::{Config, Message, MessageTracker};

/// Two receive loops deliver overlapping messages from different peers; only
/// the first copy of each message is relayed.
fn main() -> Result<(), msgtrap::Error> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let tracker = Arc::new(Config { capacity: 8 }.build()?);

    let receivers: Vec<_> = ["alice", "bob"]
        .into_iter()
        .map(|peer| {
            let tracker = tracker.clone();
            thread::spawn(move || receive(&tracker, peer))
        })
        .collect();

    for receiver in receivers {
        let relayed = receiver.join().expect("receive loop panicked");
        println!("relayed {relayed} messages");
    }

    println!("recent history:");
    for message in tracker.messages() {
        println!("  {message}");
    }

    if let Ok(message) = tracker.message("msg-11") {
        println!("msg-11 first arrived from {}", message.peer);
    }

    Ok(())
}

fn receive(tracker: &MessageTracker, peer: &str) -> usize {
    (0..12)
        .map(|i| Message::new(format!("msg-{i}"), peer, format!("hello #{i}")))
        .filter(|message| !tracker.add(message.clone()).is_duplicate())
        .count()
}
