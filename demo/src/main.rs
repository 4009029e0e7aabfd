use std::str::FromStr;

use msgtrap::Config;
use tracing::{info, Level};

mod cluster;

use cluster::{Cluster, Settings};

#[tokio::main]
async fn main() -> Result<(), msgtrap::Error> {
    setup_tracing();

    let settings = settings();
    let messages = env("MESSAGES").unwrap_or(64);

    info!(?settings, messages, "starting cluster");
    let reports = Cluster::new(&settings)?.run(messages).await;

    for report in reports {
        println!(
            "{:>4}: stored {:>4}, evicted {:>4}, dropped {:>4} duplicates; retaining {}",
            report.name,
            report.stored,
            report.evicted,
            report.duplicates,
            report.retained.len()
        );

        if let Some(newest) = report.retained.last() {
            println!("      newest: {newest}");
        }
    }

    Ok(())
}

fn settings() -> Settings {
    let defaults = Settings::default();

    Settings {
        nodes: env("NODES").unwrap_or(defaults.nodes),
        links: env("LINKS").unwrap_or(defaults.links),
        tracker: Config {
            capacity: env("CAPACITY").unwrap_or(defaults.tracker.capacity),
        },
        ttl: env("TTL").unwrap_or(defaults.ttl),
    }
}

fn env<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|value| value.parse().ok())
}

#[cfg(debug_assertions)]
fn setup_tracing() {
    tracing_subscriber::fmt()
        .pretty()
        .with_max_level(Level::TRACE)
        .init();
}

#[cfg(not(debug_assertions))]
fn setup_tracing() {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();
}
