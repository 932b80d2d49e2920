//! Relay demo - Main Entry Point
//!
//! Wires a producer, a relay and a printing client together, lets chunks
//! flow until a timeout cancels the relay's context, then prints the tree.

use anyhow::Context as _;
use relay_hierarchy::{
    config::{self, RelayConfig},
    Context, Node, StopSignal,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,relay_hierarchy=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => RelayConfig::load(&path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => config::default_config_path()
            .filter(|path| path.exists())
            .map(RelayConfig::load_or_default)
            .unwrap_or_default(),
    };
    tracing::info!("Starting relay demo: {:?}", config.demo);

    let producer: Node<i64> = Node::with_config("producer", &config);
    let relay: Node<i64> = Node::with_config("relay", &config);
    let printer: Node<i64> = Node::with_config("printer", &config);
    printer.set_principally_client(true);

    let received = Arc::new(AtomicUsize::new(0));
    let counter = received.clone();
    printer.set_input_handler(move |value: i64| {
        counter.fetch_add(1, Ordering::Relaxed);
        tracing::info!("printer received {}", value);
    });

    let weak = producer.downgrade();
    let interval = config.demo.interval();
    let start_value = config.demo.start_value;
    producer.set_task(move |stop: StopSignal| {
        let mut value = start_value;
        loop {
            if let Some(node) = weak.upgrade() {
                node.output(value);
            }
            value += 1;
            if stop.wait_timeout(interval) {
                break;
            }
        }
    });

    // Cancelling the relay's context tears the whole tree down.
    relay.watch_context(Context::with_timeout(config.demo.run_time()));

    relay.add_client(&printer);
    producer.add_client(&relay);

    println!("{}", producer.snapshot().to_json()?);

    relay.wait();
    producer.wait();

    tracing::info!(
        "Relay demo finished, {} chunks delivered",
        received.load(Ordering::Relaxed)
    );
    println!("{}", producer.snapshot().to_json()?);

    Ok(())
}
