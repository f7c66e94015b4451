//! Example: Following the recorder health feed
//!
//! This example demonstrates how to embed a `HealthMonitor` in your own
//! application: subscribe to status updates, read the connection state
//! from inside the callback, and shut down cleanly.
//!
//! The monitor reconnects every two seconds while the recorder is not
//! running, so it is fine to start this before the recorder.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example follow
//! cargo run --example follow -- ws://10.0.0.5:3030/ws/health
//! ```

use std::env;

use healthwatch::{Assessment, Expectations};
use healthwatch_client::{HealthMonitor, DEFAULT_ENDPOINT};

#[tokio::main]
async fn main() {
    let endpoint = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

    println!("Following {}", endpoint);
    println!("Press Ctrl-C to stop.\n");

    let monitor = match HealthMonitor::builder().endpoint(endpoint).build() {
        Ok(monitor) => monitor,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    // A weak handle, so the subscription does not keep the connection alive
    let observer = monitor.downgrade();
    monitor.subscribe(move |status| {
        let Some(monitor) = observer.upgrade() else {
            return;
        };
        let verdict = Assessment::of(status, &Expectations::default());
        let message = status.map(|s| s.message.as_str()).unwrap_or("-");
        println!(
            "[{:>4}] state={:<10} loading={:<5} {}",
            verdict.symbol(),
            monitor.state(),
            monitor.is_loading(),
            message
        );
    });

    monitor.ensure_started();

    tokio::signal::ctrl_c().await.ok();
    monitor.shutdown().await;
    println!("\nStopped.");
}
