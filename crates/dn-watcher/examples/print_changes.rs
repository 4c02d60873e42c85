//! Prints every directory that changes under the paths given on the command
//! line.
//!
//! ```bash
//! cargo run --example print_changes -- /tmp /var/log
//! ```
//!
//! Press Ctrl-C to stop; the interrupt is routed through the signal registry
//! and shuts the monitor down cleanly.

use camino::Utf8PathBuf;
use dn_watcher::{Monitor, SignalFlow, SignalRegistry};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,notify=warn,mio=warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let directories: Vec<String> = std::env::args().skip(1).collect();
    if directories.is_empty() {
        return Err("usage: print_changes <directory>...".into());
    }

    SignalRegistry::global().trap("INT", || {
        info!("interrupt received; shutting down");
        SignalFlow::Shutdown
    })?;

    let mut monitor = Monitor::new(|dirs: &[Utf8PathBuf]| {
        for dir in dirs {
            info!(directory = %dir, "changed");
        }
    });
    monitor.watch(directories);
    monitor.set_latency(0.5)?;
    monitor.start().await?;
    info!("watching; press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    monitor.stop().await?;
    Ok(())
}
