//! Demonstrates applying configuration edits to a live monitor.
//!
//! Watches the first directory given on the command line, then after ten
//! seconds adds the remaining directories and tightens the latency. The
//! edits take effect through `restart`; changes made before it are held
//! until then.
//!
//! ```bash
//! cargo run --example restart -- /tmp /var/log
//! ```

use std::time::Duration;

use camino::Utf8PathBuf;
use dn_watcher::Monitor;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("debug,notify=warn,mio=warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let directories: Vec<String> = std::env::args().skip(1).collect();
    let Some((first, rest)) = directories.split_first() else {
        return Err("usage: restart <directory>...".into());
    };

    let mut monitor = Monitor::new(|dirs: &[Utf8PathBuf]| {
        info!(?dirs, "changed");
    });
    monitor.watch(first.as_str());
    monitor.start().await?;
    info!(directory = %first, latency = monitor.latency(), "watching");

    tokio::time::sleep(Duration::from_secs(10)).await;

    // Edits are held until the restart; the running loop is unaffected.
    monitor.watch(directories.clone());
    monitor.set_latency(0.1)?;
    monitor.restart().await?;
    info!(
        directories = directories.len(),
        added = rest.len(),
        latency = monitor.latency(),
        "restarted with the full set"
    );

    tokio::signal::ctrl_c().await?;
    monitor.stop().await?;
    Ok(())
}
