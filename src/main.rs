use clap::Parser;
use tracing_subscriber::EnvFilter;

use tilt_view::config::LOG_VAR;
use tilt_view::{Config, OrientationBridge};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let config = Config::parse();

    let filter = EnvFilter::try_from_env(LOG_VAR).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let bridge = match OrientationBridge::start(&config) {
        Ok(b) => b,
        Err(e) => {
            tracing::error!("failed to start page bridge: {}", e);
            std::process::exit(1);
        }
    };

    let info = bridge.info();
    println!("Open {} on a device with orientation sensors:", info.url);
    println!("{}", info.qr_terminal);

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {}", e);
    }

    tracing::info!("shutting down");
    // Nothing else runs on this runtime, so joining here is safe.
    bridge.stop();
}
