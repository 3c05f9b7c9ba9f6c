use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

/// Environment variable holding the log filter (`tracing_subscriber`
/// `EnvFilter` syntax, e.g. `tilt_view=debug`).
pub const LOG_VAR: &str = "TILT_VIEW_LOG";

/// Command line options; every flag can also come from the environment.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(version, about = "Serve a live device orientation view to a browser")]
pub struct Config {
    /// Address the page bridge listens on
    #[arg(long, env = "TILT_VIEW_BIND", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,
    /// How often the page refreshes the rendered view, in milliseconds
    #[arg(
        long,
        env = "TILT_VIEW_POLL_MS",
        default_value_t = 250,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub poll_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            poll_ms: 250,
        }
    }
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }
}
