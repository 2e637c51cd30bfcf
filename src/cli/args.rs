use crate::core::snapshotter::DEFAULT_SNAPSHOT_INTERVAL;
use crate::io::csv_sink::DEFAULT_SNAPSHOT_FILE;
use crate::io::protocol::ResponseStyle;
use crate::server::{ServerConfig, SnapshotTarget, DEFAULT_BIND};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Metro card terminal over WebSocket
#[derive(Parser, Debug)]
#[command(name = "metro-card-simulator")]
#[command(about = "Serve metro card recharges and trips over WebSocket", long_about = None)]
pub struct CliArgs {
    /// Address to listen on
    #[arg(
        long = "bind",
        value_name = "ADDR",
        default_value = DEFAULT_BIND,
        help = "Address to listen on for WebSocket clients"
    )]
    pub bind: SocketAddr,

    /// Seconds between ledger exports
    #[arg(
        long = "snapshot-interval-secs",
        value_name = "SECS",
        help = "Seconds between ledger exports (default: 120)"
    )]
    pub snapshot_interval_secs: Option<u64>,

    /// Export destination
    #[arg(
        long = "snapshot-path",
        value_name = "PATH",
        default_value = DEFAULT_SNAPSHOT_FILE,
        help = "CSV file the ledger is exported to, '-' for stdout"
    )]
    pub snapshot_path: PathBuf,

    /// Disable ANSI colours in replies
    #[arg(long = "plain", help = "Send replies without ANSI colour codes")]
    pub plain: bool,

    /// Tokio worker threads
    #[arg(
        long = "workers",
        value_name = "COUNT",
        help = "Number of worker threads (default: CPU cores)"
    )]
    pub workers: Option<usize>,
}

impl CliArgs {
    /// Create a ServerConfig from CLI arguments
    ///
    /// Missing values fall back to defaults. Zero values are rejected with a
    /// warning and replaced by the default.
    pub fn to_server_config(&self) -> ServerConfig {
        let default = ServerConfig::default();

        let snapshot_interval = match self.snapshot_interval_secs {
            Some(0) => {
                warn!(
                    default_secs = DEFAULT_SNAPSHOT_INTERVAL.as_secs(),
                    "Invalid snapshot interval (0), using default"
                );
                default.snapshot_interval
            }
            Some(secs) => Duration::from_secs(secs),
            None => default.snapshot_interval,
        };

        let workers = match self.workers {
            Some(0) => {
                warn!(
                    default = default.workers,
                    "Invalid worker count (0), using default"
                );
                default.workers
            }
            Some(workers) => workers,
            None => default.workers,
        };

        let snapshot_target = if self.snapshot_path.as_os_str() == "-" {
            SnapshotTarget::Stdout
        } else {
            SnapshotTarget::File(self.snapshot_path.clone())
        };

        let style = if self.plain {
            ResponseStyle::Plain
        } else {
            ResponseStyle::Ansi
        };

        ServerConfig {
            bind: self.bind,
            snapshot_interval,
            snapshot_target,
            style,
            workers,
        }
    }
}
