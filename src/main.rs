//! Metro Card Simulator
//!
//! WebSocket server simulating a metro card terminal.
//!
//! # Usage
//!
//! ```bash
//! cargo run
//! cargo run -- --bind 0.0.0.0:9090 --plain
//! cargo run -- --snapshot-interval-secs 30 --snapshot-path exports/movimientos.csv
//! cargo run -- --snapshot-path - > movimientos.csv
//! ```
//!
//! Clients connect to `ws://<bind>/` and send frames such as `Recarga:50.0`
//! or `Consumo:20`. Every two minutes (by default) the full transaction
//! ledger is written to a CSV file. Ctrl+C stops accepting clients, closes
//! open sessions and writes a final snapshot.
//!
//! Log verbosity follows `RUST_LOG` (default `info`).
//!
//! # Exit Codes
//!
//! - 0: Clean shutdown
//! - 1: Error (address in use, runtime failure, final snapshot failed, etc.)

use metro_card_simulator::cli;
use metro_card_simulator::core::{Ledger, SnapshotSink, Snapshotter};
use metro_card_simulator::io::{CsvFileSink, WriterSink};
use metro_card_simulator::server::{Server, ServerConfig, SnapshotTarget};
use metro_card_simulator::types::TerminalError;
use std::process;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse command-line arguments using clap
    let args = cli::parse_args();
    let config = args.to_server_config();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.workers)
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create tokio runtime");
            process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(serve(config)) {
        error!(error = %e, "Terminal stopped with error");
        process::exit(1);
    }
}

async fn serve(config: ServerConfig) -> Result<(), TerminalError> {
    let ledger = Arc::new(Ledger::new());

    let sink: Arc<dyn SnapshotSink> = match &config.snapshot_target {
        SnapshotTarget::File(path) => Arc::new(CsvFileSink::new(path)),
        SnapshotTarget::Stdout => Arc::new(WriterSink::stdout()),
    };
    let server = Server::bind(config.bind, Arc::clone(&ledger), config.style).await?;
    let snapshotter = Snapshotter::new(Arc::clone(&ledger), sink, config.snapshot_interval).spawn();
    info!(
        addr = %server.local_addr()?,
        snapshot_interval_secs = config.snapshot_interval.as_secs(),
        workers = config.workers,
        "Metro card terminal started, waiting for connections"
    );

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            return;
        }
        info!("Shutdown signal received");
        signal.cancel();
    });

    let served = server.run(shutdown).await;
    let report = snapshotter.stop().await?;
    info!(
        table = report.table,
        transactions = report.rows,
        destination = %report.destination,
        "Terminal shut down"
    );
    served
}
