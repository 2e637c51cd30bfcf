//! WebSocket terminal server
//!
//! This module wires the core components to the network:
//!
//! ```text
//! Server
//!     ├── TcpListener            (accept loop)
//!     ├── connection             (WebSocket upgrade + per-connection Session)
//!     ├── SessionRegistry        (live connection bookkeeping, DashMap)
//!     └── Arc<Ledger>            (shared with the Snapshotter)
//! ```
//!
//! Every accepted client is served by its own task, so a slow or broken
//! client never holds up the others.

pub mod connection;
pub mod registry;

pub use connection::{run_session, serve_connection, ConnectionContext};
pub use registry::{ConnectionId, ConnectionInfo, SessionRegistry};

use crate::core::ledger::Ledger;
use crate::core::snapshotter::DEFAULT_SNAPSHOT_INTERVAL;
use crate::io::csv_sink::DEFAULT_SNAPSHOT_FILE;
use crate::io::protocol::ResponseStyle;
use crate::types::TerminalError;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Default listen address, the terminal's historical port
pub const DEFAULT_BIND: &str = "127.0.0.1:9090";

/// Where snapshots are exported
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotTarget {
    /// CSV file, replaced on every export
    File(PathBuf),
    /// Standard output
    Stdout,
}

/// Runtime configuration for the terminal service
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Address to listen on
    pub bind: SocketAddr,
    /// Time between ledger exports
    pub snapshot_interval: Duration,
    /// Export destination
    pub snapshot_target: SnapshotTarget,
    /// Reply decoration
    pub style: ResponseStyle,
    /// Tokio worker threads
    pub workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 9090)),
            snapshot_interval: DEFAULT_SNAPSHOT_INTERVAL,
            snapshot_target: SnapshotTarget::File(PathBuf::from(DEFAULT_SNAPSHOT_FILE)),
            style: ResponseStyle::Ansi,
            workers: num_cpus::get(),
        }
    }
}

/// Accepting side of the terminal
pub struct Server {
    listener: TcpListener,
    ledger: Arc<Ledger>,
    registry: Arc<SessionRegistry>,
    style: ResponseStyle,
}

impl Server {
    /// Bind the listener
    ///
    /// # Arguments
    ///
    /// * `addr` - Address to listen on; port 0 picks a free port
    /// * `ledger` - Ledger every session appends to
    /// * `style` - Reply decoration
    pub async fn bind(
        addr: SocketAddr,
        ledger: Arc<Ledger>,
        style: ResponseStyle,
    ) -> Result<Self, TerminalError> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            ledger,
            registry: Arc::new(SessionRegistry::new()),
            style,
        })
    }

    /// Address actually bound
    pub fn local_addr(&self) -> Result<SocketAddr, TerminalError> {
        Ok(self.listener.local_addr()?)
    }

    /// Live connection registry
    pub fn registry(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.registry)
    }

    /// Accept clients until `shutdown` is cancelled
    ///
    /// On shutdown the listener stops accepting, every open session is sent
    /// a close frame, and this returns once all of them have ended.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), TerminalError> {
        let ctx = ConnectionContext {
            ledger: self.ledger,
            registry: Arc::clone(&self.registry),
            style: self.style,
            shutdown: shutdown.clone(),
        };
        let mut connections = JoinSet::new();

        info!(addr = %self.listener.local_addr()?, "Terminal listening for WebSocket clients");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        connections.spawn(serve_connection(stream, peer, ctx.clone()));
                    }
                    // Accept errors (e.g. too many open files) are transient
                    Err(e) => warn!(error = %e, "Failed to accept connection"),
                },
                // Reap finished connection tasks
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = joined {
                        warn!(error = %e, "Connection task panicked");
                    }
                }
            }
        }

        info!(
            active = self.registry.active(),
            peers = ?self.registry.peers(),
            "Closing open sessions"
        );
        while let Some(joined) = connections.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "Connection task panicked");
            }
        }
        Ok(())
    }
}
