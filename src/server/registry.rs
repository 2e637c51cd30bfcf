//! Registry of live connections
//!
//! Uses `DashMap` so connection tasks can register and unregister
//! concurrently without a global lock. The registry holds bookkeeping only;
//! card state stays inside each session.

use chrono::{DateTime, Local};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Connection identifier, unique for the life of the process
pub type ConnectionId = u64;

/// What the registry knows about a live connection
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionInfo {
    pub peer: SocketAddr,
    pub connected_at: DateTime<Local>,
}

/// Thread-safe registry of live connections
#[derive(Debug, Default)]
pub struct SessionRegistry {
    next_id: AtomicU64,
    connections: DashMap<ConnectionId, ConnectionInfo>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new connection and return its id
    pub fn register(&self, peer: SocketAddr) -> ConnectionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.connections.insert(
            id,
            ConnectionInfo {
                peer,
                connected_at: Local::now(),
            },
        );
        id
    }

    /// Forget a connection
    pub fn unregister(&self, id: ConnectionId) -> Option<ConnectionInfo> {
        self.connections.remove(&id).map(|(_, info)| info)
    }

    /// Details of a live connection
    pub fn get(&self, id: ConnectionId) -> Option<ConnectionInfo> {
        self.connections.get(&id).map(|entry| entry.value().clone())
    }

    /// Number of live connections
    pub fn active(&self) -> usize {
        self.connections.len()
    }

    /// Peers of all live connections, in no particular order
    pub fn peers(&self) -> Vec<SocketAddr> {
        self.connections
            .iter()
            .map(|entry| entry.value().peer)
            .collect()
    }
}

/// Keeps a connection registered until dropped
pub struct RegistrationGuard {
    registry: Arc<SessionRegistry>,
    id: ConnectionId,
}

impl RegistrationGuard {
    pub fn new(registry: Arc<SessionRegistry>, peer: SocketAddr) -> Self {
        let id = registry.register(peer);
        Self { registry, id }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        self.registry.unregister(self.id);
    }
}
