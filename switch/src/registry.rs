//! Connection registry and role classification.
//!
//! Roles are derived from the peer address, in priority order: loopback
//! peers are acquirer test fixtures, then the configured acquirer and
//! issuer lists, then a first-connected-wins fallback. The registry keeps
//! two disjoint `connection id -> handle` maps; cross-task writes go
//! through a per-connection write mutex so forwarded frames never
//! interleave.

use std::fmt;
use std::io;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::RoutingConfig;

/// Assigned connection role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Acquirer,
    Issuer,
    Unknown,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Acquirer => "acquirer",
            Role::Issuer => "issuer",
            Role::Unknown => "unknown",
        })
    }
}

type FrameSink = Arc<Mutex<Box<dyn AsyncWrite + Send + Unpin>>>;

/// Shared write handle for one connection.
///
/// Cheap to clone; the underlying socket write half is serialized behind
/// a mutex so the dispatcher and the connection's own task can both send
/// complete frames.
#[derive(Clone)]
pub struct ConnectionHandle {
    id: Arc<str>,
    sink: FrameSink,
}

impl ConnectionHandle {
    pub fn new(id: impl Into<String>, writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        Self {
            id: Arc::from(id.into()),
            sink: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Stable `host:port` identity, used for logging and pending-entry purges.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Write one already-framed message and flush it.
    pub async fn send_frame(&self, frame: &[u8]) -> io::Result<()> {
        let mut sink = self.sink.lock().await;
        sink.write_all(frame).await?;
        sink.flush().await
    }

    async fn shutdown(&self) {
        let mut sink = self.sink.lock().await;
        if let Err(e) = sink.shutdown().await {
            debug!(connection = %self.id, error = %e, "shutdown on closed sink");
        }
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Strip the IPv4-mapped prefix dual-stack listeners report.
pub fn normalize_host(host: &str) -> &str {
    host.strip_prefix("::ffff:").unwrap_or(host)
}

fn is_loopback(host: &str) -> bool {
    host == "127.0.0.1" || host == "::1"
}

/// Acquirer and issuer connection maps, keyed by `host:port`.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    acquirers: DashMap<String, ConnectionHandle>,
    issuers: DashMap<String, ConnectionHandle>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive the role for a peer address.
    ///
    /// Loopback peers are always acquirers (test fixture); otherwise the
    /// configured lists decide, and unlisted peers fall back to filling
    /// the first empty role slot.
    pub fn classify(&self, host: &str, routing: &RoutingConfig) -> Role {
        let host = normalize_host(host);
        if is_loopback(host) {
            return Role::Acquirer;
        }
        if routing.acquirers.iter().any(|a| a == host) {
            return Role::Acquirer;
        }
        if routing.issuers.iter().any(|i| i == host) {
            return Role::Issuer;
        }
        if self.acquirers.is_empty() {
            Role::Acquirer
        } else if self.issuers.is_empty() {
            Role::Issuer
        } else {
            Role::Unknown
        }
    }

    pub fn register(&self, role: Role, handle: ConnectionHandle) {
        let map = match role {
            Role::Acquirer => &self.acquirers,
            Role::Issuer => &self.issuers,
            // Unknown peers stay connected but untracked; their frames
            // are dropped by the dispatcher.
            Role::Unknown => return,
        };
        map.insert(handle.id().to_string(), handle);
    }

    pub fn deregister(&self, role: Role, id: &str) {
        match role {
            Role::Acquirer => self.acquirers.remove(id),
            Role::Issuer => self.issuers.remove(id),
            Role::Unknown => None,
        };
    }

    /// Any currently registered issuer, first iteration-order entry.
    pub fn first_issuer(&self) -> Option<ConnectionHandle> {
        self.issuers.iter().next().map(|e| e.value().clone())
    }

    /// Any currently registered acquirer, first iteration-order entry.
    pub fn first_acquirer(&self) -> Option<ConnectionHandle> {
        self.acquirers.iter().next().map(|e| e.value().clone())
    }

    pub fn acquirer_count(&self) -> usize {
        self.acquirers.len()
    }

    pub fn issuer_count(&self) -> usize {
        self.issuers.len()
    }

    /// Shut down every live connection; used on process shutdown after
    /// the listener has been closed.
    pub async fn close_all(&self) {
        let handles: Vec<ConnectionHandle> = self
            .acquirers
            .iter()
            .chain(self.issuers.iter())
            .map(|e| e.value().clone())
            .collect();
        self.acquirers.clear();
        self.issuers.clear();
        for handle in handles {
            handle.shutdown().await;
        }
    }
}
