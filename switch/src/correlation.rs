//! STAN correlation table.
//!
//! One entry per in-flight financial request, keyed by the 6-digit trace
//! number. Entries are claimed (removed) by the first matching issuer
//! response, purged when their acquirer socket closes, and expired by a
//! periodic TTL sweep. An insert over an existing STAN overwrites it:
//! STAN reuse inside the pending window is a client bug, and the older
//! acquirer observes its own timeout. A production profile would key by
//! `(connection id, STAN)` instead.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::warn;

use crate::registry::ConnectionHandle;

/// Where a correlated response must be written.
#[derive(Debug, Clone)]
pub struct PendingEntry {
    pub acquirer: ConnectionHandle,
    pub connection_id: String,
    pub created_at: Instant,
}

/// Memory-resident `STAN -> PendingEntry` map.
#[derive(Debug, Default)]
pub struct PendingTable {
    entries: DashMap<String, PendingEntry>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the acquirer waiting on `stan`.
    pub fn insert(&self, stan: String, acquirer: ConnectionHandle) {
        let entry = PendingEntry {
            connection_id: acquirer.id().to_string(),
            acquirer,
            created_at: Instant::now(),
        };
        if let Some(previous) = self.entries.insert(stan.clone(), entry) {
            warn!(
                stan = %stan,
                previous = %previous.connection_id,
                "STAN collision, overwriting pending entry"
            );
        }
    }

    /// Remove and return the entry for `stan`, if any.
    ///
    /// Removal happens before the caller attempts the response write, so
    /// at most one response is ever relayed per request.
    pub fn claim(&self, stan: &str) -> Option<PendingEntry> {
        self.entries.remove(stan).map(|(_, entry)| entry)
    }

    /// Drop every entry owned by a closing connection.
    pub fn purge_connection(&self, connection_id: &str) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.connection_id != connection_id);
        before - self.entries.len()
    }

    /// Drop entries older than `ttl`, returning how many expired.
    pub fn sweep(&self, ttl: Duration) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.created_at.elapsed() <= ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(id: &str) -> ConnectionHandle {
        ConnectionHandle::new(id, tokio::io::sink())
    }

    #[test]
    fn claim_removes_the_entry() {
        let table = PendingTable::new();
        table.insert("094906".to_string(), handle("10.0.0.1:5000"));
        assert_eq!(table.len(), 1);

        let entry = table.claim("094906").unwrap();
        assert_eq!(entry.connection_id, "10.0.0.1:5000");
        assert!(table.is_empty());
        assert!(table.claim("094906").is_none());
    }

    #[test]
    fn insert_overwrites_on_stan_collision() {
        let table = PendingTable::new();
        table.insert("000001".to_string(), handle("10.0.0.1:5000"));
        table.insert("000001".to_string(), handle("10.0.0.2:5000"));
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.claim("000001").unwrap().connection_id,
            "10.0.0.2:5000"
        );
    }

    #[test]
    fn purge_drops_only_the_closing_connection() {
        let table = PendingTable::new();
        table.insert("000001".to_string(), handle("10.0.0.1:5000"));
        table.insert("000002".to_string(), handle("10.0.0.1:5000"));
        table.insert("000003".to_string(), handle("10.0.0.2:5000"));

        assert_eq!(table.purge_connection("10.0.0.1:5000"), 2);
        assert_eq!(table.len(), 1);
        assert!(table.claim("000003").is_some());
    }

    #[test]
    fn sweep_expires_aged_entries() {
        let table = PendingTable::new();
        table.insert("000001".to_string(), handle("10.0.0.1:5000"));
        assert_eq!(table.sweep(Duration::from_secs(60)), 0);
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(table.sweep(Duration::ZERO), 1);
        assert!(table.is_empty());
    }
}
