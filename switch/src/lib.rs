//! # NPSB Switch - Stateful ISO 8583 Message Routing
//!
//! Multiplexes many acquirer TCP sessions onto issuer sessions. Acquirer
//! endpoints submit `0100` financial requests; the switch records the
//! request's trace number (STAN), forwards the original frame bytes to an
//! issuer, and relays the correlated response back. Network-management
//! traffic (`08xx`) is answered locally without touching an issuer.
//!
//! ```text
//! Acquirer --> Framer --> Dispatcher --> Issuer
//!     ^                       |
//!     |                 Correlation (STAN)
//!     +--------- response ----+
//! ```
//!
//! Connection roles are derived from the peer address ([`registry`]);
//! correlation state lives in a memory-resident [`correlation::PendingTable`]
//! owned by the [`server::Switch`] aggregate and shared with per-connection
//! tasks, never a process-wide singleton.

pub mod config;
pub mod correlation;
pub mod dispatcher;
pub mod inject;
pub mod netmgmt;
pub mod registry;
pub mod server;

pub use config::SwitchConfig;
pub use server::Switch;

use thiserror::Error;

/// Switch-level errors
#[derive(Debug, Error)]
pub enum SwitchError {
    #[error("codec error: {0}")]
    Codec(#[from] npsb_protocol::CodecError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for switch operations
pub type SwitchResult<T> = std::result::Result<T, SwitchError>;
