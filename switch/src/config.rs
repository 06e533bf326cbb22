//! Switch configuration.
//!
//! Layered the usual way: compiled-in defaults, then an optional TOML
//! file, then environment overrides (`HOST`, `PORT`, `ACQUIRERS`,
//! `ISSUERS`). Log verbosity is the subscriber's concern (`RUST_LOG`).

use std::env;
use std::path::{Path, PathBuf};

use npsb_protocol::WireConfig;
use serde::{Deserialize, Serialize};

use crate::{SwitchError, SwitchResult};

/// Top-level switch configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SwitchConfig {
    pub listener: ListenerConfig,
    pub routing: RoutingConfig,
    pub wire: WireConfig,
    pub correlation: CorrelationConfig,
    pub injection: InjectionConfig,
}

/// Listening socket.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8583,
        }
    }
}

impl ListenerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Known acquirer and issuer peer addresses.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub acquirers: Vec<String>,
    pub issuers: Vec<String>,
}

/// Correlation-table TTL sweep. A zero TTL disables the sweep.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorrelationConfig {
    pub sweep_interval_secs: u64,
    pub entry_ttl_secs: u64,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 30,
            entry_ttl_secs: 60,
        }
    }
}

/// Operator injection path (test affordance, not a protocol feature).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InjectionConfig {
    /// Touching this file injects one sample request; it is removed after.
    pub trigger_path: PathBuf,
    pub sample: SampleRequest,
}

impl Default for InjectionConfig {
    fn default() -> Self {
        Self {
            trigger_path: PathBuf::from("/tmp/npsb/inject.trigger"),
            sample: SampleRequest::default(),
        }
    }
}

/// Fixed fields of the synthesized sample `0100`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SampleRequest {
    pub pan: String,
    pub amount: String,
    pub rrn: String,
    pub account: String,
}

impl Default for SampleRequest {
    fn default() -> Self {
        Self {
            pan: "0000950000000000".to_string(),
            amount: "000015600000".to_string(),
            rrn: "000000009505".to_string(),
            account: "2001070006085".to_string(),
        }
    }
}

impl SwitchConfig {
    pub fn from_file(path: &Path) -> SwitchResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SwitchError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        toml::from_str(&contents).map_err(|e| {
            SwitchError::Config(format!("failed to parse {}: {e}", path.display()))
        })
    }

    /// Overlay environment variables onto this configuration.
    pub fn apply_env(&mut self) -> SwitchResult<()> {
        if let Ok(host) = env::var("HOST") {
            self.listener.host = host;
        }
        if let Ok(port) = env::var("PORT") {
            self.listener.port = port
                .parse()
                .map_err(|_| SwitchError::Config(format!("invalid PORT value {port:?}")))?;
        }
        if let Ok(hosts) = env::var("ACQUIRERS") {
            self.routing.acquirers = split_hosts(&hosts);
        }
        if let Ok(hosts) = env::var("ISSUERS") {
            self.routing.issuers = split_hosts(&hosts);
        }
        Ok(())
    }

    /// Defaults, optionally a file, then the environment.
    pub fn load(path: Option<&Path>) -> SwitchResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }
}

fn split_hosts(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|host| !host.is_empty())
        .map(str::to_string)
        .collect()
}
