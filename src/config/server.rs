//! Listener configuration.

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::options::PumpConfig;

// ============================================================================
// Constants
// ============================================================================

/// Default listen address.
pub const DEFAULT_BIND_ADDR: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000);

/// Default request path that is upgraded to a WebSocket session.
pub const DEFAULT_PATH: &str = "/ws";

// ============================================================================
// ServerConfig
// ============================================================================

/// Settings for [`Server`](crate::transport::Server).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the listener binds to. Port 0 picks a random port.
    pub bind: SocketAddr,

    /// Only upgrade requests for this path are accepted.
    pub path: String,

    /// Configuration applied to every accepted session.
    pub pump: PumpConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND_ADDR,
            path: DEFAULT_PATH.to_string(),
            pump: PumpConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Creates a configuration with default path and pump settings.
    #[inline]
    #[must_use]
    pub fn new(bind: SocketAddr) -> Self {
        Self {
            bind,
            ..Self::default()
        }
    }

    /// Sets the upgrade path.
    #[inline]
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets the pump configuration.
    #[inline]
    #[must_use]
    pub fn with_pump(mut self, pump: PumpConfig) -> Self {
        self.pump = pump;
        self
    }

    /// Parses and validates a JSON document.
    ///
    /// Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the JSON is malformed or a limit is invalid.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("invalid server config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the path and the pump limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if !self.path.starts_with('/') {
            return Err(Error::config(format!(
                "path must start with '/': {:?}",
                self.path
            )));
        }
        self.pump.validate()
    }
}

// ============================================================================
// Tests
// ============================================================================
