//! Configuration for KVLDS
//!
//! Centralized configuration with sensible defaults.

use crate::error::{KvldsError, Result};
use crate::key::MAX_KEY_LEN;

/// Main configuration for a KVLDS codec / server instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Pool Configuration
    // -------------------------------------------------------------------------
    /// Requests that may be parsed but not yet dropped at once.
    /// Reaching this limit stalls further parsing (backpressure).
    pub request_pool_capacity: usize,

    /// Reads that may be in flight at once
    pub read_pool_capacity: usize,

    // -------------------------------------------------------------------------
    // Protocol Configuration
    // -------------------------------------------------------------------------
    /// Largest packet payload accepted by the wire transport (bytes)
    pub max_packet_size: usize,

    /// Longest key advertised in PARAMS responses
    pub key_max_len: u32,

    /// Longest value advertised in PARAMS responses
    pub value_max_len: u32,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_pool_capacity: 4096,
            read_pool_capacity: 16,
            max_packet_size: 1024 * 1024, // 1 MB
            key_max_len: MAX_KEY_LEN as u32,
            value_max_len: MAX_KEY_LEN as u32,
            listen_addr: "127.0.0.1:9741".to_string(),
            max_connections: 1024,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check that the configured values can actually be honoured
    pub fn validate(&self) -> Result<()> {
        if self.request_pool_capacity == 0 {
            return Err(KvldsError::Config(
                "request_pool_capacity must be at least 1".to_string(),
            ));
        }
        if self.read_pool_capacity == 0 {
            return Err(KvldsError::Config(
                "read_pool_capacity must be at least 1".to_string(),
            ));
        }
        if self.max_packet_size < 4 {
            return Err(KvldsError::Config(format!(
                "max_packet_size {} cannot hold a request type tag",
                self.max_packet_size
            )));
        }
        if self.key_max_len as usize > MAX_KEY_LEN || self.value_max_len as usize > MAX_KEY_LEN {
            return Err(KvldsError::Config(format!(
                "key/value limits ({}/{}) exceed the encodable maximum {}",
                self.key_max_len, self.value_max_len, MAX_KEY_LEN
            )));
        }
        if self.max_connections == 0 {
            return Err(KvldsError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the request pool capacity
    pub fn request_pool_capacity(mut self, capacity: usize) -> Self {
        self.config.request_pool_capacity = capacity;
        self
    }

    /// Set the read bookkeeping pool capacity
    pub fn read_pool_capacity(mut self, capacity: usize) -> Self {
        self.config.read_pool_capacity = capacity;
        self
    }

    /// Set the largest accepted packet payload (in bytes)
    pub fn max_packet_size(mut self, size: usize) -> Self {
        self.config.max_packet_size = size;
        self
    }

    /// Set the key length limit reported to clients
    pub fn key_max_len(mut self, len: u32) -> Self {
        self.config.key_max_len = len;
        self
    }

    /// Set the value length limit reported to clients
    pub fn value_max_len(mut self, len: u32) -> Self {
        self.config.value_max_len = len;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
