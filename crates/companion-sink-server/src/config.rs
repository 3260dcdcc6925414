// companion-sink-server/src/config.rs
// ============================================================================
// Module: Server Configuration
// Description: Startup parameters for the companion listener.
// Purpose: Provide validated, fail-closed server settings.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! There is no configuration file: every setting arrives from the invoking
//! command and is validated before the listener starts. Validation fails
//! closed on non-loopback binds so the helper stays local unless the caller
//! explicitly opts out.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::Ipv4Addr;
use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default listening port, matching the companion tool's default target.
pub const DEFAULT_PORT: u16 = 12345;
/// Default output file, relative to the process working directory.
pub const DEFAULT_OUTPUT_FILE: &str = "in.txt";
/// Default maximum request body size in bytes.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Startup configuration for [`crate::server::CompanionServer`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind: SocketAddr,
    /// Output file replaced on each successful request.
    pub output: PathBuf,
    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
    /// Permits binding outside the loopback range.
    pub allow_non_loopback: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            output: PathBuf::from(DEFAULT_OUTPUT_FILE),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            allow_non_loopback: false,
        }
    }
}

impl ServerConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on a non-loopback bind without the explicit
    /// override, an empty output path, or a zero body limit.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.bind.ip().is_loopback() && !self.allow_non_loopback {
            return Err(ConfigError::NonLoopbackBind(self.bind));
        }
        if self.output.as_os_str().is_empty() {
            return Err(ConfigError::EmptyOutputPath);
        }
        if self.max_body_bytes == 0 {
            return Err(ConfigError::ZeroBodyLimit);
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Bind address is outside the loopback range without the override.
    #[error("non-loopback bind {0} requires allow_non_loopback")]
    NonLoopbackBind(SocketAddr),
    /// Output path is empty.
    #[error("output path must not be empty")]
    EmptyOutputPath,
    /// Body limit is zero.
    #[error("max body bytes must be greater than zero")]
    ZeroBodyLimit,
}

// ============================================================================
// SECTION: Tests
// ============================================================================
