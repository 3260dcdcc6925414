// companion-sink-cli/src/serve_policy.rs
// ============================================================================
// Module: Serve Policy
// Description: Loopback-only bind enforcement for the serve command.
// Purpose: Keep the listener local unless the caller explicitly opts out.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! The listener exists to overwrite a file in the invoking developer's
//! working directory, so it must not be reachable from other hosts by
//! default. Non-loopback binds fail closed before startup; the override is
//! an explicit flag or its environment equivalent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;

use thiserror::Error;

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Environment override permitting non-loopback binds.
pub(crate) const ALLOW_NON_LOOPBACK_ENV: &str = "COMPANION_SINK_ALLOW_NON_LOOPBACK";

/// Outcome of the bind policy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BindOutcome {
    /// Bind stays within the loopback range.
    Loopback,
    /// Non-loopback bind explicitly permitted by the caller.
    NonLoopbackAllowed,
}

/// Bind policy errors.
#[derive(Debug, Error)]
pub(crate) enum LocalOnlyError {
    /// Non-loopback bind without the explicit override.
    #[error(
        "refusing non-loopback bind {0}; pass --allow-non-loopback or set \
         COMPANION_SINK_ALLOW_NON_LOOPBACK=1"
    )]
    NonLoopback(SocketAddr),
}

/// Resolves the override from the CLI flag and environment value.
pub(crate) fn resolve_allow_non_loopback(flag: bool, env_value: Option<&str>) -> bool {
    if flag {
        return true;
    }
    matches!(env_value.map(str::trim), Some("1" | "true"))
}

/// Enforces the loopback-only bind policy.
///
/// # Errors
///
/// Returns [`LocalOnlyError`] for a non-loopback bind without the override.
pub(crate) fn enforce_local_only(
    addr: &SocketAddr,
    allow_non_loopback: bool,
) -> Result<BindOutcome, LocalOnlyError> {
    if addr.ip().is_loopback() {
        return Ok(BindOutcome::Loopback);
    }
    if allow_non_loopback {
        return Ok(BindOutcome::NonLoopbackAllowed);
    }
    Err(LocalOnlyError::NonLoopback(*addr))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
