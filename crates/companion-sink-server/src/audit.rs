// companion-sink-server/src/audit.rs
// ============================================================================
// Module: Request Audit
// Description: Structured audit events for handled requests.
// Purpose: Emit one JSON line per request without hard dependencies.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every handled request produces one [`RequestAuditEvent`] routed through a
//! [`RequestAuditSink`]. The default sink writes JSON lines to stderr so the
//! companion's stdout diagnostics stay clean; tests inject the no-op sink or
//! a recording double.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;

use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Outcome classification for a handled request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestOutcome {
    /// Payload parsed and the sink was replaced.
    Completed,
    /// Body failed payload parsing.
    BadPayload,
    /// Body exceeded the configured size limit.
    PayloadTooLarge,
    /// Sink write failed after a valid payload.
    SinkFailure,
}

/// Audit event for one handled request.
#[derive(Debug, Clone, Serialize)]
pub struct RequestAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Request outcome.
    pub outcome: RequestOutcome,
    /// HTTP status returned to the client.
    pub status: u16,
    /// Number of test cases in the payload (zero when parsing failed).
    pub test_count: usize,
    /// Request body size in bytes.
    pub request_bytes: usize,
    /// Problem title when the payload carried one.
    pub problem: Option<String>,
}

impl RequestAuditEvent {
    /// Builds an event for a handled request.
    #[must_use]
    pub fn new(
        outcome: RequestOutcome,
        status: u16,
        test_count: usize,
        request_bytes: usize,
        problem: Option<String>,
    ) -> Self {
        Self {
            event: "companion_request",
            outcome,
            status,
            test_count,
            request_bytes,
            problem,
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for request events.
pub trait RequestAuditSink: Send + Sync {
    /// Records an audit event.
    fn record(&self, event: &RequestAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl RequestAuditSink for StderrAuditSink {
    fn record(&self, event: &RequestAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl RequestAuditSink for NoopAuditSink {
    fn record(&self, _event: &RequestAuditEvent) {}
}

// ============================================================================
// SECTION: Tests
// ============================================================================
