// companion-sink-core/src/payload.rs
// ============================================================================
// Module: Companion Payload
// Description: Typed model for the companion tool's POST body.
// Purpose: Parse test-case batches and join their inputs for the sink.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The companion tool POSTs one JSON object per problem. Only the `tests`
//! sequence is load-bearing; `name` and per-case `output` are carried by the
//! wire format and captured for diagnostics, and every other field is
//! ignored. Parsing is strict about the required fields: a body without
//! `tests`, or a test case without `input`, is a [`PayloadError`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Types
// ============================================================================

/// One test case delivered by the companion tool.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TestCase {
    /// Input text for the downstream testing process.
    pub input: String,
    /// Expected output, present in the wire format but never written.
    #[serde(default)]
    pub output: Option<String>,
}

/// The companion tool's POST body for a single problem.
///
/// # Invariants
/// - `tests` preserves the order in which cases were received.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProblemPayload {
    /// Problem title, used only in diagnostics.
    #[serde(default)]
    pub name: Option<String>,
    /// Ordered test cases for the problem.
    pub tests: Vec<TestCase>,
}

/// Payload parsing errors.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// Body is not UTF-8 JSON matching the payload shape.
    #[error("invalid test payload: {0}")]
    Parse(String),
}

// ============================================================================
// SECTION: Parsing and Rendering
// ============================================================================

impl ProblemPayload {
    /// Parses a payload from raw request-body bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError`] when the bytes are not UTF-8 JSON, the
    /// `tests` field is missing or not a sequence, or a case lacks `input`.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, PayloadError> {
        serde_json::from_slice(bytes).map_err(|err| PayloadError::Parse(err.to_string()))
    }

    /// Joins the `input` fields with newlines, in received order.
    ///
    /// An empty batch yields the empty string; joining adds no trailing
    /// newline.
    #[must_use]
    pub fn joined_inputs(&self) -> String {
        self.tests.iter().map(|case| case.input.as_str()).collect::<Vec<_>>().join("\n")
    }

    /// Returns the number of test cases in the batch.
    #[must_use]
    pub fn test_count(&self) -> usize {
        self.tests.len()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
