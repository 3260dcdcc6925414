// companion-sink-core/src/lib.rs
// ============================================================================
// Module: Companion Sink Core
// Description: Test-case payload model and case sink abstraction.
// Purpose: Provide the typed core consumed by the HTTP server crate.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Companion Sink core defines the wire payload delivered by a companion
//! browser extension ([`ProblemPayload`]) and the sink abstraction the
//! server writes joined test inputs through ([`CaseSink`]). The server crate
//! depends only on these types; the fixed output file is one sink
//! implementation among others.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod payload;
pub mod sink;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use payload::PayloadError;
pub use payload::ProblemPayload;
pub use payload::TestCase;
pub use sink::CaseSink;
pub use sink::FileCaseSink;
pub use sink::MemoryCaseSink;
pub use sink::SinkError;
