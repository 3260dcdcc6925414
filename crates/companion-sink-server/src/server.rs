// companion-sink-server/src/server.rs
// ============================================================================
// Module: Companion Server
// Description: axum HTTP listener for companion test-case payloads.
// Purpose: Accept POSTs on any path and write joined inputs through a sink.
// Dependencies: companion-sink-core, axum, tokio
// ============================================================================

//! ## Overview
//! The companion tool POSTs one JSON problem per request; the path is not
//! inspected. A request either replaces the sink's entire content with the
//! joined test inputs and returns 200 with an empty body, or fails with a
//! mapped status (400 bad payload, 413 oversized, 500 sink failure) and
//! leaves the sink untouched. Requests are served concurrently; the sink
//! mutex keeps writes whole and last-writer-wins.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use companion_sink_core::CaseSink;
use companion_sink_core::FileCaseSink;
use companion_sink_core::ProblemPayload;

use crate::audit::RequestAuditEvent;
use crate::audit::RequestAuditSink;
use crate::audit::RequestOutcome;
use crate::audit::StderrAuditSink;
use crate::config::ServerConfig;

// ============================================================================
// SECTION: Companion Server
// ============================================================================

/// Companion listener instance.
pub struct CompanionServer {
    /// Validated startup configuration.
    config: ServerConfig,
    /// Shared handler state.
    state: Arc<ServerState>,
}

impl CompanionServer {
    /// Builds a server from configuration with injected sinks.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when the configuration is invalid.
    pub fn new(
        config: ServerConfig,
        sink: Box<dyn CaseSink>,
        audit: Arc<dyn RequestAuditSink>,
    ) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let state = Arc::new(ServerState {
            sink: Mutex::new(sink),
            audit,
            max_body_bytes: config.max_body_bytes,
            output_label: config.output.display().to_string(),
        });
        Ok(Self {
            config,
            state,
        })
    }

    /// Builds a server writing to the configured output file and auditing
    /// to stderr.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when the configuration is invalid.
    pub fn from_config(config: ServerConfig) -> Result<Self, ServerError> {
        let sink = Box::new(FileCaseSink::new(config.output.clone()));
        Self::new(config, sink, Arc::new(StderrAuditSink))
    }

    /// Binds the configured address and serves requests until failure.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let bind = self.config.bind;
        let listener = tokio::net::TcpListener::bind(bind)
            .await
            .map_err(|err| ServerError::Bind(format!("{bind}: {err}")))?;
        self.serve_on(listener).await
    }

    /// Serves requests on a pre-bound listener.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when serving fails.
    pub async fn serve_on(self, listener: tokio::net::TcpListener) -> Result<(), ServerError> {
        let addr = listener.local_addr().map_err(|err| ServerError::Bind(err.to_string()))?;
        emit_stdout_line(&format!(
            "companion-sink listening on {addr}, writing to {}",
            self.state.output_label
        ));
        let app = build_router(Arc::clone(&self.state));
        axum::serve(listener, app).await.map_err(|err| ServerError::Serve(err.to_string()))
    }
}

/// Shared state for request handlers.
struct ServerState {
    /// Sink receiving joined test inputs; the mutex keeps writes whole.
    sink: Mutex<Box<dyn CaseSink>>,
    /// Audit sink for request events.
    audit: Arc<dyn RequestAuditSink>,
    /// Maximum allowed request body size.
    max_body_bytes: usize,
    /// Output destination label for diagnostics.
    output_label: String,
}

/// Builds the router accepting POST on every path.
fn build_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/", post(handle_submit))
        .route("/{*path}", post(handle_submit))
        .with_state(state)
}

// ============================================================================
// SECTION: Request Handling
// ============================================================================

/// Accepted submission summary.
struct AcceptedSubmission {
    /// Number of test cases written.
    test_count: usize,
    /// Problem title when the payload carried one.
    problem: Option<String>,
}

/// Request processing errors.
enum RequestError {
    /// Body exceeded the configured size limit.
    PayloadTooLarge,
    /// Body failed payload parsing.
    BadPayload(String),
    /// Sink write failed after a valid payload.
    Sink,
}

/// axum handler for companion POSTs.
async fn handle_submit(
    State(state): State<Arc<ServerState>>,
    bytes: Bytes,
) -> (StatusCode, String) {
    handle_submission(&state, &bytes)
}

/// Processes one submission and records its audit event.
fn handle_submission(state: &ServerState, bytes: &Bytes) -> (StatusCode, String) {
    match process_submission(state, bytes) {
        Ok(accepted) => {
            emit_stdout_line(&format!("test cases written to {}", state.output_label));
            state.audit.record(&RequestAuditEvent::new(
                RequestOutcome::Completed,
                StatusCode::OK.as_u16(),
                accepted.test_count,
                bytes.len(),
                accepted.problem,
            ));
            (StatusCode::OK, String::new())
        }
        Err(err) => {
            let (status, message) = error_response(&err);
            state.audit.record(&RequestAuditEvent::new(
                error_outcome(&err),
                status.as_u16(),
                0,
                bytes.len(),
                None,
            ));
            (status, message)
        }
    }
}

/// Parses the body and writes joined inputs through the sink.
fn process_submission(
    state: &ServerState,
    bytes: &Bytes,
) -> Result<AcceptedSubmission, RequestError> {
    if bytes.len() > state.max_body_bytes {
        return Err(RequestError::PayloadTooLarge);
    }
    let payload = ProblemPayload::from_json_slice(bytes.as_ref())
        .map_err(|err| RequestError::BadPayload(err.to_string()))?;
    let joined = payload.joined_inputs();
    write_with_blocking(state, &joined)?;
    Ok(AcceptedSubmission {
        test_count: payload.test_count(),
        problem: payload.name,
    })
}

/// Writes through the sink, shifting to a blocking context when available.
fn write_with_blocking(state: &ServerState, text: &str) -> Result<(), RequestError> {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| write_to_sink(state, text))
        }
        _ => write_to_sink(state, text),
    }
}

/// Writes through the sink under its mutex.
fn write_to_sink(state: &ServerState, text: &str) -> Result<(), RequestError> {
    let mut sink = state.sink.lock().map_err(|_| RequestError::Sink)?;
    sink.write(text).map_err(|_| RequestError::Sink)
}

/// Maps a request error to its HTTP response.
fn error_response(error: &RequestError) -> (StatusCode, String) {
    match error {
        RequestError::PayloadTooLarge => {
            (StatusCode::PAYLOAD_TOO_LARGE, "request body too large".to_string())
        }
        RequestError::BadPayload(message) => (StatusCode::BAD_REQUEST, message.clone()),
        RequestError::Sink => {
            (StatusCode::INTERNAL_SERVER_ERROR, "unable to write test inputs".to_string())
        }
    }
}

/// Maps a request error to its audit outcome.
const fn error_outcome(error: &RequestError) -> RequestOutcome {
    match error {
        RequestError::PayloadTooLarge => RequestOutcome::PayloadTooLarge,
        RequestError::BadPayload(_) => RequestOutcome::BadPayload,
        RequestError::Sink => RequestOutcome::SinkFailure,
    }
}

/// Writes a diagnostic line to stdout.
fn emit_stdout_line(message: &str) {
    let _ = writeln!(std::io::stdout(), "{message}");
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Companion server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Listener bind errors.
    #[error("bind failed: {0}")]
    Bind(String),
    /// Serving errors.
    #[error("server failed: {0}")]
    Serve(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions."
    )]

    use std::sync::Arc;
    use std::sync::Mutex;

    use axum::body::Bytes;
    use axum::http::StatusCode;
    use companion_sink_core::CaseSink;
    use companion_sink_core::MemoryCaseSink;
    use companion_sink_core::SinkError;

    use super::CompanionServer;
    use super::ServerState;
    use super::handle_submission;
    use crate::audit::RequestAuditEvent;
    use crate::audit::RequestAuditSink;
    use crate::audit::RequestOutcome;
    use crate::config::ServerConfig;

    /// Sink double sharing its recorder with the test body.
    struct SharedMemorySink {
        /// Shared recorder.
        inner: Arc<Mutex<MemoryCaseSink>>,
    }

    impl CaseSink for SharedMemorySink {
        fn write(&mut self, text: &str) -> Result<(), SinkError> {
            let mut inner = self.inner.lock().map_err(|_| SinkError::Io {
                path: "memory".to_string(),
                message: "poisoned".to_string(),
            })?;
            inner.write(text)
        }
    }

    /// Sink double that always fails.
    struct FailingSink;

    impl CaseSink for FailingSink {
        fn write(&mut self, _text: &str) -> Result<(), SinkError> {
            Err(SinkError::Io {
                path: "failing".to_string(),
                message: "disk full".to_string(),
            })
        }
    }

    /// Audit double recording every event.
    #[derive(Default)]
    struct RecordingAuditSink {
        /// Recorded events.
        events: Mutex<Vec<RequestAuditEvent>>,
    }

    impl RequestAuditSink for RecordingAuditSink {
        fn record(&self, event: &RequestAuditEvent) {
            if let Ok(mut events) = self.events.lock() {
                events.push(event.clone());
            }
        }
    }

    fn state_with_sink(
        sink: Box<dyn CaseSink>,
        audit: Arc<RecordingAuditSink>,
        max_body_bytes: usize,
    ) -> Arc<ServerState> {
        Arc::new(ServerState {
            sink: Mutex::new(sink),
            audit,
            max_body_bytes,
            output_label: "in.txt".to_string(),
        })
    }

    fn memory_state(
        max_body_bytes: usize,
    ) -> (Arc<ServerState>, Arc<Mutex<MemoryCaseSink>>, Arc<RecordingAuditSink>) {
        let recorder = Arc::new(Mutex::new(MemoryCaseSink::new()));
        let audit = Arc::new(RecordingAuditSink::default());
        let sink = Box::new(SharedMemorySink {
            inner: Arc::clone(&recorder),
        });
        let state = state_with_sink(sink, Arc::clone(&audit), max_body_bytes);
        (state, recorder, audit)
    }

    #[test]
    fn valid_batch_writes_joined_inputs() {
        let (state, recorder, audit) = memory_state(1024);
        let body = Bytes::from_static(br#"{"tests":[{"input":"1 2"},{"input":"3 4"}]}"#);
        let (status, message) = handle_submission(&state, &body);
        assert_eq!(status, StatusCode::OK);
        assert!(message.is_empty());
        let recorder = recorder.lock().expect("recorder");
        assert_eq!(recorder.last(), Some("1 2\n3 4"));
        let events = audit.events.lock().expect("events");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].outcome, RequestOutcome::Completed);
        assert_eq!(events[0].test_count, 2);
    }

    #[test]
    fn empty_batch_writes_empty_string() {
        let (state, recorder, _audit) = memory_state(1024);
        let body = Bytes::from_static(br#"{"tests":[]}"#);
        let (status, _) = handle_submission(&state, &body);
        assert_eq!(status, StatusCode::OK);
        let recorder = recorder.lock().expect("recorder");
        assert_eq!(recorder.last(), Some(""));
    }

    #[test]
    fn problem_name_lands_in_audit_event() {
        let (state, _recorder, audit) = memory_state(1024);
        let body = Bytes::from_static(br#"{"name":"B. Queue","tests":[{"input":"5"}]}"#);
        let (status, _) = handle_submission(&state, &body);
        assert_eq!(status, StatusCode::OK);
        let events = audit.events.lock().expect("events");
        assert_eq!(events[0].problem.as_deref(), Some("B. Queue"));
    }

    #[test]
    fn missing_tests_field_is_bad_payload_and_skips_sink() {
        let (state, recorder, audit) = memory_state(1024);
        let body = Bytes::from_static(br#"{"bad":"payload"}"#);
        let (status, message) = handle_submission(&state, &body);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(message.contains("invalid test payload"));
        let recorder = recorder.lock().expect("recorder");
        assert!(recorder.writes().is_empty());
        let events = audit.events.lock().expect("events");
        assert_eq!(events[0].outcome, RequestOutcome::BadPayload);
    }

    #[test]
    fn non_json_body_is_bad_payload() {
        let (state, recorder, _audit) = memory_state(1024);
        let body = Bytes::from_static(b"not json");
        let (status, _) = handle_submission(&state, &body);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(recorder.lock().expect("recorder").writes().is_empty());
    }

    #[test]
    fn oversized_body_is_rejected_before_parse() {
        let (state, recorder, audit) = memory_state(8);
        let body = Bytes::from_static(br#"{"tests":[{"input":"1"}]}"#);
        let (status, message) = handle_submission(&state, &body);
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(message, "request body too large");
        assert!(recorder.lock().expect("recorder").writes().is_empty());
        let events = audit.events.lock().expect("events");
        assert_eq!(events[0].outcome, RequestOutcome::PayloadTooLarge);
    }

    #[test]
    fn sink_failure_maps_to_internal_error() {
        let audit = Arc::new(RecordingAuditSink::default());
        let state = state_with_sink(Box::new(FailingSink), Arc::clone(&audit), 1024);
        let body = Bytes::from_static(br#"{"tests":[{"input":"1"}]}"#);
        let (status, message) = handle_submission(&state, &body);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "unable to write test inputs");
        let events = audit.events.lock().expect("events");
        assert_eq!(events[0].outcome, RequestOutcome::SinkFailure);
        assert_eq!(events[0].status, 500);
    }

    #[test]
    fn new_rejects_invalid_config() {
        let config = ServerConfig {
            max_body_bytes: 0,
            ..ServerConfig::default()
        };
        assert!(CompanionServer::from_config(config).is_err());
    }
}
