// companion-sink-core/src/sink.rs
// ============================================================================
// Module: Case Sink
// Description: Destination abstraction for joined test inputs.
// Purpose: Decouple request handling from the fixed output file.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! A [`CaseSink`] receives the full joined text of one request and replaces
//! whatever it held before. [`FileCaseSink`] is the production sink backing
//! the `in.txt` artifact; [`MemoryCaseSink`] records writes for tests. Sinks
//! carry last-writer-wins semantics and no history.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use thiserror::Error;

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Sink errors.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Sink I/O failure.
    #[error("sink io error at {path}: {message}")]
    Io {
        /// Path the sink was writing when the failure occurred.
        path: String,
        /// Underlying I/O error message.
        message: String,
    },
}

/// Destination for joined test inputs.
///
/// Each call replaces the sink's entire content; implementations must not
/// expose partially-written state to readers.
pub trait CaseSink: Send {
    /// Replaces the sink content with `text`.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when the sink cannot be written.
    fn write(&mut self, text: &str) -> Result<(), SinkError>;
}

// ============================================================================
// SECTION: File Sink
// ============================================================================

/// File-backed sink that fully replaces its destination on every write.
pub struct FileCaseSink {
    /// Destination path.
    path: PathBuf,
    /// Sibling staging path written before the rename.
    staging_path: PathBuf,
}

impl FileCaseSink {
    /// Creates a sink writing to `path`.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        let staging_path = staging_path_for(&path);
        Self {
            path,
            staging_path,
        }
    }

    /// Returns the destination path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CaseSink for FileCaseSink {
    fn write(&mut self, text: &str) -> Result<(), SinkError> {
        // Stage then rename: the destination is never left truncated.
        fs::write(&self.staging_path, text).map_err(|err| SinkError::Io {
            path: self.staging_path.to_string_lossy().to_string(),
            message: err.to_string(),
        })?;
        fs::rename(&self.staging_path, &self.path).map_err(|err| {
            let _ = fs::remove_file(&self.staging_path);
            SinkError::Io {
                path: self.path.to_string_lossy().to_string(),
                message: err.to_string(),
            }
        })
    }
}

/// Builds the staging path next to the destination.
fn staging_path_for(path: &Path) -> PathBuf {
    let mut staged = path.as_os_str().to_os_string();
    staged.push(".tmp");
    PathBuf::from(staged)
}

// ============================================================================
// SECTION: Memory Sink
// ============================================================================

/// In-memory sink recording every write, for test doubles.
#[derive(Debug, Default)]
pub struct MemoryCaseSink {
    /// Writes in arrival order.
    writes: Vec<String>,
}

impl MemoryCaseSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the most recent write, if any.
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.writes.last().map(String::as_str)
    }

    /// Returns all writes in arrival order.
    #[must_use]
    pub fn writes(&self) -> &[String] {
        &self.writes
    }
}

impl CaseSink for MemoryCaseSink {
    fn write(&mut self, text: &str) -> Result<(), SinkError> {
        self.writes.push(text.to_string());
        Ok(())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
