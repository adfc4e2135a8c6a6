//! # Server Fixture Errors
//!
//! Error types shared by the fixture crates.
//!
//! - Uses `thiserror` for structured error definitions
//! - Named fields in every message so the missing resource is always shown
//! - Startup failures raised by fixture implementations are never wrapped by
//!   these types; they travel as the original error value

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// A bounded background operation did not finish before its deadline.
///
/// The operation itself keeps running; only the caller stopped waiting.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Timed out after {timeout:?} waiting for: {operation}")]
pub struct TimeoutError {
    pub operation: String,
    pub timeout: Duration
}

impl TimeoutError {
    pub fn new(operation: impl Into<String>, timeout: Duration) -> Self {
        Self {
            operation: operation.into(),
            timeout
        }
    }
}

/// Sample or test site lookup errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProjectError {
    #[error("Cannot find a sample or test site with name '{name}'.")]
    ProjectNotFound { name: String },

    #[error("Cannot find a sample or test site directory: '{}'.", dir.display())]
    DirectoryNotFound { dir: PathBuf },

    #[error("Duplicate test application metadata for project '{name}'")]
    DuplicateProject { name: String },

    #[error("Cannot locate the current executable: {reason}")]
    CurrentExe { reason: String }
}

/// Errors raised by the fixture host and the bundled fixtures
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("Invalid root uri '{uri}': {reason}")]
    InvalidRootUri { uri: String, reason: String },

    #[error("Server fixture startup panicked: {message}")]
    StartupPanicked { message: String },

    #[error("Cannot substitute remote host '{host}': {reason}")]
    InvalidRemoteHost { host: String, reason: String },

    #[error("Failed to spawn '{program}': {reason}")]
    Spawn { program: String, reason: String },

    #[error("Process '{program}' exited before announcing its address: {status}")]
    ProcessExited { program: String, status: String },

    #[error("Server failed: {reason}")]
    Server { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error)
}
