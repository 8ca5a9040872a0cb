//! Error types for the devflow orchestration core.
//!
//! Expected-but-unsuccessful outcomes (blocked transitions, absent lookups,
//! dropped protocol blocks) are represented as ordinary values elsewhere in
//! the crate; the types here cover contract violations and I/O failures only.

use thiserror::Error;

/// The main error type for devflow operations.
#[derive(Debug, Error)]
pub enum DevflowError {
    /// An artifact failed validation at the store boundary.
    #[error("{0}")]
    ArtifactValidation(#[from] ArtifactValidationError),

    /// A stage identifier was not recognized.
    #[error("{0}")]
    UnknownStage(#[from] UnknownStageError),

    /// An external dispatch failed.
    #[error("{0}")]
    Dispatch(#[from] DispatchError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error raised when an artifact is rejected before persistence.
///
/// A rejected artifact is never written to the backing store and never
/// participates in versioning.
#[derive(Debug, Clone, Error)]
#[error("Invalid artifact '{name}': {reason}")]
pub struct ArtifactValidationError {
    /// Name of the offending artifact (may be empty when that is the problem).
    pub name: String,
    /// Why the artifact was rejected.
    pub reason: String,
}

impl ArtifactValidationError {
    /// Creates a new artifact validation error.
    #[must_use]
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Error raised when a raw stage identifier does not name a pipeline stage.
#[derive(Debug, Clone, Error)]
#[error("Unknown stage: {identifier}")]
pub struct UnknownStageError {
    /// The unrecognized identifier as received.
    pub identifier: String,
}

impl UnknownStageError {
    /// Creates a new unknown stage error.
    #[must_use]
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
        }
    }
}

/// Errors surfaced by the external dispatch boundary.
///
/// The core never invokes the external tool itself; implementations of the
/// dispatch trait translate their failures into this type.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// The external tool ran but reported a failure.
    #[error("Dispatch failed for role '{role}': {message}")]
    ExecutionFailed {
        /// The agent role that was dispatched.
        role: String,
        /// Diagnostic message from the tool.
        message: String,
    },

    /// The external tool could not be invoked at all.
    #[error("Dispatcher unavailable: {reason}")]
    Unavailable {
        /// Why the dispatcher could not run.
        reason: String,
    },
}

impl DispatchError {
    /// Creates an execution failed error.
    #[must_use]
    pub fn execution_failed(role: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            role: role.into(),
            message: message.into(),
        }
    }

    /// Creates an unavailable error.
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}
