//! The external dispatch boundary.
//!
//! The orchestration core never invokes the external code-generation tool
//! itself; it only depends on this interface. Implementations run the tool
//! (subprocess, HTTP, local fallback) and hand raw text back, which the
//! caller feeds through the output protocol parser. Retries, backoff, and
//! the per-stage timeout budget are the implementation's responsibility.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

use crate::core::{AgentRole, PipelineStage};
use crate::errors::DispatchError;

/// One request to the external tool.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    /// The role the tool should act as.
    pub role: AgentRole,
    /// The stage being executed.
    pub stage: PipelineStage,
    /// The free-text prompt.
    pub prompt: String,
}

impl DispatchRequest {
    /// Creates a new dispatch request.
    #[must_use]
    pub fn new(role: AgentRole, stage: PipelineStage, prompt: impl Into<String>) -> Self {
        Self {
            role,
            stage,
            prompt: prompt.into(),
        }
    }
}

/// Out-of-band correlation context made available to implementations.
#[derive(Debug, Clone)]
pub struct DispatchContext {
    /// The acting role.
    pub agent_role: AgentRole,
    /// The stage being executed.
    pub pipeline_stage: PipelineStage,
    /// The feature being worked on.
    pub feature_id: Uuid,
}

/// Trait for dispatchers that invoke an external text-generation capability.
#[async_trait]
pub trait AgentDispatcher: Send + Sync {
    /// Executes the request and returns the tool's raw text output.
    ///
    /// # Errors
    ///
    /// Returns a `DispatchError` when the tool fails or cannot be invoked.
    async fn execute(
        &self,
        request: DispatchRequest,
        context: DispatchContext,
    ) -> Result<String, DispatchError>;
}

/// Scripted dispatcher for tests: replays queued responses in order.
///
/// Once the queue is exhausted it reports failure, which exercises callers'
/// error paths without a real tool.
#[derive(Debug, Default)]
pub struct MockDispatcher {
    responses: Mutex<VecDeque<String>>,
    call_count: AtomicUsize,
}

impl MockDispatcher {
    /// Creates a mock that replays the given responses.
    #[must_use]
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            call_count: AtomicUsize::new(0),
        }
    }

    /// Returns how many times `execute` was called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentDispatcher for MockDispatcher {
    async fn execute(
        &self,
        request: DispatchRequest,
        _context: DispatchContext,
    ) -> Result<String, DispatchError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.responses.lock().pop_front().ok_or_else(|| {
            DispatchError::execution_failed(request.role.to_string(), "no scripted response left")
        })
    }
}
