//! Per-stage execution results and metrics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::artifact::Artifact;
use super::issue::{Issue, IssueSeverity};
use super::stage::PipelineStage;
use crate::utils::now_utc;

/// The execution status of a single stage run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageResultStatus {
    /// Stage has not begun.
    NotStarted,
    /// Stage is executing.
    InProgress,
    /// Stage output is waiting for a reviewer.
    AwaitingReview,
    /// Reviewer sent the output back for rework.
    RevisionNeeded,
    /// Reviewer accepted the output.
    Approved,
    /// Stage was marked complete without producing its artifacts.
    Skipped,
    /// Stage failed.
    Failed,
}

impl Default for StageResultStatus {
    fn default() -> Self {
        Self::NotStarted
    }
}

impl fmt::Display for StageResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::AwaitingReview => "awaiting_review",
            Self::RevisionNeeded => "revision_needed",
            Self::Approved => "approved",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl StageResultStatus {
    /// Returns true if the status is final for this run.
    ///
    /// Terminal results are immutable except for issue-resolution updates.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Skipped | Self::Failed)
    }

    /// Returns true if the status lets the feature move on.
    #[must_use]
    pub fn permits_transition(self) -> bool {
        matches!(self, Self::Approved | Self::Skipped)
    }
}

/// Execution metrics accumulated while a stage runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageMetrics {
    /// Total tokens consumed by agent calls.
    pub tokens_used: u64,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// How many times the stage was retried.
    pub retries: u32,
    /// Number of artifacts produced.
    pub artifact_count: usize,
    /// Number of issues raised.
    pub issue_count: usize,
}

impl StageMetrics {
    /// Adds tokens to the running total.
    pub fn add_tokens(&mut self, tokens: u64) {
        self.tokens_used += tokens;
    }

    /// Records one retry.
    pub fn record_retry(&mut self) {
        self.retries += 1;
    }
}

/// The result of running one pipeline stage for one feature.
///
/// Created when the stage begins execution; mutated by the stage's own
/// execution and by review actions; frozen once the status is terminal,
/// apart from issue-resolution updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    /// The stage this result belongs to.
    pub stage: PipelineStage,
    /// Current status of the run.
    pub status: StageResultStatus,
    /// When execution began.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// When the run reached a terminal status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Artifacts produced during this run.
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    /// Issues raised during this run.
    #[serde(default)]
    pub issues: Vec<Issue>,
    /// Accumulated metrics.
    #[serde(default)]
    pub metrics: StageMetrics,
}

impl StageResult {
    /// Creates a result for a stage that is beginning execution.
    #[must_use]
    pub fn started(stage: PipelineStage) -> Self {
        Self {
            stage,
            status: StageResultStatus::InProgress,
            started_at: Some(now_utc()),
            completed_at: None,
            artifacts: Vec::new(),
            issues: Vec::new(),
            metrics: StageMetrics::default(),
        }
    }

    /// Attaches a produced artifact.
    pub fn add_artifact(&mut self, artifact: Artifact) {
        self.artifacts.push(artifact);
        self.metrics.artifact_count = self.artifacts.len();
    }

    /// Attaches a raised issue.
    pub fn add_issue(&mut self, issue: Issue) {
        self.issues.push(issue);
        self.metrics.issue_count = self.issues.len();
    }

    /// Moves the run into review.
    pub fn await_review(&mut self) {
        self.status = StageResultStatus::AwaitingReview;
    }

    /// Reviewer sent the run back for rework.
    pub fn request_revision(&mut self) {
        self.status = StageResultStatus::RevisionNeeded;
    }

    /// Reviewer accepted the run.
    pub fn approve(&mut self) {
        self.status = StageResultStatus::Approved;
        self.completed_at = Some(now_utc());
    }

    /// Marks the run complete without its artifacts.
    pub fn mark_skipped(&mut self) {
        self.status = StageResultStatus::Skipped;
        self.completed_at = Some(now_utc());
    }

    /// Marks the run failed.
    pub fn mark_failed(&mut self) {
        self.status = StageResultStatus::Failed;
        self.completed_at = Some(now_utc());
    }

    /// Returns the issues at `Critical` severity.
    #[must_use]
    pub fn critical_issues(&self) -> Vec<&Issue> {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Critical)
            .collect()
    }

    /// Returns the still-open issues at `High` severity.
    #[must_use]
    pub fn open_high_issues(&self) -> Vec<&Issue> {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::High && i.is_open())
            .collect()
    }

    /// Returns the wall-clock duration so far, in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> Option<u64> {
        let started = self.started_at?;
        let ended = self.completed_at.unwrap_or_else(now_utc);
        u64::try_from((ended - started).num_milliseconds().max(0)).ok()
    }
}
