//! The feature aggregate: one unit of work moving through the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use super::result::StageResult;
use super::stage::PipelineStage;
use crate::utils::{generate_uuid, now_utc};

/// High-level status of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureStatus {
    /// Accepted but not yet started.
    Planned,
    /// Moving through pipeline stages.
    InDevelopment,
    /// Paused by a human decision.
    OnHold,
    /// Finished the pipeline.
    Completed,
    /// Abandoned after a stage failure.
    Failed,
}

impl Default for FeatureStatus {
    fn default() -> Self {
        Self::Planned
    }
}

impl fmt::Display for FeatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Planned => "planned",
            Self::InDevelopment => "in_development",
            Self::OnHold => "on_hold",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Scheduling priority of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeaturePriority {
    /// Nice to have.
    Low,
    /// Default priority.
    Medium,
    /// Important.
    High,
    /// Drop everything.
    Critical,
}

impl Default for FeaturePriority {
    fn default() -> Self {
        Self::Medium
    }
}

/// One unit of work driven through the ordered pipeline stages.
///
/// `current_stage` only advances via a successful transition evaluation.
/// There is at most one `StageResult` per stage; re-running a stage
/// overwrites its prior result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    /// Opaque unique identifier.
    pub id: Uuid,
    /// Short name.
    pub name: String,
    /// Longer description.
    #[serde(default)]
    pub description: String,
    /// The stage the feature is currently in.
    pub current_stage: PipelineStage,
    /// Results per stage, at most one each.
    #[serde(default)]
    pub stage_results: HashMap<PipelineStage, StageResult>,
    /// Ids of every artifact produced for this feature.
    #[serde(default)]
    pub artifact_ids: Vec<Uuid>,
    /// Ids of every issue raised against this feature.
    #[serde(default)]
    pub issue_ids: Vec<Uuid>,
    /// High-level status.
    #[serde(default)]
    pub status: FeatureStatus,
    /// Scheduling priority.
    #[serde(default)]
    pub priority: FeaturePriority,
    /// Free-form metadata.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
    /// When the feature was created.
    pub created_at: DateTime<Utc>,
    /// When the feature last changed.
    pub updated_at: DateTime<Utc>,
}

impl Feature {
    /// Creates a new feature at the first pipeline stage.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = now_utc();
        Self {
            id: generate_uuid(),
            name: name.into(),
            description: description.into(),
            current_stage: PipelineStage::RequirementsGathering,
            stage_results: HashMap::new(),
            artifact_ids: Vec::new(),
            issue_ids: Vec::new(),
            status: FeatureStatus::default(),
            priority: FeaturePriority::default(),
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: FeaturePriority) -> Self {
        self.priority = priority;
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Begins execution of the current stage, replacing any prior result.
    pub fn begin_current_stage(&mut self) -> &mut StageResult {
        self.status = FeatureStatus::InDevelopment;
        self.updated_at = now_utc();
        self.stage_results.remove(&self.current_stage);
        self.stage_results
            .entry(self.current_stage)
            .or_insert_with(|| StageResult::started(self.current_stage))
    }

    /// Stores a stage result, replacing any prior result for that stage.
    pub fn record_stage_result(&mut self, result: StageResult) {
        self.updated_at = now_utc();
        self.stage_results.insert(result.stage, result);
    }

    /// Returns the result for a stage, if it has run.
    #[must_use]
    pub fn stage_result(&self, stage: PipelineStage) -> Option<&StageResult> {
        self.stage_results.get(&stage)
    }

    /// Returns the mutable result for a stage, if it has run.
    pub fn stage_result_mut(&mut self, stage: PipelineStage) -> Option<&mut StageResult> {
        self.stage_results.get_mut(&stage)
    }

    /// Moves the feature to the given stage.
    ///
    /// Callers should only pass the `next_stage` of an allowed transition
    /// decision; this method does not re-check gating.
    pub fn advance_to(&mut self, stage: PipelineStage) {
        self.current_stage = stage;
        self.updated_at = now_utc();
        if stage == PipelineStage::Completed {
            self.status = FeatureStatus::Completed;
        }
    }

    /// Records that an artifact was produced for this feature.
    pub fn record_artifact(&mut self, artifact_id: Uuid) {
        self.artifact_ids.push(artifact_id);
        self.updated_at = now_utc();
    }

    /// Records that an issue was raised against this feature.
    pub fn record_issue(&mut self, issue_id: Uuid) {
        self.issue_ids.push(issue_id);
        self.updated_at = now_utc();
    }

    /// Returns true if the feature can no longer advance.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.current_stage.is_terminal()
            || matches!(self.status, FeatureStatus::Completed | FeatureStatus::Failed)
    }
}
