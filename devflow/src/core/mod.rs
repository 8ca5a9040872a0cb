//! Core domain model types for devflow.
//!
//! This module contains the fundamental types the orchestration core moves
//! around:
//! - Pipeline stage and agent role enums
//! - Versioned artifacts and their status enums
//! - Issues with the five-level severity scale
//! - Per-stage results with metrics
//! - The feature aggregate

mod artifact;
mod feature;
mod issue;
mod result;
mod stage;

pub use artifact::{Artifact, ArtifactStatus, ArtifactType, ReviewStatus};
pub use feature::{Feature, FeaturePriority, FeatureStatus};
pub use issue::{Issue, IssueSeverity, IssueStatus, IssueType};
pub use result::{StageMetrics, StageResult, StageResultStatus};
pub use stage::{AgentRole, PipelineStage};
