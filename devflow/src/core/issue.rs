//! Issues raised against a feature during pipeline execution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::stage::{AgentRole, PipelineStage};
use crate::utils::{generate_uuid, now_utc};

/// The category of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    /// Functional defect.
    Bug,
    /// Design-level problem.
    DesignFlaw,
    /// Security weakness.
    Security,
    /// Performance problem.
    Performance,
    /// Incomplete or missing documentation.
    Documentation,
    /// Missing or inadequate test coverage.
    TestGap,
    /// Anything that does not fit the other categories.
    Other,
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Bug => "bug",
            Self::DesignFlaw => "design_flaw",
            Self::Security => "security",
            Self::Performance => "performance",
            Self::Documentation => "documentation",
            Self::TestGap => "test_gap",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

/// The five-level severity scale, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    /// Informational only.
    Info,
    /// Minor.
    Low,
    /// Moderate.
    Medium,
    /// Serious; surfaced as a transition warning while open.
    High,
    /// Blocks stage transition outright.
    Critical,
}

impl Default for IssueSeverity {
    fn default() -> Self {
        Self::Medium
    }
}

impl fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Info => "info",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        f.write_str(s)
    }
}

impl FromStr for IssueSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(Self::Info),
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(format!("Unknown severity: {other}")),
        }
    }
}

/// Workflow status of an issue. Issues are never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    /// Newly raised.
    Open,
    /// Being worked on.
    InProgress,
    /// Fixed and verified.
    Resolved,
    /// Deliberately not fixed.
    WontFix,
    /// Postponed beyond this feature.
    Deferred,
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::WontFix => "wont_fix",
            Self::Deferred => "deferred",
        };
        f.write_str(s)
    }
}

/// A typed, severity-ranked finding raised against a feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// Opaque unique identifier.
    pub id: Uuid,
    /// The feature this issue belongs to.
    pub feature_id: Uuid,
    /// Finding category.
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    /// Severity on the five-level scale.
    pub severity: IssueSeverity,
    /// Short title.
    pub title: String,
    /// Longer description.
    #[serde(default)]
    pub description: String,
    /// The role that reported the issue.
    pub reported_by: AgentRole,
    /// Optional assignee.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<AgentRole>,
    /// The stage during which the issue was found.
    pub stage: PipelineStage,
    /// Workflow status.
    pub status: IssueStatus,
    /// When the issue was raised.
    pub created_at: DateTime<Utc>,
    /// When the issue reached `Resolved`, if it has.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    /// How the issue was resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}

impl Issue {
    /// Creates a new open issue.
    #[must_use]
    pub fn new(
        feature_id: Uuid,
        issue_type: IssueType,
        severity: IssueSeverity,
        title: impl Into<String>,
        reported_by: AgentRole,
        stage: PipelineStage,
    ) -> Self {
        Self {
            id: generate_uuid(),
            feature_id,
            issue_type,
            severity,
            title: title.into(),
            description: String::new(),
            reported_by,
            assigned_to: None,
            stage,
            status: IssueStatus::Open,
            created_at: now_utc(),
            resolved_at: None,
            resolution: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Assigns the issue to a role.
    #[must_use]
    pub fn with_assignee(mut self, role: AgentRole) -> Self {
        self.assigned_to = Some(role);
        self
    }

    /// Marks the issue as being worked on.
    pub fn start_progress(&mut self) {
        self.status = IssueStatus::InProgress;
    }

    /// Resolves the issue with the given resolution text.
    pub fn resolve(&mut self, resolution: impl Into<String>) {
        self.status = IssueStatus::Resolved;
        self.resolved_at = Some(now_utc());
        self.resolution = Some(resolution.into());
    }

    /// Closes the issue as won't-fix.
    pub fn wont_fix(&mut self, reason: impl Into<String>) {
        self.status = IssueStatus::WontFix;
        self.resolved_at = Some(now_utc());
        self.resolution = Some(reason.into());
    }

    /// Defers the issue beyond this feature.
    pub fn defer(&mut self) {
        self.status = IssueStatus::Deferred;
    }

    /// Returns true if the issue still demands attention.
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self.status, IssueStatus::Open | IssueStatus::InProgress)
    }

    /// Returns true if this issue blocks a stage transition.
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        self.severity == IssueSeverity::Critical
    }
}
