//! Versioned artifact work-products and their status enums.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::stage::AgentRole;
use crate::utils::{generate_uuid, now_utc};

/// The closed set of artifact categories the pipeline produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    /// Requirements document.
    RequirementsDoc,
    /// User stories.
    UserStories,
    /// Architecture document.
    ArchitectureDoc,
    /// Technical specification.
    TechSpec,
    /// Implementation plan.
    ImplementationPlan,
    /// Source code.
    SourceCode,
    /// Test plan.
    TestPlan,
    /// Test report.
    TestReport,
    /// Code review report.
    ReviewReport,
    /// Security review report.
    SecurityReport,
    /// End-user documentation.
    UserDocs,
    /// API documentation.
    ApiDocs,
    /// Deployment configuration.
    DeploymentConfig,
    /// Release notes.
    ReleaseNotes,
}

impl ArtifactType {
    /// The stable string identifier for this artifact type.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::RequirementsDoc => "requirements_doc",
            Self::UserStories => "user_stories",
            Self::ArchitectureDoc => "architecture_doc",
            Self::TechSpec => "tech_spec",
            Self::ImplementationPlan => "implementation_plan",
            Self::SourceCode => "source_code",
            Self::TestPlan => "test_plan",
            Self::TestReport => "test_report",
            Self::ReviewReport => "review_report",
            Self::SecurityReport => "security_report",
            Self::UserDocs => "user_docs",
            Self::ApiDocs => "api_docs",
            Self::DeploymentConfig => "deployment_config",
            Self::ReleaseNotes => "release_notes",
        }
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ArtifactType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "requirements_doc" => Ok(Self::RequirementsDoc),
            "user_stories" => Ok(Self::UserStories),
            "architecture_doc" => Ok(Self::ArchitectureDoc),
            "tech_spec" => Ok(Self::TechSpec),
            "implementation_plan" => Ok(Self::ImplementationPlan),
            "source_code" => Ok(Self::SourceCode),
            "test_plan" => Ok(Self::TestPlan),
            "test_report" => Ok(Self::TestReport),
            "review_report" => Ok(Self::ReviewReport),
            "security_report" => Ok(Self::SecurityReport),
            "user_docs" => Ok(Self::UserDocs),
            "api_docs" => Ok(Self::ApiDocs),
            "deployment_config" => Ok(Self::DeploymentConfig),
            "release_notes" => Ok(Self::ReleaseNotes),
            other => Err(format!("Unknown artifact type: {other}")),
        }
    }
}

/// Lifecycle status of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    /// Freshly produced, not yet reviewed.
    Draft,
    /// Under review.
    InReview,
    /// Review passed.
    Approved,
    /// Review failed.
    Rejected,
    /// Locked for release.
    Final,
}

impl Default for ArtifactStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl fmt::Display for ArtifactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Draft => "draft",
            Self::InReview => "in_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Final => "final",
        };
        f.write_str(s)
    }
}

/// Review state of an artifact, tracked independently of its lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    /// Not yet picked up by a reviewer.
    Pending,
    /// A reviewer is looking at it.
    InReview,
    /// Reviewer approved.
    Approved,
    /// Reviewer requested changes.
    ChangesRequested,
    /// Reviewer rejected outright.
    Rejected,
}

impl Default for ReviewStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::InReview => "in_review",
            Self::Approved => "approved",
            Self::ChangesRequested => "changes_requested",
            Self::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// A versioned, typed work-product produced during a stage.
///
/// Within one store an artifact is identified by its (name, type) pair for
/// versioning purposes: re-storing the same pair supersedes the previous
/// record at `version + 1`. Content is immutable per version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    /// Opaque unique identifier.
    pub id: Uuid,

    /// The artifact category.
    #[serde(rename = "type")]
    pub artifact_type: ArtifactType,

    /// Human-readable name; versioning key together with the type.
    pub name: String,

    /// One-line description.
    #[serde(default)]
    pub description: String,

    /// Path of the file this artifact describes, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,

    /// The role that produced this artifact.
    pub created_by: AgentRole,

    /// When the artifact was first created.
    pub created_at: DateTime<Utc>,

    /// When the artifact record was last touched.
    pub updated_at: DateTime<Utc>,

    /// Integer version, starting at 1.
    pub version: u32,

    /// Opaque text content.
    pub content: String,

    /// Free-form metadata.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,

    /// Lifecycle status.
    #[serde(default)]
    pub status: ArtifactStatus,

    /// Review state.
    #[serde(default)]
    pub review_status: ReviewStatus,
}

impl Artifact {
    /// Creates a new draft artifact at version 1.
    #[must_use]
    pub fn new(
        artifact_type: ArtifactType,
        name: impl Into<String>,
        created_by: AgentRole,
        content: impl Into<String>,
    ) -> Self {
        let now = now_utc();
        Self {
            id: generate_uuid(),
            artifact_type,
            name: name.into(),
            description: String::new(),
            file_path: None,
            created_by,
            created_at: now,
            updated_at: now,
            version: 1,
            content: content.into(),
            metadata: HashMap::new(),
            status: ArtifactStatus::default(),
            review_status: ReviewStatus::default(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the file path.
    #[must_use]
    pub fn with_file_path(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Refreshes `updated_at` to now.
    pub fn touch(&mut self) {
        self.updated_at = now_utc();
    }

    /// The versioning identity of this artifact.
    #[must_use]
    pub fn identity(&self) -> (&str, ArtifactType) {
        (self.name.as_str(), self.artifact_type)
    }
}
