//! Pipeline stage and agent role enums.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::UnknownStageError;

/// One ordered phase of the development pipeline.
///
/// The order of the ten working stages is significant: a feature only ever
/// advances to the immediate successor, never skips ahead. `Completed` is a
/// terminal marker outside the working order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Requirements gathering, owned by the product manager.
    RequirementsGathering,
    /// Architecture design, owned by the architect.
    ArchitectureDesign,
    /// Implementation planning, owned by the tech lead.
    ImplementationPlanning,
    /// Implementation, owned by the engineer.
    Implementation,
    /// Code review, owned by the code reviewer.
    CodeReview,
    /// Testing, owned by the QA engineer.
    Testing,
    /// Security review, owned by the security engineer.
    SecurityReview,
    /// Documentation, owned by the technical writer.
    Documentation,
    /// Deployment preparation, owned by the devops engineer.
    DeploymentPreparation,
    /// Deployment, owned by the devops engineer.
    Deployment,
    /// Terminal marker: the feature finished the pipeline.
    Completed,
}

impl PipelineStage {
    /// The ten working stages in pipeline order (`Completed` excluded).
    pub const ORDERED: [Self; 10] = [
        Self::RequirementsGathering,
        Self::ArchitectureDesign,
        Self::ImplementationPlanning,
        Self::Implementation,
        Self::CodeReview,
        Self::Testing,
        Self::SecurityReview,
        Self::Documentation,
        Self::DeploymentPreparation,
        Self::Deployment,
    ];

    /// Returns the zero-based position within the working order.
    ///
    /// `Completed` has no position.
    #[must_use]
    pub fn position(self) -> Option<usize> {
        Self::ORDERED.iter().position(|s| *s == self)
    }

    /// Returns the immediate successor stage, or `None` for the last working
    /// stage and for `Completed`.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        let idx = self.position()?;
        Self::ORDERED.get(idx + 1).copied()
    }

    /// Returns the immediate predecessor stage, or `None` for the first
    /// working stage and for `Completed`.
    #[must_use]
    pub fn previous(self) -> Option<Self> {
        let idx = self.position()?;
        idx.checked_sub(1).and_then(|i| Self::ORDERED.get(i)).copied()
    }

    /// Returns true if no further advancement is possible from this stage.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed) || self.next().is_none()
    }

    /// The stable string identifier for this stage.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::RequirementsGathering => "requirements_gathering",
            Self::ArchitectureDesign => "architecture_design",
            Self::ImplementationPlanning => "implementation_planning",
            Self::Implementation => "implementation",
            Self::CodeReview => "code_review",
            Self::Testing => "testing",
            Self::SecurityReview => "security_review",
            Self::Documentation => "documentation",
            Self::DeploymentPreparation => "deployment_preparation",
            Self::Deployment => "deployment",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for PipelineStage {
    type Err = UnknownStageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "requirements_gathering" => Ok(Self::RequirementsGathering),
            "architecture_design" => Ok(Self::ArchitectureDesign),
            "implementation_planning" => Ok(Self::ImplementationPlanning),
            "implementation" => Ok(Self::Implementation),
            "code_review" => Ok(Self::CodeReview),
            "testing" => Ok(Self::Testing),
            "security_review" => Ok(Self::SecurityReview),
            "documentation" => Ok(Self::Documentation),
            "deployment_preparation" => Ok(Self::DeploymentPreparation),
            "deployment" => Ok(Self::Deployment),
            "completed" => Ok(Self::Completed),
            other => Err(UnknownStageError::new(other)),
        }
    }
}

/// The role that owns or supports a pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Gathers requirements and writes user stories.
    ProductManager,
    /// Designs system architecture.
    Architect,
    /// Plans implementation work.
    TechLead,
    /// Writes the code.
    Engineer,
    /// Reviews code changes.
    CodeReviewer,
    /// Writes and runs tests.
    QaEngineer,
    /// Audits for security problems.
    SecurityEngineer,
    /// Writes user and API documentation.
    TechnicalWriter,
    /// Prepares and performs deployments.
    DevopsEngineer,
}

impl AgentRole {
    /// The stable string identifier for this role.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::ProductManager => "product_manager",
            Self::Architect => "architect",
            Self::TechLead => "tech_lead",
            Self::Engineer => "engineer",
            Self::CodeReviewer => "code_reviewer",
            Self::QaEngineer => "qa_engineer",
            Self::SecurityEngineer => "security_engineer",
            Self::TechnicalWriter => "technical_writer",
            Self::DevopsEngineer => "devops_engineer",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for AgentRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "product_manager" => Ok(Self::ProductManager),
            "architect" => Ok(Self::Architect),
            "tech_lead" => Ok(Self::TechLead),
            "engineer" => Ok(Self::Engineer),
            "code_reviewer" => Ok(Self::CodeReviewer),
            "qa_engineer" => Ok(Self::QaEngineer),
            "security_engineer" => Ok(Self::SecurityEngineer),
            "technical_writer" => Ok(Self::TechnicalWriter),
            "devops_engineer" => Ok(Self::DevopsEngineer),
            other => Err(format!("Unknown agent role: {other}")),
        }
    }
}
