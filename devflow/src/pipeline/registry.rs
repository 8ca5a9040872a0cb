//! Stage configuration and the ordered stage registry.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use crate::core::{AgentRole, ArtifactType, PipelineStage};

/// A named, possibly-required check evaluated before a stage's result is
/// accepted as complete.
///
/// The `validator` field carries a `kind:argument` descriptor interpreted by
/// the transition engine (for example `hasArtifact:requirements_doc` or a
/// bare `noCriticalIssues`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateCondition {
    /// Short identifier for the condition.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Validator descriptor in the `kind:argument` mini-language.
    pub validator: String,
    /// Whether failure blocks the transition (true) or merely warns (false).
    pub required: bool,
}

impl GateCondition {
    /// Creates a new gate condition.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        validator: impl Into<String>,
        required: bool,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            validator: validator.into(),
            required,
        }
    }

    /// Splits the validator descriptor into its kind and optional argument.
    #[must_use]
    pub fn validator_parts(&self) -> (&str, Option<&str>) {
        match self.validator.split_once(':') {
            Some((kind, arg)) => (kind.trim(), Some(arg.trim())),
            None => (self.validator.trim(), None),
        }
    }
}

/// Immutable configuration for one pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    /// The stage this configuration belongs to.
    pub stage: PipelineStage,
    /// Display name for dashboards and logs.
    pub display_name: String,
    /// The role that owns the stage.
    pub owner: AgentRole,
    /// Roles assisting the owner.
    #[serde(default)]
    pub supporting_roles: Vec<AgentRole>,
    /// Roles that review the stage's output.
    #[serde(default)]
    pub reviewer_roles: Vec<AgentRole>,
    /// Artifact types expected to exist before the stage starts.
    ///
    /// The transition engine reports absences as warnings only; drivers may
    /// enforce them as hard preconditions.
    #[serde(default)]
    pub required_artifact_types: Vec<ArtifactType>,
    /// Artifact types the stage is expected to produce.
    #[serde(default)]
    pub produced_artifact_types: Vec<ArtifactType>,
    /// Whether the stage may be marked complete without its artifacts.
    ///
    /// Skippable stages are still never bypassed in sequence.
    #[serde(default)]
    pub can_be_skipped: bool,
    /// Retry budget for the external driver.
    pub max_retries: u32,
    /// Timeout budget in minutes, enforced by the external driver.
    pub timeout_minutes: u32,
    /// Gate conditions evaluated in order by the transition engine.
    #[serde(default)]
    pub gate_conditions: Vec<GateCondition>,
}

impl StageConfig {
    fn new(stage: PipelineStage, display_name: &str, owner: AgentRole) -> Self {
        Self {
            stage,
            display_name: display_name.to_string(),
            owner,
            supporting_roles: Vec::new(),
            reviewer_roles: Vec::new(),
            required_artifact_types: Vec::new(),
            produced_artifact_types: Vec::new(),
            can_be_skipped: false,
            max_retries: 3,
            timeout_minutes: 30,
            gate_conditions: Vec::new(),
        }
    }

    fn supporting(mut self, roles: &[AgentRole]) -> Self {
        self.supporting_roles = roles.to_vec();
        self
    }

    fn reviewers(mut self, roles: &[AgentRole]) -> Self {
        self.reviewer_roles = roles.to_vec();
        self
    }

    fn requires(mut self, types: &[ArtifactType]) -> Self {
        self.required_artifact_types = types.to_vec();
        self
    }

    fn produces(mut self, types: &[ArtifactType]) -> Self {
        self.produced_artifact_types = types.to_vec();
        self
    }

    fn skippable(mut self) -> Self {
        self.can_be_skipped = true;
        self
    }

    fn timeout(mut self, minutes: u32) -> Self {
        self.timeout_minutes = minutes;
        self
    }

    fn gate(mut self, condition: GateCondition) -> Self {
        self.gate_conditions.push(condition);
        self
    }
}

/// Static, ordered table of stage configurations.
///
/// Built once and injected into the transition engine; pure lookups, no
/// state, no side effects.
#[derive(Debug, Clone)]
pub struct StageRegistry {
    configs: HashMap<PipelineStage, StageConfig>,
}

impl StageRegistry {
    /// Builds a registry from explicit configurations.
    ///
    /// Later entries for the same stage replace earlier ones.
    #[must_use]
    pub fn new(configs: Vec<StageConfig>) -> Self {
        Self {
            configs: configs.into_iter().map(|c| (c.stage, c)).collect(),
        }
    }

    /// Builds the standard ten-stage development pipeline.
    #[must_use]
    pub fn standard() -> Self {
        use AgentRole as R;
        use ArtifactType as T;
        use PipelineStage as S;

        let gate = GateCondition::new;

        Self::new(vec![
            StageConfig::new(S::RequirementsGathering, "Requirements Gathering", R::ProductManager)
                .reviewers(&[R::Architect])
                .produces(&[T::RequirementsDoc, T::UserStories])
                .timeout(20)
                .gate(gate(
                    "requirements_present",
                    "A requirements document was produced",
                    "hasArtifact:requirements_doc",
                    true,
                ))
                .gate(gate(
                    "stories_present",
                    "User stories were produced",
                    "hasArtifact:user_stories",
                    false,
                ))
                .gate(gate(
                    "no_critical_issues",
                    "No critical issues remain",
                    "noCriticalIssues",
                    true,
                )),
            StageConfig::new(S::ArchitectureDesign, "Architecture Design", R::Architect)
                .supporting(&[R::TechLead])
                .reviewers(&[R::TechLead])
                .requires(&[T::RequirementsDoc])
                .produces(&[T::ArchitectureDoc, T::TechSpec])
                .timeout(30)
                .gate(gate(
                    "architecture_present",
                    "An architecture document was produced",
                    "hasArtifact:architecture_doc",
                    true,
                ))
                .gate(gate(
                    "no_critical_issues",
                    "No critical issues remain",
                    "noCriticalIssues",
                    true,
                )),
            StageConfig::new(S::ImplementationPlanning, "Implementation Planning", R::TechLead)
                .supporting(&[R::Engineer])
                .reviewers(&[R::Architect])
                .requires(&[T::ArchitectureDoc])
                .produces(&[T::ImplementationPlan])
                .timeout(20)
                .gate(gate(
                    "plan_present",
                    "An implementation plan was produced",
                    "hasArtifact:implementation_plan",
                    true,
                )),
            StageConfig::new(S::Implementation, "Implementation", R::Engineer)
                .supporting(&[R::TechLead])
                .reviewers(&[R::CodeReviewer])
                .requires(&[T::ImplementationPlan])
                .produces(&[T::SourceCode])
                .timeout(120)
                .gate(gate(
                    "code_present",
                    "Source code was produced",
                    "hasArtifact:source_code",
                    true,
                ))
                .gate(gate(
                    "no_critical_issues",
                    "No critical issues remain",
                    "noCriticalIssues",
                    true,
                )),
            StageConfig::new(S::CodeReview, "Code Review", R::CodeReviewer)
                .requires(&[T::SourceCode])
                .produces(&[T::ReviewReport])
                .timeout(45)
                .gate(gate(
                    "no_critical_issues",
                    "No critical issues remain",
                    "noCriticalIssues",
                    true,
                ))
                .gate(gate(
                    "no_high_issues",
                    "No high-severity issues remain",
                    "noHighIssues",
                    false,
                )),
            StageConfig::new(S::Testing, "Testing", R::QaEngineer)
                .supporting(&[R::Engineer])
                .requires(&[T::SourceCode])
                .produces(&[T::TestPlan, T::TestReport])
                .timeout(60)
                .gate(gate(
                    "tests_reported",
                    "A test report was produced",
                    "hasArtifact:test_report",
                    true,
                ))
                .gate(gate(
                    "no_critical_issues",
                    "No critical issues remain",
                    "noCriticalIssues",
                    true,
                )),
            StageConfig::new(S::SecurityReview, "Security Review", R::SecurityEngineer)
                .requires(&[T::SourceCode])
                .produces(&[T::SecurityReport])
                .skippable()
                .timeout(45)
                .gate(gate(
                    "no_critical_issues",
                    "No critical issues remain",
                    "noCriticalIssues",
                    true,
                ))
                .gate(gate(
                    "no_high_issues",
                    "No high-severity issues remain",
                    "noHighIssues",
                    true,
                )),
            StageConfig::new(S::Documentation, "Documentation", R::TechnicalWriter)
                .supporting(&[R::Engineer])
                .produces(&[T::UserDocs, T::ApiDocs])
                .skippable()
                .timeout(30)
                .gate(gate(
                    "docs_present",
                    "User documentation was produced",
                    "hasArtifact:user_docs",
                    false,
                )),
            StageConfig::new(S::DeploymentPreparation, "Deployment Preparation", R::DevopsEngineer)
                .supporting(&[R::Engineer])
                .requires(&[T::SourceCode])
                .produces(&[T::DeploymentConfig])
                .timeout(30)
                .gate(gate(
                    "deploy_config_present",
                    "A deployment configuration was produced",
                    "hasArtifact:deployment_config",
                    true,
                )),
            StageConfig::new(S::Deployment, "Deployment", R::DevopsEngineer)
                .requires(&[T::DeploymentConfig])
                .produces(&[T::ReleaseNotes])
                .timeout(30)
                .gate(gate(
                    "no_critical_issues",
                    "No critical issues remain",
                    "noCriticalIssues",
                    true,
                )),
        ])
    }

    /// Returns the configuration for a stage, if one is registered.
    #[must_use]
    pub fn config_for(&self, stage: PipelineStage) -> Option<&StageConfig> {
        self.configs.get(&stage)
    }

    /// Returns the configuration for a raw stage identifier, if it names a
    /// registered stage.
    #[must_use]
    pub fn config_for_id(&self, stage_id: &str) -> Option<&StageConfig> {
        let stage = PipelineStage::from_str(stage_id).ok()?;
        self.config_for(stage)
    }

    /// Returns all working stages in pipeline order.
    #[must_use]
    pub fn all_stages_in_order(&self) -> Vec<PipelineStage> {
        PipelineStage::ORDERED.to_vec()
    }

    /// Returns the immediate successor of a stage, or `None` at the end.
    #[must_use]
    pub fn next(&self, stage: PipelineStage) -> Option<PipelineStage> {
        stage.next()
    }

    /// Returns the immediate predecessor of a stage, or `None` at the start.
    #[must_use]
    pub fn previous(&self, stage: PipelineStage) -> Option<PipelineStage> {
        stage.previous()
    }

    /// Returns true if no further advancement is possible from this stage.
    #[must_use]
    pub fn is_terminal(&self, stage: PipelineStage) -> bool {
        stage.is_terminal()
    }
}

impl Default for StageRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_standard_registry_covers_all_working_stages() {
        let registry = StageRegistry::standard();
        for stage in PipelineStage::ORDERED {
            assert!(
                registry.config_for(stage).is_some(),
                "missing config for {stage}"
            );
        }
        assert!(registry.config_for(PipelineStage::Completed).is_none());
    }

    #[test]
    fn test_ordering_queries() {
        let registry = StageRegistry::standard();
        assert_eq!(
            registry.next(PipelineStage::RequirementsGathering),
            Some(PipelineStage::ArchitectureDesign)
        );
        assert_eq!(registry.next(PipelineStage::Deployment), None);
        assert_eq!(registry.previous(PipelineStage::RequirementsGathering), None);
        assert!(registry.is_terminal(PipelineStage::Completed));
        assert!(registry.is_terminal(PipelineStage::Deployment));
        assert!(!registry.is_terminal(PipelineStage::CodeReview));
    }

    #[test]
    fn test_config_for_id() {
        let registry = StageRegistry::standard();
        assert!(registry.config_for_id("testing").is_some());
        assert!(registry.config_for_id("nonexistent_stage").is_none());
    }

    #[test]
    fn test_stage_owners() {
        let registry = StageRegistry::standard();
        let config = registry
            .config_for(PipelineStage::RequirementsGathering)
            .unwrap();
        assert_eq!(config.owner, AgentRole::ProductManager);
        assert_eq!(
            config.produced_artifact_types,
            vec![ArtifactType::RequirementsDoc, ArtifactType::UserStories]
        );
    }

    #[test]
    fn test_skippable_stages() {
        let registry = StageRegistry::standard();
        assert!(registry.config_for(PipelineStage::SecurityReview).unwrap().can_be_skipped);
        assert!(registry.config_for(PipelineStage::Documentation).unwrap().can_be_skipped);
        assert!(!registry.config_for(PipelineStage::Implementation).unwrap().can_be_skipped);
    }

    #[test]
    fn test_validator_parts() {
        let with_arg = GateCondition::new("g", "", "hasArtifact:source_code", true);
        assert_eq!(with_arg.validator_parts(), ("hasArtifact", Some("source_code")));

        let bare = GateCondition::new("g", "", "noCriticalIssues", true);
        assert_eq!(bare.validator_parts(), ("noCriticalIssues", None));
    }

    #[test]
    fn test_custom_registry_replaces_duplicates() {
        let a = StageConfig::new(
            PipelineStage::Testing,
            "Testing v1",
            AgentRole::QaEngineer,
        );
        let b = StageConfig::new(
            PipelineStage::Testing,
            "Testing v2",
            AgentRole::QaEngineer,
        );
        let registry = StageRegistry::new(vec![a, b]);
        assert_eq!(
            registry.config_for(PipelineStage::Testing).unwrap().display_name,
            "Testing v2"
        );
    }
}
