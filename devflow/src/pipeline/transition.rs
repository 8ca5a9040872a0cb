//! The transition engine: decides whether a feature may advance.
//!
//! A blocked transition is a representable, successful result, never an
//! error. Even an unrecognized stage identifier is reported as a blocker so
//! callers can render every denial uniformly.

use std::collections::HashMap;
use std::str::FromStr;
use tracing::warn;

use crate::core::{ArtifactType, Feature, PipelineStage, StageResult};
use crate::store::ArtifactStore;

use super::registry::{GateCondition, StageRegistry};

/// The outcome of evaluating one gate validator.
#[derive(Debug, Clone, PartialEq, Eq)]
enum GateOutcome {
    /// The condition holds.
    Pass,
    /// The condition failed, with a human-readable reason.
    Fail(String),
    /// The validator kind is not registered; treated as passing.
    Unrecognized,
}

/// A gate validator: checks one condition against a stage result and the
/// shared artifact store.
type GateValidator = fn(arg: Option<&str>, result: &StageResult, store: &ArtifactStore) -> GateOutcome;

/// The allow/block decision for one requested transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionDecision {
    /// True when no blockers were found.
    pub allowed: bool,
    /// The stage the feature would advance to, when one exists.
    pub next_stage: Option<PipelineStage>,
    /// Failed required checks; any entry denies the transition.
    pub blockers: Vec<String>,
    /// Advisory findings; never prevent forward progress.
    pub warnings: Vec<String>,
}

impl TransitionDecision {
    fn denied(blocker: impl Into<String>) -> Self {
        Self {
            allowed: false,
            next_stage: None,
            blockers: vec![blocker.into()],
            warnings: Vec::new(),
        }
    }
}

fn validate_has_artifact(
    arg: Option<&str>,
    result: &StageResult,
    store: &ArtifactStore,
) -> GateOutcome {
    let Some(raw) = arg else {
        return GateOutcome::Fail("hasArtifact requires an artifact type argument".to_string());
    };
    let Ok(artifact_type) = ArtifactType::from_str(raw) else {
        return GateOutcome::Fail(format!("hasArtifact argument '{raw}' is not an artifact type"));
    };

    let in_result = result
        .artifacts
        .iter()
        .any(|a| a.artifact_type == artifact_type);
    if in_result || store.has_artifact_of_type(artifact_type) {
        GateOutcome::Pass
    } else {
        GateOutcome::Fail(format!("no artifact of type '{artifact_type}' exists"))
    }
}

fn validate_no_critical_issues(
    _arg: Option<&str>,
    result: &StageResult,
    _store: &ArtifactStore,
) -> GateOutcome {
    let critical = result.critical_issues();
    if critical.is_empty() {
        GateOutcome::Pass
    } else {
        let titles: Vec<&str> = critical.iter().map(|i| i.title.as_str()).collect();
        GateOutcome::Fail(format!("critical issues present: {}", titles.join(", ")))
    }
}

fn validate_no_high_issues(
    _arg: Option<&str>,
    result: &StageResult,
    _store: &ArtifactStore,
) -> GateOutcome {
    use crate::core::IssueSeverity;
    let offending: Vec<&str> = result
        .issues
        .iter()
        .filter(|i| i.severity >= IssueSeverity::High)
        .map(|i| i.title.as_str())
        .collect();
    if offending.is_empty() {
        GateOutcome::Pass
    } else {
        GateOutcome::Fail(format!(
            "high or critical issues present: {}",
            offending.join(", ")
        ))
    }
}

/// Evaluates whether a feature may advance from its current stage.
///
/// Reads the stage registry for the stage's contract and the artifact store
/// for evidence of produced work; pure, non-blocking computation over
/// in-memory data.
#[derive(Debug)]
pub struct TransitionEngine {
    registry: StageRegistry,
    validators: HashMap<&'static str, GateValidator>,
}

impl TransitionEngine {
    /// Creates an engine over the given registry.
    ///
    /// The gate validator table is fixed at construction; adding a kind is a
    /// single registration here.
    #[must_use]
    pub fn new(registry: StageRegistry) -> Self {
        let mut validators: HashMap<&'static str, GateValidator> = HashMap::new();
        validators.insert("hasArtifact", validate_has_artifact);
        validators.insert("noCriticalIssues", validate_no_critical_issues);
        validators.insert("noHighIssues", validate_no_high_issues);
        Self {
            registry,
            validators,
        }
    }

    /// The registry this engine evaluates against.
    #[must_use]
    pub fn registry(&self) -> &StageRegistry {
        &self.registry
    }

    /// Evaluates a transition for a raw stage identifier.
    ///
    /// An identifier that does not name a pipeline stage yields a denied
    /// decision with a single `Unknown stage` blocker, not an error.
    #[must_use]
    pub fn evaluate_stage_id(
        &self,
        feature: &Feature,
        stage_id: &str,
        store: &ArtifactStore,
    ) -> TransitionDecision {
        match PipelineStage::from_str(stage_id) {
            Ok(stage) => self.evaluate(feature, stage, store),
            Err(e) => TransitionDecision::denied(e.to_string()),
        }
    }

    /// Evaluates whether `feature` may advance from `from_stage`.
    #[must_use]
    pub fn evaluate(
        &self,
        feature: &Feature,
        from_stage: PipelineStage,
        store: &ArtifactStore,
    ) -> TransitionDecision {
        let Some(config) = self.registry.config_for(from_stage) else {
            return TransitionDecision::denied(format!(
                "No configuration registered for stage '{from_stage}'"
            ));
        };

        let mut blockers = Vec::new();
        let mut warnings = Vec::new();

        let result = feature.stage_result(from_stage);
        match result {
            None => {
                blockers.push(format!("Stage '{from_stage}' has not been executed yet"));
            }
            Some(result) if !result.status.permits_transition() => {
                blockers.push(format!(
                    "Stage '{from_stage}' must be approved or skipped before advancing \
                     (current status: {})",
                    result.status
                ));
            }
            Some(_) => {}
        }

        if let Some(result) = result {
            for condition in &config.gate_conditions {
                self.evaluate_gate(condition, result, store, &mut blockers, &mut warnings);
            }

            for issue in result.critical_issues() {
                blockers.push(format!("Critical issue open: {}", issue.title));
            }
            for issue in result.open_high_issues() {
                warnings.push(format!("Open high-severity issue: {}", issue.title));
            }
        }

        for artifact_type in &config.produced_artifact_types {
            if !store.has_artifact_of_type(*artifact_type) {
                warnings.push(format!(
                    "Expected artifact of type '{artifact_type}' has not been stored"
                ));
            }
        }

        TransitionDecision {
            allowed: blockers.is_empty(),
            next_stage: self.registry.next(from_stage),
            blockers,
            warnings,
        }
    }

    fn evaluate_gate(
        &self,
        condition: &GateCondition,
        result: &StageResult,
        store: &ArtifactStore,
        blockers: &mut Vec<String>,
        warnings: &mut Vec<String>,
    ) {
        let (kind, arg) = condition.validator_parts();
        let outcome = match self.validators.get(kind) {
            Some(validator) => validator(arg, result, store),
            None => GateOutcome::Unrecognized,
        };

        match outcome {
            GateOutcome::Pass => {}
            GateOutcome::Fail(reason) => {
                let message = format!("Gate '{}' failed: {reason}", condition.name);
                if condition.required {
                    blockers.push(message);
                } else {
                    warnings.push(message);
                }
            }
            GateOutcome::Unrecognized => {
                warn!(
                    gate = %condition.name,
                    validator = %condition.validator,
                    "Unrecognized gate validator kind; treating as passing"
                );
                warnings.push(format!(
                    "Gate '{}' uses unrecognized validator kind '{kind}'; treated as passing",
                    condition.name
                ));
            }
        }
    }

    /// Returns whether a stage may be marked complete without its artifacts.
    ///
    /// Unregistered stages are not skippable.
    #[must_use]
    pub fn can_skip(&self, stage: PipelineStage) -> bool {
        self.registry
            .config_for(stage)
            .is_some_and(|c| c.can_be_skipped)
    }

    /// Returns the artifact types a stage expects before starting.
    ///
    /// Empty for unregistered stages.
    #[must_use]
    pub fn required_artifact_types(&self, stage: PipelineStage) -> Vec<ArtifactType> {
        self.registry
            .config_for(stage)
            .map(|c| c.required_artifact_types.clone())
            .unwrap_or_default()
    }

    /// Returns the required artifact types with no matching artifact
    /// currently in the store.
    #[must_use]
    pub fn missing_artifact_types(
        &self,
        stage: PipelineStage,
        store: &ArtifactStore,
    ) -> Vec<ArtifactType> {
        self.required_artifact_types(stage)
            .into_iter()
            .filter(|t| !store.has_artifact_of_type(*t))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        AgentRole, Artifact, Issue, IssueSeverity, IssueType,
    };
    use pretty_assertions::assert_eq;

    fn engine() -> TransitionEngine {
        TransitionEngine::new(StageRegistry::standard())
    }

    fn empty_store() -> (tempfile::TempDir, ArtifactStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        (dir, store)
    }

    fn approved_requirements_feature(store: &mut ArtifactStore) -> Feature {
        let mut feature = Feature::new("checkout", "One-click checkout");
        let result = feature.begin_current_stage();

        let reqs = Artifact::new(
            ArtifactType::RequirementsDoc,
            "checkout-reqs",
            AgentRole::ProductManager,
            "The checkout flow shall...",
        );
        let stories = Artifact::new(
            ArtifactType::UserStories,
            "checkout-stories",
            AgentRole::ProductManager,
            "As a shopper...",
        );
        result.add_artifact(reqs.clone());
        result.add_artifact(stories.clone());
        result.approve();

        store.store(reqs).unwrap();
        store.store(stories).unwrap();
        feature
    }

    #[test]
    fn test_unknown_stage_id_is_denied_not_an_error() {
        let (_dir, store) = empty_store();
        let feature = Feature::new("checkout", "");
        let decision = engine().evaluate_stage_id(&feature, "nonexistent_stage", &store);

        assert!(!decision.allowed);
        assert_eq!(decision.next_stage, None);
        assert!(decision.blockers[0].contains("Unknown stage"));
    }

    #[test]
    fn test_unexecuted_stage_blocks() {
        let (_dir, store) = empty_store();
        let feature = Feature::new("checkout", "");
        let decision = engine().evaluate(&feature, PipelineStage::RequirementsGathering, &store);

        assert!(!decision.allowed);
        assert!(decision
            .blockers
            .iter()
            .any(|b| b.contains("not been executed")));
    }

    #[test]
    fn test_in_progress_stage_blocks_with_status_message() {
        let (_dir, store) = empty_store();
        let mut feature = Feature::new("checkout", "");
        feature.begin_current_stage();

        let decision = engine().evaluate(&feature, PipelineStage::RequirementsGathering, &store);
        assert!(!decision.allowed);
        assert!(decision
            .blockers
            .iter()
            .any(|b| b.contains("approved or skipped") && b.contains("in_progress")));
    }

    #[test]
    fn test_approved_stage_with_artifacts_allows() {
        let (_dir, mut store) = empty_store();
        let feature = approved_requirements_feature(&mut store);

        let decision = engine().evaluate(&feature, PipelineStage::RequirementsGathering, &store);
        assert!(decision.allowed, "blockers: {:?}", decision.blockers);
        assert_eq!(decision.next_stage, Some(PipelineStage::ArchitectureDesign));
        assert_eq!(decision.blockers, Vec::<String>::new());
    }

    #[test]
    fn test_has_artifact_gate_blocks_when_missing_everywhere() {
        let (_dir, store) = empty_store();
        let mut feature = Feature::new("checkout", "");
        feature.begin_current_stage().approve();

        let decision = engine().evaluate(&feature, PipelineStage::RequirementsGathering, &store);
        assert!(!decision.allowed);
        assert!(decision
            .blockers
            .iter()
            .any(|b| b.contains("requirements_doc")));
    }

    #[test]
    fn test_has_artifact_gate_satisfied_by_stage_result_alone() {
        let (_dir, store) = empty_store();
        let mut feature = Feature::new("checkout", "");
        let result = feature.begin_current_stage();
        result.add_artifact(Artifact::new(
            ArtifactType::RequirementsDoc,
            "checkout-reqs",
            AgentRole::ProductManager,
            "The checkout flow shall...",
        ));
        result.approve();

        let decision = engine().evaluate(&feature, PipelineStage::RequirementsGathering, &store);
        // The gate passes from the attached artifact; the store absence only warns.
        assert!(decision.allowed, "blockers: {:?}", decision.blockers);
        assert!(!decision.warnings.is_empty());
    }

    #[test]
    fn test_critical_issue_always_blocks() {
        let (_dir, mut store) = empty_store();
        let mut feature = approved_requirements_feature(&mut store);
        let feature_id = feature.id;
        let result = feature
            .stage_result_mut(PipelineStage::RequirementsGathering)
            .unwrap();
        result.add_issue(Issue::new(
            feature_id,
            IssueType::DesignFlaw,
            IssueSeverity::Critical,
            "conflicting requirements",
            AgentRole::Architect,
            PipelineStage::RequirementsGathering,
        ));

        let decision = engine().evaluate(&feature, PipelineStage::RequirementsGathering, &store);
        assert!(!decision.allowed);
        assert!(decision
            .blockers
            .iter()
            .any(|b| b.contains("conflicting requirements")));
    }

    #[test]
    fn test_open_high_issue_warns_but_does_not_block() {
        let (_dir, mut store) = empty_store();
        let mut feature = approved_requirements_feature(&mut store);
        let feature_id = feature.id;
        let result = feature
            .stage_result_mut(PipelineStage::RequirementsGathering)
            .unwrap();
        result.add_issue(Issue::new(
            feature_id,
            IssueType::Bug,
            IssueSeverity::High,
            "ambiguous acceptance criteria",
            AgentRole::Architect,
            PipelineStage::RequirementsGathering,
        ));

        let decision = engine().evaluate(&feature, PipelineStage::RequirementsGathering, &store);
        assert!(decision.allowed, "blockers: {:?}", decision.blockers);
        assert!(decision
            .warnings
            .iter()
            .any(|w| w.contains("high-severity")));
    }

    #[test]
    fn test_unrecognized_validator_kind_passes_with_warning() {
        let (_dir, mut store) = empty_store();
        let mut config = StageRegistry::standard()
            .config_for(PipelineStage::RequirementsGathering)
            .unwrap()
            .clone();
        config.gate_conditions = vec![GateCondition::new(
            "future_gate",
            "A gate kind from the future",
            "quantumCheck:entangled",
            true,
        )];
        let engine = TransitionEngine::new(StageRegistry::new(vec![config]));

        let feature = approved_requirements_feature(&mut store);
        let decision = engine.evaluate(&feature, PipelineStage::RequirementsGathering, &store);

        assert!(decision.allowed);
        assert!(decision
            .warnings
            .iter()
            .any(|w| w.contains("quantumCheck") && w.contains("unrecognized")));
    }

    #[test]
    fn test_missing_produced_artifacts_only_warn() {
        let (_dir, store) = empty_store();
        let mut feature = Feature::new("checkout", "");
        let result = feature.begin_current_stage();
        result.add_artifact(Artifact::new(
            ArtifactType::RequirementsDoc,
            "checkout-reqs",
            AgentRole::ProductManager,
            "content",
        ));
        result.approve();

        let decision = engine().evaluate(&feature, PipelineStage::RequirementsGathering, &store);
        assert!(decision.allowed);
        assert!(decision
            .warnings
            .iter()
            .any(|w| w.contains("user_stories")));
    }

    #[test]
    fn test_skip_queries() {
        let engine = engine();
        assert!(engine.can_skip(PipelineStage::SecurityReview));
        assert!(!engine.can_skip(PipelineStage::Implementation));
        assert!(!engine.can_skip(PipelineStage::Completed));
    }

    #[test]
    fn test_required_and_missing_artifact_types() {
        let (_dir, mut store) = empty_store();
        let engine = engine();

        assert_eq!(
            engine.required_artifact_types(PipelineStage::ArchitectureDesign),
            vec![ArtifactType::RequirementsDoc]
        );
        assert_eq!(
            engine.required_artifact_types(PipelineStage::Completed),
            Vec::<ArtifactType>::new()
        );

        assert_eq!(
            engine.missing_artifact_types(PipelineStage::ArchitectureDesign, &store),
            vec![ArtifactType::RequirementsDoc]
        );
        store
            .store(Artifact::new(
                ArtifactType::RequirementsDoc,
                "reqs",
                AgentRole::ProductManager,
                "content",
            ))
            .unwrap();
        assert!(engine
            .missing_artifact_types(PipelineStage::ArchitectureDesign, &store)
            .is_empty());
    }

    #[test]
    fn test_unregistered_stage_has_single_blocker() {
        let (_dir, store) = empty_store();
        let engine = TransitionEngine::new(StageRegistry::new(Vec::new()));
        let feature = Feature::new("checkout", "");

        let decision = engine.evaluate(&feature, PipelineStage::Testing, &store);
        assert!(!decision.allowed);
        assert_eq!(decision.next_stage, None);
        assert_eq!(decision.blockers.len(), 1);
        assert!(decision.blockers[0].contains("testing"));
    }
}
