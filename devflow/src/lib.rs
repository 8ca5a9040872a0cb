//! # Devflow
//!
//! Orchestration core for a multi-agent software development pipeline.
//!
//! Devflow models a feature's journey through an ordered sequence of
//! development stages (requirements through deployment), each owned by a
//! specialized agent role, with:
//!
//! - **Stage registry**: Static, ordered table of stage contracts — owners,
//!   required and produced artifact types, gate conditions
//! - **Transition gating**: Pure evaluation of whether a feature may advance,
//!   with blockers (deny) and warnings (advise) kept distinct
//! - **Artifact store**: Typed, versioned artifact records persisted as
//!   JSON, with identity-based supersession
//! - **Output protocol**: Tolerant parsing of marker-delimited artifact and
//!   issue blocks from raw agent text
//! - **Development tracking**: Append-only event ledger with on-demand
//!   summary rollups
//!
//! The external code-generation tool is reached only through the
//! [`dispatch::AgentDispatcher`] boundary; the core never invokes it
//! directly.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use devflow::prelude::*;
//!
//! let mut store = ArtifactStore::open("artifacts")?;
//! let engine = TransitionEngine::new(StageRegistry::standard());
//! let parser = OutputProtocolParser::new();
//!
//! let mut feature = Feature::new("checkout", "One-click checkout");
//! let parsed = parser.parse(&raw_agent_output);
//! let result = feature.begin_current_stage();
//! for draft in parsed.artifacts {
//!     let artifact = draft.into_artifact(AgentRole::ProductManager);
//!     result.add_artifact(artifact.clone());
//!     store.store(artifact)?;
//! }
//! result.approve();
//!
//! let decision = engine.evaluate(&feature, feature.current_stage, &store);
//! if decision.allowed {
//!     feature.advance_to(decision.next_stage.unwrap());
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod core;
pub mod dispatch;
pub mod errors;
pub mod pipeline;
pub mod protocol;
pub mod store;
pub mod tracker;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        AgentRole, Artifact, ArtifactStatus, ArtifactType, Feature, FeaturePriority,
        FeatureStatus, Issue, IssueSeverity, IssueStatus, IssueType, PipelineStage,
        ReviewStatus, StageMetrics, StageResult, StageResultStatus,
    };
    pub use crate::dispatch::{
        AgentDispatcher, DispatchContext, DispatchRequest, MockDispatcher,
    };
    pub use crate::errors::{
        ArtifactValidationError, DevflowError, DispatchError, UnknownStageError,
    };
    pub use crate::pipeline::{
        GateCondition, StageConfig, StageRegistry, TransitionDecision, TransitionEngine,
    };
    pub use crate::protocol::{
        ArtifactDraft, IssueDraft, OutputProtocolParser, ParsedOutput,
    };
    pub use crate::store::{ArtifactStore, StoreSummary};
    pub use crate::tracker::{
        DevelopmentSummary, DevelopmentTracker, TrackedEvent, TrackedEventType,
    };
    pub use crate::utils::{generate_uuid, iso_timestamp, now_utc};
}
