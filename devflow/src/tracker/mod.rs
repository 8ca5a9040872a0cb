//! Append-only development event ledger and summary rollup.
//!
//! Every tracked event is persisted as one JSON line the moment it is
//! recorded, so a crash loses at most the in-flight event. Summaries are
//! always recomputed from the full event list, never from separately
//! maintained running state, so they are consistent with the ledger at any
//! point in time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::{AgentRole, PipelineStage};
use crate::errors::DevflowError;
use crate::utils::{iso_timestamp, now_utc};

/// The kind of a tracked event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackedEventType {
    /// A feature entered the pipeline.
    FeatureStarted,
    /// A feature finished the pipeline.
    FeatureCompleted,
    /// A feature was abandoned.
    FeatureFailed,
    /// A stage began executing.
    StageStarted,
    /// A stage reached approval.
    StageCompleted,
    /// A stage failed.
    StageFailed,
    /// A stage was marked complete without its artifacts.
    StageSkipped,
    /// An artifact was written to the store.
    ArtifactCreated,
    /// An issue was raised.
    IssueDetected,
}

/// One immutable ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedEvent {
    /// The kind of event.
    pub event_type: TrackedEventType,
    /// The feature this event belongs to.
    pub feature_id: Uuid,
    /// The stage involved, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<PipelineStage>,
    /// The acting role, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_role: Option<AgentRole>,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// Tokens consumed, when known.
    #[serde(default)]
    pub tokens_used: u64,
    /// Duration in milliseconds, when known.
    #[serde(default)]
    pub duration_ms: u64,
    /// When the event occurred (ISO timestamp on the wire).
    pub timestamp: DateTime<Utc>,
}

impl TrackedEvent {
    /// Creates a new event stamped with the current time.
    #[must_use]
    pub fn new(
        event_type: TrackedEventType,
        feature_id: Uuid,
        message: impl Into<String>,
    ) -> Self {
        Self {
            event_type,
            feature_id,
            stage: None,
            agent_role: None,
            message: message.into(),
            tokens_used: 0,
            duration_ms: 0,
            timestamp: now_utc(),
        }
    }

    /// Sets the stage.
    #[must_use]
    pub fn with_stage(mut self, stage: PipelineStage) -> Self {
        self.stage = Some(stage);
        self
    }

    /// Sets the acting role.
    #[must_use]
    pub fn with_role(mut self, role: AgentRole) -> Self {
        self.agent_role = Some(role);
        self
    }

    /// Sets the token count.
    #[must_use]
    pub fn with_tokens(mut self, tokens: u64) -> Self {
        self.tokens_used = tokens;
        self
    }

    /// Sets the duration.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}

/// Per-role rollup counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleStats {
    /// Stage runs this role started.
    pub tasks: usize,
    /// Stage runs this role completed.
    pub succeeded: usize,
    /// Stage runs this role failed.
    pub failed: usize,
}

/// Per-stage rollup counts.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StageStats {
    /// How many times the stage started.
    pub runs: usize,
    /// How many of those runs failed.
    pub failures: usize,
    /// `failures / runs`, or 0 when the stage never ran.
    pub failure_rate: f64,
}

/// Rollup of the full event ledger.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DevelopmentSummary {
    /// Distinct features that entered the pipeline.
    pub features_started: usize,
    /// Distinct features that finished.
    pub features_completed: usize,
    /// Distinct features that were abandoned.
    pub features_failed: usize,
    /// Artifact-created events.
    pub total_artifacts: usize,
    /// Issue-detected events.
    pub total_issues: usize,
    /// Tokens consumed across all events.
    pub total_tokens: u64,
    /// Milliseconds of work across all events.
    pub total_duration_ms: u64,
    /// Rollup per acting role.
    pub role_stats: HashMap<AgentRole, RoleStats>,
    /// Rollup per stage.
    pub stage_stats: HashMap<PipelineStage, StageStats>,
}

/// Append-only event ledger with synchronous per-event persistence.
#[derive(Debug)]
pub struct DevelopmentTracker {
    path: PathBuf,
    events: Vec<TrackedEvent>,
}

impl DevelopmentTracker {
    /// Opens a tracker over the given ledger file, replaying any events it
    /// already holds.
    ///
    /// Corrupt lines (for example a torn final line from a crash) are
    /// skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, DevflowError> {
        let path = path.into();
        let mut events = Vec::new();

        if path.exists() {
            let contents = fs::read_to_string(&path)?;
            for (number, line) in contents.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<TrackedEvent>(line) {
                    Ok(event) => events.push(event),
                    Err(e) => {
                        warn!(
                            path = %path.display(),
                            line = number + 1,
                            error = %e,
                            "Skipping corrupt ledger line"
                        );
                    }
                }
            }
        }

        debug!(path = %path.display(), count = events.len(), "Ledger opened");
        Ok(Self { path, events })
    }

    /// Records one event, persisting it before returning.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger line cannot be written.
    pub fn record(&mut self, event: TrackedEvent) -> Result<(), DevflowError> {
        let line = serde_json::to_string(&event)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        file.sync_all()?;

        debug!(event = ?event.event_type, at = %iso_timestamp(), "Event recorded");
        self.events.push(event);
        Ok(())
    }

    /// The full event list, oldest first.
    #[must_use]
    pub fn events(&self) -> &[TrackedEvent] {
        &self.events
    }

    /// Folds the full event list into a summary.
    #[must_use]
    pub fn build_summary(&self) -> DevelopmentSummary {
        let mut summary = DevelopmentSummary::default();
        let mut started: HashSet<Uuid> = HashSet::new();
        let mut completed: HashSet<Uuid> = HashSet::new();
        let mut failed: HashSet<Uuid> = HashSet::new();

        for event in &self.events {
            summary.total_tokens += event.tokens_used;
            summary.total_duration_ms += event.duration_ms;

            match event.event_type {
                TrackedEventType::FeatureStarted => {
                    started.insert(event.feature_id);
                }
                TrackedEventType::FeatureCompleted => {
                    completed.insert(event.feature_id);
                }
                TrackedEventType::FeatureFailed => {
                    failed.insert(event.feature_id);
                }
                TrackedEventType::ArtifactCreated => summary.total_artifacts += 1,
                TrackedEventType::IssueDetected => summary.total_issues += 1,
                TrackedEventType::StageStarted
                | TrackedEventType::StageCompleted
                | TrackedEventType::StageFailed
                | TrackedEventType::StageSkipped => {}
            }

            if let Some(role) = event.agent_role {
                let stats = summary.role_stats.entry(role).or_default();
                match event.event_type {
                    TrackedEventType::StageStarted => stats.tasks += 1,
                    TrackedEventType::StageCompleted | TrackedEventType::StageSkipped => {
                        stats.succeeded += 1;
                    }
                    TrackedEventType::StageFailed => stats.failed += 1,
                    _ => {}
                }
            }

            if let Some(stage) = event.stage {
                let stats = summary.stage_stats.entry(stage).or_default();
                match event.event_type {
                    TrackedEventType::StageStarted => stats.runs += 1,
                    TrackedEventType::StageFailed => stats.failures += 1,
                    _ => {}
                }
            }
        }

        for stats in summary.stage_stats.values_mut() {
            if stats.runs > 0 {
                stats.failure_rate = stats.failures as f64 / stats.runs as f64;
            }
        }

        summary.features_started = started.len();
        summary.features_completed = completed.len();
        summary.features_failed = failed.len();
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::generate_uuid;
    use pretty_assertions::assert_eq;

    fn ledger_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("events.jsonl")
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    #[test]
    fn test_record_persists_one_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = ledger_path(&dir);
        let feature_id = generate_uuid();

        let mut tracker = DevelopmentTracker::open(&path).unwrap();
        tracker
            .record(TrackedEvent::new(
                TrackedEventType::FeatureStarted,
                feature_id,
                "checkout entered the pipeline",
            ))
            .unwrap();
        tracker
            .record(
                TrackedEvent::new(TrackedEventType::StageStarted, feature_id, "requirements")
                    .with_stage(PipelineStage::RequirementsGathering)
                    .with_role(AgentRole::ProductManager),
            )
            .unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        for line in contents.lines() {
            assert!(serde_json::from_str::<TrackedEvent>(line).is_ok());
        }
    }

    #[test]
    fn test_reopen_replays_ledger_and_summary_matches() {
        let dir = tempfile::tempdir().unwrap();
        let path = ledger_path(&dir);
        let feature_id = generate_uuid();

        let summary_before = {
            let mut tracker = DevelopmentTracker::open(&path).unwrap();
            tracker
                .record(TrackedEvent::new(
                    TrackedEventType::FeatureStarted,
                    feature_id,
                    "started",
                ))
                .unwrap();
            tracker
                .record(
                    TrackedEvent::new(TrackedEventType::ArtifactCreated, feature_id, "reqs")
                        .with_stage(PipelineStage::RequirementsGathering)
                        .with_role(AgentRole::ProductManager)
                        .with_tokens(512),
                )
                .unwrap();
            tracker.build_summary()
        };

        let reopened = DevelopmentTracker::open(&path).unwrap();
        assert_eq!(reopened.events().len(), 2);
        assert_eq!(reopened.build_summary(), summary_before);
    }

    #[test]
    fn test_corrupt_line_is_skipped() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let path = ledger_path(&dir);

        let mut tracker = DevelopmentTracker::open(&path).unwrap();
        tracker
            .record(TrackedEvent::new(
                TrackedEventType::FeatureStarted,
                generate_uuid(),
                "ok",
            ))
            .unwrap();
        // Simulate a torn write from a crash mid-append.
        let mut file = fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{\"event_type\": \"feature_st").unwrap();

        let reopened = DevelopmentTracker::open(&path).unwrap();
        assert_eq!(reopened.events().len(), 1);
    }

    #[test]
    fn test_summary_feature_counts_are_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = DevelopmentTracker::open(ledger_path(&dir)).unwrap();
        let a = generate_uuid();
        let b = generate_uuid();

        for id in [a, a, b] {
            tracker
                .record(TrackedEvent::new(TrackedEventType::FeatureStarted, id, ""))
                .unwrap();
        }
        tracker
            .record(TrackedEvent::new(TrackedEventType::FeatureCompleted, a, ""))
            .unwrap();

        let summary = tracker.build_summary();
        assert_eq!(summary.features_started, 2);
        assert_eq!(summary.features_completed, 1);
        assert_eq!(summary.features_failed, 0);
    }

    #[test]
    fn test_summary_rollups() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = DevelopmentTracker::open(ledger_path(&dir)).unwrap();
        let feature_id = generate_uuid();
        let stage = PipelineStage::Implementation;
        let role = AgentRole::Engineer;

        for _ in 0..2 {
            tracker
                .record(
                    TrackedEvent::new(TrackedEventType::StageStarted, feature_id, "")
                        .with_stage(stage)
                        .with_role(role),
                )
                .unwrap();
        }
        tracker
            .record(
                TrackedEvent::new(TrackedEventType::StageFailed, feature_id, "compile error")
                    .with_stage(stage)
                    .with_role(role)
                    .with_duration_ms(1200),
            )
            .unwrap();
        tracker
            .record(
                TrackedEvent::new(TrackedEventType::StageCompleted, feature_id, "")
                    .with_stage(stage)
                    .with_role(role)
                    .with_tokens(2048)
                    .with_duration_ms(800),
            )
            .unwrap();
        tracker
            .record(
                TrackedEvent::new(TrackedEventType::ArtifactCreated, feature_id, "code")
                    .with_stage(stage)
                    .with_role(role),
            )
            .unwrap();
        tracker
            .record(
                TrackedEvent::new(TrackedEventType::IssueDetected, feature_id, "bug")
                    .with_stage(stage)
                    .with_role(AgentRole::QaEngineer),
            )
            .unwrap();

        let summary = tracker.build_summary();
        assert_eq!(summary.total_artifacts, 1);
        assert_eq!(summary.total_issues, 1);
        assert_eq!(summary.total_tokens, 2048);
        assert_eq!(summary.total_duration_ms, 2000);

        let engineer = summary.role_stats[&role];
        assert_eq!(engineer.tasks, 2);
        assert_eq!(engineer.succeeded, 1);
        assert_eq!(engineer.failed, 1);

        let impl_stats = summary.stage_stats[&stage];
        assert_eq!(impl_stats.runs, 2);
        assert_eq!(impl_stats.failures, 1);
        assert!((impl_stats.failure_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_ledger_summary_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = DevelopmentTracker::open(ledger_path(&dir)).unwrap();
        assert_eq!(tracker.build_summary(), DevelopmentSummary::default());
    }
}
