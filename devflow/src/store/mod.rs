//! Keyed, versioned, write-through artifact storage.
//!
//! Every mutation is persisted synchronously before it returns, so a freshly
//! constructed store over the same backing directory is indistinguishable in
//! content from the prior instance. The store assumes a single writer; see
//! the crate docs for the concurrency contract.

mod persistence;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

use crate::core::{AgentRole, Artifact, ArtifactStatus, ArtifactType, ReviewStatus};
use crate::errors::{ArtifactValidationError, DevflowError};
use crate::pipeline::StageConfig;

/// Aggregate counts over the stored artifacts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSummary {
    /// Total number of stored artifacts.
    pub total: usize,
    /// Artifact counts per type.
    pub counts_by_type: HashMap<ArtifactType, usize>,
    /// Artifact counts per lifecycle status.
    pub counts_by_status: HashMap<ArtifactStatus, usize>,
}

/// Directory-backed artifact store with (name, type) versioning.
///
/// Within one store an artifact is uniquely identified by its (name, type)
/// pair: storing a second artifact with the same pair supersedes the prior
/// record at `version + 1` rather than creating an independent record.
#[derive(Debug)]
pub struct ArtifactStore {
    root: PathBuf,
    artifacts: HashMap<Uuid, Artifact>,
    identity_index: HashMap<(String, ArtifactType), Uuid>,
}

impl ArtifactStore {
    /// Opens a store over the given backing directory, creating it if needed
    /// and loading all previously persisted records before accepting
    /// operations.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or read.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, DevflowError> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        let mut store = Self {
            root,
            artifacts: HashMap::new(),
            identity_index: HashMap::new(),
        };
        for artifact in persistence::load_records(&store.root)? {
            store
                .identity_index
                .insert((artifact.name.clone(), artifact.artifact_type), artifact.id);
            store.artifacts.insert(artifact.id, artifact);
        }
        debug!(
            root = %store.root.display(),
            count = store.artifacts.len(),
            "Artifact store opened"
        );
        Ok(store)
    }

    /// The backing directory of this store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn validate(artifact: &Artifact) -> Result<(), ArtifactValidationError> {
        if artifact.id.is_nil() {
            return Err(ArtifactValidationError::new(
                artifact.name.clone(),
                "artifact id is nil",
            ));
        }
        if artifact.name.trim().is_empty() {
            return Err(ArtifactValidationError::new("", "artifact name is empty"));
        }
        if artifact.content.trim().is_empty() {
            return Err(ArtifactValidationError::new(
                artifact.name.clone(),
                "artifact content is empty",
            ));
        }
        Ok(())
    }

    /// Stores an artifact, versioning by (name, type).
    ///
    /// A first store for a given (name, type) persists at version 1; a
    /// repeat store supersedes the prior record at its version + 1, keeping
    /// the original `created_at` for the stable identity. The write is
    /// durable before this returns. The replacement record is written before
    /// the prior one is deleted, and the in-memory maps change only after
    /// all I/O has succeeded, so a failed store leaves the prior version
    /// live and the versioning sequence intact.
    ///
    /// # Errors
    ///
    /// Returns `ArtifactValidation` if the artifact is malformed (it is then
    /// never written), or an I/O error if persistence fails.
    pub fn store(&mut self, mut artifact: Artifact) -> Result<Artifact, DevflowError> {
        Self::validate(&artifact).map_err(DevflowError::ArtifactValidation)?;

        let identity = (artifact.name.clone(), artifact.artifact_type);
        let prior_id = self.identity_index.get(&identity).copied();
        if let Some(prior) = prior_id.and_then(|id| self.artifacts.get(&id)) {
            artifact.version = prior.version + 1;
            artifact.created_at = prior.created_at;
            artifact.touch();
        }

        persistence::write_record(&self.root, &artifact)?;
        if let Some(prior_id) = prior_id {
            if let Err(e) = persistence::delete_record(&self.root, prior_id) {
                // Roll the fresh record back so disk keeps matching the
                // unchanged in-memory state.
                let _ = persistence::delete_record(&self.root, artifact.id);
                return Err(e);
            }
            self.artifacts.remove(&prior_id);
        }
        self.identity_index.insert(identity, artifact.id);
        self.artifacts.insert(artifact.id, artifact.clone());
        debug!(
            id = %artifact.id,
            name = %artifact.name,
            version = artifact.version,
            "Artifact stored"
        );
        Ok(artifact)
    }

    /// Returns the artifact with the given id, if present.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&Artifact> {
        self.artifacts.get(&id)
    }

    /// Returns every stored artifact, in unspecified order.
    #[must_use]
    pub fn get_all(&self) -> Vec<&Artifact> {
        self.artifacts.values().collect()
    }

    /// Returns all artifacts of the given type.
    #[must_use]
    pub fn get_by_type(&self, artifact_type: ArtifactType) -> Vec<&Artifact> {
        self.artifacts
            .values()
            .filter(|a| a.artifact_type == artifact_type)
            .collect()
    }

    /// Returns all artifacts created by the given role.
    #[must_use]
    pub fn get_by_creator(&self, role: AgentRole) -> Vec<&Artifact> {
        self.artifacts
            .values()
            .filter(|a| a.created_by == role)
            .collect()
    }

    /// Returns the artifacts whose type appears in the stage's required or
    /// produced sets.
    #[must_use]
    pub fn get_for_stage(&self, config: &StageConfig) -> Vec<&Artifact> {
        self.artifacts
            .values()
            .filter(|a| {
                config.required_artifact_types.contains(&a.artifact_type)
                    || config.produced_artifact_types.contains(&a.artifact_type)
            })
            .collect()
    }

    /// Returns the most recently updated artifact of the given type.
    #[must_use]
    pub fn get_latest_by_type(&self, artifact_type: ArtifactType) -> Option<&Artifact> {
        self.artifacts
            .values()
            .filter(|a| a.artifact_type == artifact_type)
            .max_by_key(|a| a.updated_at)
    }

    /// Returns true if at least one artifact of the given type exists.
    #[must_use]
    pub fn has_artifact_of_type(&self, artifact_type: ArtifactType) -> bool {
        self.artifacts
            .values()
            .any(|a| a.artifact_type == artifact_type)
    }

    /// Updates an artifact's lifecycle status and re-persists it.
    ///
    /// Returns false if no artifact has the given id. The record is written
    /// before the in-memory copy changes, so a failed write leaves both
    /// sides unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if re-persisting the record fails.
    pub fn update_status(&mut self, id: Uuid, status: ArtifactStatus) -> Result<bool, DevflowError> {
        let Some(artifact) = self.artifacts.get(&id) else {
            return Ok(false);
        };
        let mut updated = artifact.clone();
        updated.status = status;
        updated.touch();
        persistence::write_record(&self.root, &updated)?;
        self.artifacts.insert(id, updated);
        Ok(true)
    }

    /// Updates an artifact's review status and re-persists it.
    ///
    /// Returns false if no artifact has the given id. The record is written
    /// before the in-memory copy changes, so a failed write leaves both
    /// sides unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if re-persisting the record fails.
    pub fn update_review_status(
        &mut self,
        id: Uuid,
        status: ReviewStatus,
    ) -> Result<bool, DevflowError> {
        let Some(artifact) = self.artifacts.get(&id) else {
            return Ok(false);
        };
        let mut updated = artifact.clone();
        updated.review_status = status;
        updated.touch();
        persistence::write_record(&self.root, &updated)?;
        self.artifacts.insert(id, updated);
        Ok(true)
    }

    /// Removes the artifact with the given id, returning false if absent.
    ///
    /// The backing record is deleted before the in-memory entry, so a
    /// failed delete leaves the artifact resolvable.
    ///
    /// # Errors
    ///
    /// Returns an error if deleting the backing record fails.
    pub fn remove(&mut self, id: Uuid) -> Result<bool, DevflowError> {
        if !self.artifacts.contains_key(&id) {
            return Ok(false);
        }
        persistence::delete_record(&self.root, id)?;
        if let Some(artifact) = self.artifacts.remove(&id) {
            self.identity_index
                .remove(&(artifact.name, artifact.artifact_type));
        }
        Ok(true)
    }

    /// Removes every stored artifact and its backing records.
    ///
    /// Entries come out of the in-memory maps one at a time, each after its
    /// record delete succeeds, so an error part-way leaves the remainder
    /// resolvable.
    ///
    /// # Errors
    ///
    /// Returns an error if deleting a backing record fails.
    pub fn clear(&mut self) -> Result<(), DevflowError> {
        let ids: Vec<Uuid> = self.artifacts.keys().copied().collect();
        for id in ids {
            persistence::delete_record(&self.root, id)?;
            if let Some(artifact) = self.artifacts.remove(&id) {
                self.identity_index
                    .remove(&(artifact.name, artifact.artifact_type));
            }
        }
        Ok(())
    }

    /// Returns aggregate counts over the stored artifacts.
    #[must_use]
    pub fn summary(&self) -> StoreSummary {
        let mut summary = StoreSummary {
            total: self.artifacts.len(),
            ..StoreSummary::default()
        };
        for artifact in self.artifacts.values() {
            *summary.counts_by_type.entry(artifact.artifact_type).or_insert(0) += 1;
            *summary.counts_by_status.entry(artifact.status).or_insert(0) += 1;
        }
        summary
    }
}
