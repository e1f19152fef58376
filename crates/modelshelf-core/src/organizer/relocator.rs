//! Relocation of staged files into the bucket tree.

use super::{path_key, stage_entry, Organizer};
use crate::catalog::UNKNOWN_CREATOR;
use crate::error::{OrganizerError, Result};
use crate::hashing::compute_sha256_async;
use crate::registry::{HashLookup, ModelRegistry};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// What happened to a staged file in the relocate phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelocateOutcome {
    /// Identical content is already cataloged; the file stays in staging.
    Duplicate { existing_path: String },
    /// Moved into the tree and cataloged with an entry.
    Relocated { target: PathBuf, entry_id: i64 },
    /// Unknown to the registry; moved into the uncertain bucket.
    Quarantined { target: PathBuf },
    /// Something already occupies the target; nothing was changed.
    TargetExists { target: PathBuf },
    /// The registry type has no bucket; nothing was changed.
    UnmappedType { model_type: String },
}

/// Registry-derived identity of a staged file.
struct Identity {
    model_type: String,
    base_model: String,
    creator: String,
}

impl<R: ModelRegistry> Organizer<R> {
    /// Identify a staged file, move it to its canonical path and catalog it.
    ///
    /// The catalog writes are staged before the move and committed after it.
    /// A failed move rolls them back; a failed commit moves the file back to
    /// `path` before the error is returned.
    pub async fn relocate_file(&mut self, path: &Path) -> Result<RelocateOutcome> {
        info!("{}", path.display());
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| OrganizerError::InvalidPath(path.to_path_buf()))?
            .to_string();

        let hash = compute_sha256_async(path).await?;
        if let Some(existing) = self.store.find_by_hash(&hash)? {
            info!("Duplicate of {}, leaving {} in place", existing.path, path.display());
            return Ok(RelocateOutcome::Duplicate {
                existing_path: existing.path,
            });
        }

        let (target, identity) = match self.registry.lookup_by_hash(&hash).await? {
            HashLookup::NotFound => (self.layout.uncertain_path(&file_name), None),
            HashLookup::Found(version) => {
                let details = self.registry.lookup_by_id(version.model_id).await?;
                let model_type = version.model.model_type.clone();

                let Some(bucket) = self.layout.directory_for_type(&model_type) else {
                    warn!(
                        "Leaving {} in place: no directory for type {:?}",
                        path.display(),
                        model_type
                    );
                    return Ok(RelocateOutcome::UnmappedType { model_type });
                };

                let base_model = version
                    .base_model
                    .clone()
                    .or_else(|| details.base_model_of(version.id).map(str::to_string))
                    .filter(|name| !name.trim().is_empty())
                    .ok_or_else(|| OrganizerError::Registry {
                        message: format!(
                            "Model version {} (model {}) has no base model",
                            version.id, version.model_id
                        ),
                        status_code: None,
                    })?;
                let creator = details
                    .creator_name()
                    .unwrap_or(UNKNOWN_CREATOR)
                    .to_string();

                let target = self
                    .layout
                    .target_path(bucket, &base_model, &creator, &file_name);
                let identity = Identity {
                    model_type,
                    base_model,
                    creator,
                };
                (target, Some(identity))
            }
        };
        let target_key = path_key(&target)?;

        // A target taken on disk or in the catalog is never overwritten.
        if target.symlink_metadata().is_ok() || self.store.exists_by_path(&target_key)? {
            warn!(
                "Leaving {} in place: {} already exists",
                path.display(),
                target.display()
            );
            return Ok(RelocateOutcome::TargetExists { target });
        }

        let tx = self.store.transaction()?;
        let entry_id = identity
            .as_ref()
            .map(|id| stage_entry(&tx, &id.model_type, &id.base_model, &id.creator))
            .transpose()?;
        tx.link_model(&target_key, &hash, entry_id)?;

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| OrganizerError::io_with_path(e, parent))?;
        }
        std::fs::rename(path, &target).map_err(|e| OrganizerError::io_with_path(e, path))?;

        if let Err(commit_error) = tx.commit() {
            if let Err(undo_error) = std::fs::rename(&target, path) {
                error!(
                    "Catalog commit failed and {} could not be moved back to {}: {}",
                    target.display(),
                    path.display(),
                    undo_error
                );
            }
            return Err(commit_error);
        }
        info!("    Moved into {}", target.display());

        Ok(match entry_id {
            Some(entry_id) => RelocateOutcome::Relocated { target, entry_id },
            None => RelocateOutcome::Quarantined { target },
        })
    }
}
