//! Classification of files already placed in the bucket tree.

use super::layout::Placement;
use super::{path_key, stage_entry, Organizer};
use crate::error::Result;
use crate::hashing::compute_sha256_async;
use crate::registry::{HashLookup, ModelRegistry};
use std::path::Path;
use tracing::{debug, info, warn};

/// What happened to a file in the classify phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifyOutcome {
    /// The path is already in the catalog.
    AlreadyCataloged,
    /// Identical content is cataloged under another path; left in place.
    Duplicate { existing_path: String },
    /// Uncertain bucket: recorded with hash and path only.
    RecordedUncertain,
    Classified { entry_id: i64, model_type: String },
    /// Not recorded; the file stays as it is.
    Skipped { reason: String },
}

impl<R: ModelRegistry> Organizer<R> {
    /// Reconcile one file below a type bucket with the catalog.
    ///
    /// Registry metadata wins over the directory for the type; base model
    /// and creator always come from the directories.
    pub async fn classify_file(&mut self, path: &Path) -> Result<ClassifyOutcome> {
        info!("{}", path.display());
        let key = path_key(path)?;

        if self.store.exists_by_path(&key)? {
            debug!("Already cataloged: {}", key);
            return Ok(ClassifyOutcome::AlreadyCataloged);
        }

        // `None` marks the uncertain bucket.
        let directories = match self.layout.placement(path) {
            Placement::Uncertain => None,
            Placement::Classified {
                bucket,
                base_model,
                creator,
            } => Some((bucket, base_model, creator)),
            Placement::Misplaced { bucket } => {
                warn!("Skipping {}: not at <type>/<baseModel>/<creator>/<file>", key);
                return Ok(ClassifyOutcome::Skipped {
                    reason: format!("unexpected directory depth below {}", bucket),
                });
            }
            Placement::Staging | Placement::Outside => {
                warn!("Skipping {}: not below a type bucket", key);
                return Ok(ClassifyOutcome::Skipped {
                    reason: "not below a type bucket".to_string(),
                });
            }
        };

        let hash = compute_sha256_async(path).await?;
        if let Some(existing) = self.store.find_by_hash(&hash)? {
            info!("Duplicate of {}, leaving {} in place", existing.path, key);
            return Ok(ClassifyOutcome::Duplicate {
                existing_path: existing.path,
            });
        }

        let Some((bucket, base_model, creator)) = directories else {
            let tx = self.store.transaction()?;
            tx.link_model(&key, &hash, None)?;
            tx.commit()?;
            return Ok(ClassifyOutcome::RecordedUncertain);
        };

        let model_type = match self.registry.lookup_by_hash(&hash).await? {
            HashLookup::Found(version) => version.model.model_type,
            HashLookup::NotFound => match self.layout.type_for_directory(&bucket) {
                Some(model_type) => model_type.to_string(),
                None => {
                    warn!(
                        "Skipping {}: registry does not know it and {:?} maps to no single type",
                        key, bucket
                    );
                    return Ok(ClassifyOutcome::Skipped {
                        reason: format!("no type for directory {}", bucket),
                    });
                }
            },
        };

        let tx = self.store.transaction()?;
        let entry_id = stage_entry(&tx, &model_type, &base_model, &creator)?;
        tx.link_model(&key, &hash, Some(entry_id))?;
        tx.commit()?;

        debug!(
            "Classified {} as {} / {} / {}",
            key, model_type, base_model, creator
        );
        Ok(ClassifyOutcome::Classified {
            entry_id,
            model_type,
        })
    }
}
