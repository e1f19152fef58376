//! Organizer - reconciles model files on disk with the catalog.
//!
//! A run has two sequential phases:
//!
//! 1. **Classify** files already placed below a type bucket
//!    ([`Organizer::classify_file`]).
//! 2. **Relocate** files dropped directly into the model root
//!    ([`Organizer::relocate_file`]).
//!
//! Every step short-circuits on catalog existence checks, so an interrupted
//! run can simply be started again.

mod classifier;
pub mod layout;
mod relocator;
pub mod scan;

pub use classifier::ClassifyOutcome;
pub use layout::{ModelLayout, Placement};
pub use relocator::RelocateOutcome;

use crate::catalog::{CatalogStore, CatalogTransaction, RefCategory};
use crate::config::OrganizerConfig;
use crate::error::{OrganizerError, Result};
use crate::registry::ModelRegistry;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Which phases a run executes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    All,
    Classify,
    Relocate,
}

impl Phase {
    fn classifies(&self) -> bool {
        matches!(self, Phase::All | Phase::Classify)
    }

    fn relocates(&self) -> bool {
        matches!(self, Phase::All | Phase::Relocate)
    }
}

/// Per-outcome counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub already_cataloged: u64,
    pub duplicates: u64,
    pub classified: u64,
    pub recorded_uncertain: u64,
    pub skipped: u64,
    pub relocated: u64,
    pub quarantined: u64,
    pub target_conflicts: u64,
    pub unmapped_types: u64,
}

impl RunReport {
    pub fn record_classify(&mut self, outcome: &ClassifyOutcome) {
        match outcome {
            ClassifyOutcome::AlreadyCataloged => self.already_cataloged += 1,
            ClassifyOutcome::Duplicate { .. } => self.duplicates += 1,
            ClassifyOutcome::Classified { .. } => self.classified += 1,
            ClassifyOutcome::RecordedUncertain => self.recorded_uncertain += 1,
            ClassifyOutcome::Skipped { .. } => self.skipped += 1,
        }
    }

    pub fn record_relocate(&mut self, outcome: &RelocateOutcome) {
        match outcome {
            RelocateOutcome::Duplicate { .. } => self.duplicates += 1,
            RelocateOutcome::Relocated { .. } => self.relocated += 1,
            RelocateOutcome::Quarantined { .. } => self.quarantined += 1,
            RelocateOutcome::TargetExists { .. } => self.target_conflicts += 1,
            RelocateOutcome::UnmappedType { .. } => self.unmapped_types += 1,
        }
    }

    /// Number of files moved on disk.
    pub fn moves(&self) -> u64 {
        self.relocated + self.quarantined
    }
}

/// The reconciliation engine.
///
/// Owns the layout, the catalog and the registry; nothing is global, so
/// separate organizers (e.g. in tests) never share state.
pub struct Organizer<R> {
    layout: ModelLayout,
    store: CatalogStore,
    registry: R,
}

impl<R: ModelRegistry> Organizer<R> {
    pub fn new(config: &OrganizerConfig, store: CatalogStore, registry: R) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            layout: ModelLayout::new(config),
            store,
            registry,
        })
    }

    pub fn layout(&self) -> &ModelLayout {
        &self.layout
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Consume the organizer, returning its catalog.
    pub fn into_store(self) -> CatalogStore {
        self.store
    }

    /// Run the selected phases over the whole model root.
    pub async fn run(&mut self, phase: Phase) -> Result<RunReport> {
        let mut report = RunReport::default();

        if phase.classifies() {
            let files = scan::bucket_files(&self.layout)?;
            info!("Classify phase: {} candidate files", files.len());
            for path in files {
                let outcome = self.classify_file(&path).await?;
                report.record_classify(&outcome);
            }
        }

        if phase.relocates() {
            let files = scan::staging_files(&self.layout)?;
            info!("Relocate phase: {} candidate files", files.len());
            for path in files {
                let outcome = self.relocate_file(&path).await?;
                report.record_relocate(&outcome);
            }
        }

        Ok(report)
    }
}

/// Resolve the three references and create the entry, in that order.
fn stage_entry(
    tx: &CatalogTransaction<'_>,
    model_type: &str,
    base_model: &str,
    creator: &str,
) -> Result<i64> {
    let type_id = tx.get_or_create_ref(RefCategory::Type, model_type)?;
    let base_model_id = tx.get_or_create_ref(RefCategory::BaseModel, base_model)?;
    let creator_id = tx.get_or_create_ref(RefCategory::Creator, creator)?;
    tx.create_entry(type_id, base_model_id, Some(creator_id))
}

/// Catalog key for a path.
fn path_key(path: &Path) -> Result<String> {
    path.to_str()
        .map(str::to_string)
        .ok_or_else(|| OrganizerError::InvalidPath(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_report_counts_moves() {
        let mut report = RunReport::default();
        report.record_relocate(&RelocateOutcome::Relocated {
            target: PathBuf::from("models/vae/SDXL/null/v.safetensors"),
            entry_id: 1,
        });
        report.record_relocate(&RelocateOutcome::Quarantined {
            target: PathBuf::from("models/loras/null/x.safetensors"),
        });
        report.record_relocate(&RelocateOutcome::TargetExists {
            target: PathBuf::from("models/loras/null/y.safetensors"),
        });
        report.record_classify(&ClassifyOutcome::AlreadyCataloged);

        assert_eq!(report.moves(), 2);
        assert_eq!(report.target_conflicts, 1);
        assert_eq!(report.already_cataloged, 1);
    }

    #[test]
    fn test_phase_selection() {
        assert!(Phase::All.classifies() && Phase::All.relocates());
        assert!(Phase::Classify.classifies() && !Phase::Classify.relocates());
        assert!(!Phase::Relocate.classifies() && Phase::Relocate.relocates());
    }
}
