//! Shared fixtures: a model root in a temp dir and an in-memory registry.

#![allow(dead_code)]

use async_trait::async_trait;
use modelshelf_core::registry::{Creator, ModelVersionSummary, VersionModel};
use modelshelf_core::{
    CatalogStore, HashLookup, ModelDetails, ModelRegistry, ModelVersion, Organizer,
    OrganizerConfig, OrganizerError, Result,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Registry answering from fixed tables and recording every lookup.
#[derive(Default)]
pub struct FakeRegistry {
    versions: HashMap<String, ModelVersion>,
    models: HashMap<i64, ModelDetails>,
    hash_lookups: Mutex<Vec<String>>,
    id_lookups: Mutex<Vec<i64>>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `hash` as version `model_id * 10` of model `model_id`.
    pub fn with_model(
        mut self,
        hash: &str,
        model_id: i64,
        model_type: &str,
        base_model: &str,
        creator: Option<&str>,
    ) -> Self {
        let version_id = model_id * 10;
        self.versions.insert(
            hash.to_string(),
            ModelVersion {
                id: version_id,
                model_id,
                base_model: Some(base_model.to_string()),
                model: VersionModel {
                    name: Some(format!("model {}", model_id)),
                    model_type: model_type.to_string(),
                },
            },
        );
        self.models.insert(
            model_id,
            ModelDetails {
                id: model_id,
                name: Some(format!("model {}", model_id)),
                model_type: model_type.to_string(),
                creator: creator.map(|name| Creator {
                    username: Some(name.to_string()),
                }),
                model_versions: vec![ModelVersionSummary {
                    id: version_id,
                    base_model: Some(base_model.to_string()),
                }],
            },
        );
        self
    }

    pub fn hash_lookups(&self) -> Vec<String> {
        self.hash_lookups.lock().unwrap().clone()
    }

    pub fn id_lookups(&self) -> Vec<i64> {
        self.id_lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelRegistry for FakeRegistry {
    async fn lookup_by_hash(&self, hash: &str) -> Result<HashLookup> {
        self.hash_lookups.lock().unwrap().push(hash.to_string());
        Ok(match self.versions.get(hash) {
            Some(version) => HashLookup::Found(version.clone()),
            None => HashLookup::NotFound,
        })
    }

    async fn lookup_by_id(&self, model_id: i64) -> Result<ModelDetails> {
        self.id_lookups.lock().unwrap().push(model_id);
        self.models
            .get(&model_id)
            .cloned()
            .ok_or_else(|| OrganizerError::Registry {
                message: format!("model {} not found", model_id),
                status_code: Some(404),
            })
    }
}

/// A model root and catalog database inside a temp directory.
pub struct TestEnv {
    pub dir: TempDir,
    pub root: PathBuf,
    pub config: OrganizerConfig,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let root = dir.path().join("models");
        std::fs::create_dir_all(&root).unwrap();

        let mut config = OrganizerConfig::default().with_model_root(&root);
        config.database_path = dir.path().join("database.db");
        config.log_dir = dir.path().to_path_buf();

        Self { dir, root, config }
    }

    /// Write a file below the model root and return its path.
    pub fn write(&self, relative: &str, content: &[u8]) -> PathBuf {
        let path = self.root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Path below the model root.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Catalog key for a path below the model root.
    pub fn key(&self, relative: &str) -> String {
        key(&self.path(relative))
    }

    /// An organizer over this environment's root and catalog file.
    pub fn organizer(&self, registry: Arc<FakeRegistry>) -> Organizer<Arc<FakeRegistry>> {
        let store = CatalogStore::open(&self.config.database_path).unwrap();
        Organizer::new(&self.config, store, registry).unwrap()
    }

    /// Every file below the root, relative and sorted.
    pub fn files(&self) -> Vec<String> {
        let mut files: Vec<String> = walkdir::WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| {
                entry
                    .path()
                    .strip_prefix(&self.root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        files.sort();
        files
    }
}

pub fn key(path: &Path) -> String {
    path.to_str().unwrap().to_string()
}

pub fn sha256(content: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(content))
}
