//! Catalog store - SQLite persistence for model files and their identities.
//!
//! # Tables
//!
//! ```text
//! model_files ──entry_id──> catalog_entries ──type_id──────> types
//!                                           ──base_model_id─> base_models
//!                                           ──creator_id────> creators
//! ```
//!
//! All writes for one file go through a [`CatalogTransaction`] and become
//! durable only on commit.

mod store;

pub use store::{CatalogStore, CatalogTransaction};

use serde::{Deserialize, Serialize};

/// Name of the pre-seeded creator meaning "creator unknown".
pub const UNKNOWN_CREATOR: &str = "null";

/// Reference dictionaries deduplicated by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefCategory {
    Type,
    BaseModel,
    Creator,
}

impl RefCategory {
    pub const ALL: [RefCategory; 3] = [RefCategory::Type, RefCategory::BaseModel, RefCategory::Creator];

    /// Backing table name.
    pub fn table(&self) -> &'static str {
        match self {
            RefCategory::Type => "types",
            RefCategory::BaseModel => "base_models",
            RefCategory::Creator => "creators",
        }
    }
}

impl std::fmt::Display for RefCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.table())
    }
}

/// A row of `model_files`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelFileRecord {
    pub id: i64,
    pub path: String,
    pub hash: String,
    pub entry_id: Option<i64>,
}

/// A catalog entry with its references resolved to names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: i64,
    pub model_type: String,
    pub base_model: String,
    pub creator: Option<String>,
}

/// Row counts per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub model_files: u64,
    pub catalog_entries: u64,
    pub types: u64,
    pub base_models: u64,
    pub creators: u64,
}
