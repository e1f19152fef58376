//! modelshelf core - content-addressed catalog for model weight files.
//!
//! Files under a model root are fingerprinted, looked up in a remote model
//! registry, recorded in a SQLite catalog and moved into a
//! `<type>/<baseModel>/<creator>/<file>` tree.
//!
//! # Example
//!
//! ```rust,ignore
//! use modelshelf_core::{CatalogStore, Organizer, OrganizerConfig, Phase, RegistryClient};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> modelshelf_core::Result<()> {
//!     let config = OrganizerConfig::default();
//!     let store = CatalogStore::open(&config.database_path)?;
//!     let registry = RegistryClient::new(&config.registry)?;
//!
//!     let mut organizer = Organizer::new(&config, store, registry)?;
//!     let report = organizer.run(Phase::All).await?;
//!     println!("Moved {} files", report.moves());
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod hashing;
pub mod organizer;
pub mod registry;

pub use catalog::{
    CatalogEntry, CatalogStats, CatalogStore, CatalogTransaction, ModelFileRecord, RefCategory,
    UNKNOWN_CREATOR,
};
pub use config::{OrganizerConfig, RegistryConfig};
pub use error::{OrganizerError, Result};
pub use hashing::{compute_sha256, compute_sha256_async};
pub use organizer::{
    ClassifyOutcome, ModelLayout, Organizer, Phase, Placement, RelocateOutcome, RunReport,
};
pub use registry::{
    HashLookup, ModelDetails, ModelRegistry, ModelVersion, RegistryClient, RetryPolicy,
};
