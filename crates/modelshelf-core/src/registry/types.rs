//! Registry response types.
//!
//! Only the fields the organizer reads are modelled; everything else in the
//! registry payloads is ignored by serde.

use serde::{Deserialize, Serialize};

/// A model version returned by the by-hash endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelVersion {
    pub id: i64,
    /// Parent model id.
    pub model_id: i64,
    #[serde(default)]
    pub base_model: Option<String>,
    pub model: VersionModel,
}

/// The parent-model summary embedded in a [`ModelVersion`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionModel {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub model_type: String,
}

/// A full model record returned by the by-id endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDetails {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub model_type: String,
    #[serde(default)]
    pub creator: Option<Creator>,
    #[serde(default)]
    pub model_versions: Vec<ModelVersionSummary>,
}

impl ModelDetails {
    /// Creator username, if the record carries attribution.
    pub fn creator_name(&self) -> Option<&str> {
        self.creator
            .as_ref()
            .and_then(|c| c.username.as_deref())
            .filter(|name| !name.is_empty())
    }

    /// Base model of one of this model's versions.
    pub fn base_model_of(&self, version_id: i64) -> Option<&str> {
        self.model_versions
            .iter()
            .find(|v| v.id == version_id)
            .and_then(|v| v.base_model.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelVersionSummary {
    pub id: i64,
    #[serde(default)]
    pub base_model: Option<String>,
}

/// Result of a by-hash lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashLookup {
    Found(ModelVersion),
    /// The registry definitively does not know this content.
    NotFound,
}
