//! Directory layout of the model root.
//!
//! ```text
//! <root>/<file>                               staging, picked up by the relocator
//! <root>/<bucket>/<baseModel>/<creator>/<file> classified tree
//! <root>/loras/null/<file>                     registry-unknown files (flat)
//! ```
//!
//! Several registry types share one bucket directory (`LORA`, `LoCon` and
//! `DoRA` all live in `loras`), so mapping a directory back to a type is a
//! partial function. Its domain is every bucket left with exactly one type
//! once the configured exclusions are removed.

use crate::config::OrganizerConfig;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};

/// Characters replaced when a registry name becomes a directory.
const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Where a file sits relative to the layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Directly inside the model root.
    Staging,
    /// Directly inside the uncertain bucket.
    Uncertain,
    /// `<bucket>/<baseModel>/<creator>/<file>`.
    Classified {
        bucket: String,
        base_model: String,
        creator: String,
    },
    /// Below a bucket, but not at a depth the layout defines.
    Misplaced { bucket: String },
    /// Outside every bucket (or outside the root entirely).
    Outside,
}

/// Resolved layout derived from an [`OrganizerConfig`].
#[derive(Debug, Clone)]
pub struct ModelLayout {
    root: PathBuf,
    extensions: Vec<String>,
    type_to_dir: BTreeMap<String, String>,
    dir_to_type: BTreeMap<String, String>,
    excluded: BTreeSet<String>,
    uncertain_dir: PathBuf,
}

impl ModelLayout {
    pub fn new(config: &OrganizerConfig) -> Self {
        let excluded: BTreeSet<String> = config.reverse_excluded_types.iter().cloned().collect();

        let mut candidates: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (ty, dir) in &config.type_directory_map {
            if !excluded.contains(ty) {
                candidates.entry(dir.as_str()).or_default().push(ty.as_str());
            }
        }
        let dir_to_type = candidates
            .into_iter()
            .filter_map(|(dir, types)| match types.as_slice() {
                [only] => Some((dir.to_string(), only.to_string())),
                _ => None,
            })
            .collect();

        Self {
            root: config.model_root.clone(),
            extensions: config.recognized_extensions.clone(),
            type_to_dir: config.type_directory_map.clone(),
            dir_to_type,
            excluded,
            uncertain_dir: config.uncertain_dir.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute (root-joined) uncertain bucket.
    pub fn uncertain_dir(&self) -> PathBuf {
        self.root.join(&self.uncertain_dir)
    }

    /// Whether the file name ends with a recognized model extension.
    pub fn is_recognized(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        self.extensions
            .iter()
            .any(|ext| name.len() > ext.len() && name.ends_with(ext.as_str()))
    }

    pub fn is_bucket(&self, dir: &str) -> bool {
        self.type_to_dir.values().any(|d| d == dir)
    }

    /// Bucket directory for a registry type.
    pub fn directory_for_type(&self, model_type: &str) -> Option<&str> {
        self.type_to_dir.get(model_type).map(String::as_str)
    }

    /// Registry type for a bucket directory.
    ///
    /// Defined only for buckets holding exactly one non-excluded type.
    pub fn type_for_directory(&self, dir: &str) -> Option<&str> {
        self.dir_to_type.get(dir).map(String::as_str)
    }

    /// Types never produced by [`type_for_directory`](Self::type_for_directory).
    pub fn excluded_from_reverse(&self) -> impl Iterator<Item = &str> {
        self.excluded.iter().map(String::as_str)
    }

    /// Classify a path against the layout.
    pub fn placement(&self, path: &Path) -> Placement {
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return Placement::Outside;
        };

        let mut segments = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(segment) => match segment.to_str() {
                    Some(s) => segments.push(s),
                    None => return Placement::Outside,
                },
                Component::CurDir => {}
                _ => return Placement::Outside,
            }
        }

        match segments.as_slice() {
            [_file] => Placement::Staging,
            [bucket, ..] if !self.is_bucket(bucket) => Placement::Outside,
            _ if path.parent() == Some(self.uncertain_dir().as_path()) => Placement::Uncertain,
            [bucket, base_model, creator, _file] => Placement::Classified {
                bucket: bucket.to_string(),
                base_model: base_model.to_string(),
                creator: creator.to_string(),
            },
            [bucket, ..] => Placement::Misplaced {
                bucket: bucket.to_string(),
            },
            [] => Placement::Outside,
        }
    }

    /// Canonical location for a registry-identified file.
    pub fn target_path(
        &self,
        bucket: &str,
        base_model: &str,
        creator: &str,
        file_name: &str,
    ) -> PathBuf {
        self.root
            .join(bucket)
            .join(directory_segment(base_model))
            .join(directory_segment(creator))
            .join(file_name)
    }

    /// Location for a file the registry does not know.
    pub fn uncertain_path(&self, file_name: &str) -> PathBuf {
        self.uncertain_dir().join(file_name)
    }
}

/// Make a registry-provided name safe to use as one directory level.
pub fn directory_segment(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if RESERVED_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    let cleaned = cleaned.trim();

    match cleaned {
        "" => "_".to_string(),
        "." | ".." => cleaned.replace('.', "_"),
        _ => cleaned.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> ModelLayout {
        ModelLayout::new(&OrganizerConfig::default().with_model_root("models"))
    }

    #[test]
    fn test_reverse_map_domain() {
        let layout = layout();
        assert_eq!(layout.type_for_directory("checkpoints"), Some("Checkpoint"));
        assert_eq!(layout.type_for_directory("embeddings"), Some("TextualInversion"));
        assert_eq!(layout.type_for_directory("loras"), Some("LORA"));
        assert_eq!(layout.type_for_directory("vae"), Some("VAE"));
        assert_eq!(layout.type_for_directory("controlnet"), None);
        assert_eq!(
            layout.excluded_from_reverse().collect::<Vec<_>>(),
            vec!["DoRA", "LoCon"]
        );
    }

    #[test]
    fn test_ambiguous_bucket_has_no_inverse() {
        let mut config = OrganizerConfig::default();
        config.reverse_excluded_types.clear();
        let layout = ModelLayout::new(&config);

        assert_eq!(layout.type_for_directory("loras"), None);
        assert_eq!(layout.type_for_directory("vae"), Some("VAE"));
        assert_eq!(layout.directory_for_type("LoCon"), Some("loras"));
    }

    #[test]
    fn test_placement() {
        let layout = layout();
        assert_eq!(
            layout.placement(Path::new("models/a.safetensors")),
            Placement::Staging
        );
        assert_eq!(
            layout.placement(Path::new("models/loras/null/a.safetensors")),
            Placement::Uncertain
        );
        assert_eq!(
            layout.placement(Path::new("models/loras/SDXL/creatorX/x.safetensors")),
            Placement::Classified {
                bucket: "loras".into(),
                base_model: "SDXL".into(),
                creator: "creatorX".into(),
            }
        );
        assert_eq!(
            layout.placement(Path::new("models/loras/x.safetensors")),
            Placement::Misplaced {
                bucket: "loras".into()
            }
        );
        assert_eq!(
            layout.placement(Path::new("models/loras/SDXL/someone/v2/x.safetensors")),
            Placement::Misplaced {
                bucket: "loras".into()
            }
        );
        assert_eq!(
            layout.placement(Path::new("models/other/a/b/x.safetensors")),
            Placement::Outside
        );
        assert_eq!(
            layout.placement(Path::new("elsewhere/x.safetensors")),
            Placement::Outside
        );
    }

    #[test]
    fn test_creator_named_null_is_not_uncertain() {
        let layout = layout();
        assert_eq!(
            layout.placement(Path::new("models/loras/SDXL/null/x.safetensors")),
            Placement::Classified {
                bucket: "loras".into(),
                base_model: "SDXL".into(),
                creator: "null".into(),
            }
        );
    }

    #[test]
    fn test_recognized_extensions() {
        let layout = layout();
        assert!(layout.is_recognized(Path::new("models/a.safetensors")));
        assert!(!layout.is_recognized(Path::new("models/a.ckpt")));
        assert!(!layout.is_recognized(Path::new("models/.safetensors")));
        assert!(!layout.is_recognized(Path::new("models/a.safetensors.part")));
    }

    #[test]
    fn test_target_paths() {
        let layout = layout();
        assert_eq!(
            layout.target_path("checkpoints", "SDXL", "null", "checkpointA.safetensors"),
            PathBuf::from("models/checkpoints/SDXL/null/checkpointA.safetensors")
        );
        assert_eq!(
            layout.uncertain_path("x.safetensors"),
            PathBuf::from("models/loras/null/x.safetensors")
        );
        assert_eq!(
            layout.target_path("loras", "Pony/XL", "..", "x.safetensors"),
            PathBuf::from("models/loras/Pony_XL/__/x.safetensors")
        );
    }

    #[test]
    fn test_directory_segment() {
        assert_eq!(directory_segment("SD 1.5"), "SD 1.5");
        assert_eq!(directory_segment("a:b*c"), "a_b_c");
        assert_eq!(directory_segment("  "), "_");
        assert_eq!(directory_segment("."), "_");
    }
}
