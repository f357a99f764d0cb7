//! Entity schema descriptors for the two project generations.
//!
//! The diff engine and the fetchers are generic over an [`EntitySchema`];
//! the only behavioral differences between v1 and v2 projects live here.

use serde::{Deserialize, Serialize};

/// Remote API generation, reported once by the platform at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiVersion {
    V1,
    V2,
}

impl ApiVersion {
    pub fn from_number(version: u32) -> Option<Self> {
        match version {
            1 => Some(ApiVersion::V1),
            2 => Some(ApiVersion::V2),
            _ => None,
        }
    }

    pub fn schema(self) -> &'static EntitySchema {
        match self {
            ApiVersion::V1 => &V1,
            ApiVersion::V2 => &V2,
        }
    }
}

/// Layout rules for one project generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySchema {
    pub version: ApiVersion,

    /// Subfolder of a class whose direct files form the class's model set.
    /// `None` means models are ordinary class files.
    pub class_models_dir: Option<&'static str>,

    /// Root-level files synchronized as project files.
    pub project_files: &'static [&'static str],
}

pub const CLASSES_DIR: &str = "classes";
pub const MODELS_DIR: &str = "models";
pub const DEPENDENCIES_DIR: &str = "dependencies";

pub const V1: EntitySchema = EntitySchema {
    version: ApiVersion::V1,
    class_models_dir: Some(MODELS_DIR),
    project_files: &[],
};

pub const V2: EntitySchema = EntitySchema {
    version: ApiVersion::V2,
    class_models_dir: None,
    project_files: &["package.json"],
};

/// Where a path inside a class tree belongs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassEntry {
    File(String),
    Model(String),
}

impl EntitySchema {
    /// Classify a `/`-separated path relative to the class root.
    ///
    /// Only direct children of the models folder become models; deeper
    /// paths stay regular files.
    pub fn classify(&self, relative: &str) -> ClassEntry {
        if let Some(dir) = self.class_models_dir {
            if let Some(rest) = relative.strip_prefix(dir).and_then(|r| r.strip_prefix('/')) {
                if !rest.is_empty() && !rest.contains('/') {
                    return ClassEntry::Model(rest.to_string());
                }
            }
        }
        ClassEntry::File(relative.to_string())
    }

    /// Path used on the wire for a class model.
    pub fn model_path(&self, model: &str) -> String {
        match self.class_models_dir {
            Some(dir) => format!("{dir}/{model}"),
            None => model.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v1_models_folder_children_are_models() {
        assert_eq!(V1.classify("models/User.json"), ClassEntry::Model("User.json".into()));
        assert_eq!(V1.classify("index.js"), ClassEntry::File("index.js".into()));
        assert_eq!(
            V1.classify("models/nested/User.json"),
            ClassEntry::File("models/nested/User.json".into())
        );
    }

    #[test]
    fn v2_flattens_models_into_files() {
        assert_eq!(
            V2.classify("models/User.json"),
            ClassEntry::File("models/User.json".into())
        );
    }

    #[test]
    fn version_numbers_map_to_schemas() {
        assert_eq!(ApiVersion::from_number(1).unwrap().schema(), &V1);
        assert_eq!(ApiVersion::from_number(2).unwrap().schema(), &V2);
        assert!(ApiVersion::from_number(3).is_none());
    }
}
