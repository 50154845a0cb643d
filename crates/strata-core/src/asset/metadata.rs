// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use super::uuid::AssetUUID;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Serializable metadata that describes an asset and its relationship to other assets.
///
/// This is the "identity card" the database keeps for each asset. The load
/// pipeline reads it to resolve the dependency graph and to pick a loader,
/// without touching the asset data itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMetadata {
    /// The unique, stable identifier for this asset.
    pub uuid: AssetUUID,

    /// The human-readable name, unique within a database (e.g. `grass.tex`).
    pub name: String,

    /// The path of the asset data, relative to the root of its source.
    pub path: PathBuf,

    /// A string identifier for the asset's type (e.g. "texture", "mesh").
    /// Used to select the loader that decodes the data.
    pub asset_type_name: String,

    /// The assets this asset depends on. They are always loaded before it.
    pub dependencies: Vec<AssetUUID>,
}

impl AssetMetadata {
    /// Creates metadata for an asset named `name`, with a name-derived UUID,
    /// its path equal to its name, and no dependencies.
    pub fn new(name: impl Into<String>, asset_type_name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            uuid: AssetUUID::new_v5(&name),
            path: PathBuf::from(&name),
            name,
            asset_type_name: asset_type_name.into(),
            dependencies: Vec::new(),
        }
    }

    /// Overrides the data path.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Declares a dependency on another asset.
    pub fn with_dependency(mut self, dependency: AssetUUID) -> Self {
        if !self.dependencies.contains(&dependency) {
            self.dependencies.push(dependency);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_derives_uuid_and_path_from_name() {
        let meta = AssetMetadata::new("rock.mesh", "mesh");
        assert_eq!(meta.uuid, AssetUUID::new_v5("rock.mesh"));
        assert_eq!(meta.path, PathBuf::from("rock.mesh"));
        assert!(meta.dependencies.is_empty());
    }

    #[test]
    fn test_with_dependency_ignores_duplicates() {
        let tex = AssetUUID::new_v5("rock.tex");
        let meta = AssetMetadata::new("rock.mat", "material")
            .with_dependency(tex)
            .with_dependency(tex);
        assert_eq!(meta.dependencies, vec![tex]);
    }
}
