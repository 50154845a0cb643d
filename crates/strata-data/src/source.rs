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

//! Byte sources for asset data.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use strata_core::asset::{AssetMetadata, AssetSource, SourceError};

/// Reads asset data from files under a root directory.
///
/// The file for an asset is `root.join(metadata.path)`.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    /// Creates a source rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetSource for DirectorySource {
    fn read(&self, metadata: &AssetMetadata) -> Result<Vec<u8>, SourceError> {
        let path = self.root.join(&metadata.path);
        log::trace!("Reading '{}' from {:?}", metadata.name, path);
        std::fs::read(&path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => SourceError::NotFound {
                name: metadata.name.clone(),
            },
            _ => SourceError::Io {
                name: metadata.name.clone(),
                path,
                source,
            },
        })
    }
}

/// Serves asset data from memory, keyed by asset name.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    data: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style variant of [`MemorySource::insert`].
    pub fn with_bytes(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(name, bytes);
        self
    }

    /// Sets the bytes served for the asset called `name`.
    pub fn insert(&mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.data.insert(name.into(), bytes.into());
    }
}

impl AssetSource for MemorySource {
    fn read(&self, metadata: &AssetMetadata) -> Result<Vec<u8>, SourceError> {
        self.data
            .get(&metadata.name)
            .cloned()
            .ok_or_else(|| SourceError::NotFound {
                name: metadata.name.clone(),
            })
    }
}
