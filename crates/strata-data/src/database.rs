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

//! The asset database: an in-memory index of asset metadata.
//!
//! The database is the single source of truth for which assets exist, where
//! their bytes live, and which other assets they depend on. It is typically
//! built from a packed, bincode-encoded index file.

use std::collections::HashMap;
use strata_core::asset::{AssetMetadata, AssetUUID};

/// An error that can occur while building or persisting an [`AssetDatabase`].
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// The index bytes are not a valid, bincode-encoded list of metadata.
    #[error("failed to decode asset index: {0}")]
    Decode(#[from] bincode::error::DecodeError),
    /// The index could not be encoded.
    #[error("failed to encode asset index: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    /// Two different assets share a name.
    #[error("asset name '{name}' is used by both {existing} and {duplicate}")]
    DuplicateName {
        /// The clashing name.
        name: String,
        /// The UUID already registered under that name.
        existing: AssetUUID,
        /// The UUID that tried to claim it.
        duplicate: AssetUUID,
    },
}

/// The runtime index of every known asset.
///
/// Lookups by UUID and by name are O(1) on average.
#[derive(Debug, Default, Clone)]
pub struct AssetDatabase {
    index: HashMap<AssetUUID, AssetMetadata>,
    names: HashMap<String, AssetUUID>,
}

impl AssetDatabase {
    /// Creates an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a database from a list of metadata.
    pub fn from_metadata(
        metadata: impl IntoIterator<Item = AssetMetadata>,
    ) -> Result<Self, DatabaseError> {
        let mut database = Self::new();
        for meta in metadata {
            database.insert(meta)?;
        }
        Ok(database)
    }

    /// Decodes a packed index (a bincode-encoded list of [`AssetMetadata`]).
    pub fn from_index_bytes(index_bytes: &[u8]) -> Result<Self, DatabaseError> {
        let config = bincode::config::standard();
        let (metadata, _): (Vec<AssetMetadata>, _) =
            bincode::serde::decode_from_slice(index_bytes, config)?;
        log::debug!("Decoded asset index with {} entries", metadata.len());
        Self::from_metadata(metadata)
    }

    /// Encodes the database as a packed index, sorted by name.
    pub fn to_index_bytes(&self) -> Result<Vec<u8>, DatabaseError> {
        let mut metadata: Vec<&AssetMetadata> = self.index.values().collect();
        metadata.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(bincode::serde::encode_to_vec(
            &metadata,
            bincode::config::standard(),
        )?)
    }

    /// Adds or replaces an asset.
    ///
    /// Fails if the name already belongs to a different asset.
    pub fn insert(&mut self, metadata: AssetMetadata) -> Result<(), DatabaseError> {
        if let Some(existing) = self.names.get(&metadata.name) {
            if *existing != metadata.uuid {
                return Err(DatabaseError::DuplicateName {
                    name: metadata.name,
                    existing: *existing,
                    duplicate: metadata.uuid,
                });
            }
        }
        if let Some(previous) = self.index.get(&metadata.uuid) {
            self.names.remove(&previous.name);
        }
        self.names.insert(metadata.name.clone(), metadata.uuid);
        self.index.insert(metadata.uuid, metadata);
        Ok(())
    }

    /// Retrieves the metadata for a given asset UUID.
    pub fn get(&self, uuid: &AssetUUID) -> Option<&AssetMetadata> {
        self.index.get(uuid)
    }

    /// Retrieves the metadata of the asset called `name`.
    pub fn get_by_name(&self, name: &str) -> Option<&AssetMetadata> {
        self.names.get(name).and_then(|uuid| self.index.get(uuid))
    }

    /// The declared dependencies of an asset. Unknown assets have none.
    pub fn dependencies_of(&self, uuid: &AssetUUID) -> &[AssetUUID] {
        self.index
            .get(uuid)
            .map(|meta| meta.dependencies.as_slice())
            .unwrap_or(&[])
    }

    /// Returns `true` if the asset is known.
    pub fn contains(&self, uuid: &AssetUUID) -> bool {
        self.index.contains_key(uuid)
    }

    /// Number of known assets.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` if the database has no assets.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Iterates over all known assets, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &AssetMetadata> {
        self.index.values()
    }
}
