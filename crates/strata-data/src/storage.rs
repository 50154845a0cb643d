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

//! A type-erased store for decoded assets.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use strata_core::asset::{Asset, AssetHandle, AssetUUID};

/// A decoded asset whose concrete type is only known to its loader.
pub type ErasedAsset = Arc<dyn Any + Send + Sync>;

/// The index of every asset that finished loading.
///
/// Assets of all types share one map keyed by UUID; typed access goes
/// through a downcast. Any given asset is stored once, and later requests
/// receive a clone of the shared pointer.
#[derive(Default, Clone)]
pub struct LoadedAssets {
    assets: HashMap<AssetUUID, ErasedAsset>,
}

impl LoadedAssets {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a loaded asset, replacing any previous one with the same UUID.
    pub fn insert(&mut self, uuid: AssetUUID, asset: ErasedAsset) -> Option<ErasedAsset> {
        self.assets.insert(uuid, asset)
    }

    /// The shared, untyped pointer to a loaded asset.
    pub fn get_erased(&self, uuid: &AssetUUID) -> Option<ErasedAsset> {
        self.assets.get(uuid).cloned()
    }

    /// A typed handle to a loaded asset.
    ///
    /// Returns `None` if the asset is not loaded or is not an `A`.
    pub fn get<A: Asset>(&self, uuid: &AssetUUID) -> Option<AssetHandle<A>> {
        let erased = self.assets.get(uuid)?.clone();
        erased.downcast::<A>().ok().map(AssetHandle::from_arc)
    }

    /// Returns `true` if the asset finished loading.
    pub fn contains(&self, uuid: &AssetUUID) -> bool {
        self.assets.contains_key(uuid)
    }

    /// Removes an asset from the index. Outstanding handles keep it alive.
    pub fn remove(&mut self, uuid: &AssetUUID) -> Option<ErasedAsset> {
        self.assets.remove(uuid)
    }

    /// Number of loaded assets.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Returns `true` if nothing is loaded.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl std::fmt::Debug for LoadedAssets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedAssets")
            .field("len", &self.assets.len())
            .finish()
    }
}
