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

use crate::storage::ErasedAsset;
use std::collections::HashMap;
use strata_core::asset::{Asset, AssetHandle, AssetUUID};

/// A set of loaded assets kept alive together.
///
/// A pool holds a strong reference to each asset it contains, so the assets
/// stay in memory for as long as the pool lives, even if they are removed
/// from the global store.
#[derive(Default, Clone)]
pub struct AssetPool {
    assets: HashMap<AssetUUID, ErasedAsset>,
}

impl AssetPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins an asset in the pool.
    pub fn pin(&mut self, uuid: AssetUUID, asset: ErasedAsset) {
        self.assets.insert(uuid, asset);
    }

    /// Returns `true` if the asset is pinned.
    pub fn contains(&self, uuid: &AssetUUID) -> bool {
        self.assets.contains_key(uuid)
    }

    /// A typed handle to a pinned asset.
    pub fn get<A: Asset>(&self, uuid: &AssetUUID) -> Option<AssetHandle<A>> {
        let erased = self.assets.get(uuid)?.clone();
        erased.downcast::<A>().ok().map(AssetHandle::from_arc)
    }

    /// The UUIDs of every pinned asset, in no particular order.
    pub fn uuids(&self) -> impl Iterator<Item = &AssetUUID> {
        self.assets.keys()
    }

    /// Number of pinned assets.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Returns `true` if the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Drops every pin.
    pub fn clear(&mut self) {
        self.assets.clear();
    }
}

impl std::fmt::Debug for AssetPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.assets.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct Sound(&'static str);
    impl Asset for Sound {}

    #[test]
    fn test_pool_keeps_assets_alive() {
        let uuid = AssetUUID::new();
        let asset: ErasedAsset = Arc::new(Sound("step.wav"));
        let weak = Arc::downgrade(&asset);

        let mut pool = AssetPool::new();
        pool.pin(uuid, asset);
        assert!(weak.upgrade().is_some());
        assert_eq!(pool.get::<Sound>(&uuid).unwrap().0, "step.wav");

        pool.clear();
        assert!(weak.upgrade().is_none());
    }
}
