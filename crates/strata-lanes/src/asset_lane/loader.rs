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

use anyhow::anyhow;
use std::error::Error;
use std::marker::PhantomData;
use std::sync::Arc;
use strata_core::asset::Asset;
use strata_data::ErasedAsset;

/// A trait for types that can load a specific kind of asset from a byte slice.
///
/// Loaders run on worker threads, during the `execute` phase of an
/// [`AssetLoadTask`](super::AssetLoadTask), so they must be thread-safe.
/// Each `AssetLoader` is specialized for a single asset type `A`.
pub trait AssetLoader<A: Asset>: Send + Sync {
    /// Parses a byte slice and converts it into an instance of the asset `A`.
    fn load(&self, bytes: &[u8]) -> Result<A, Box<dyn Error + Send + Sync>>;
}

/// A loader with its asset type erased.
pub trait ErasedLoader: Send + Sync {
    /// Decodes `bytes` into a shared, type-erased asset.
    fn load_erased(&self, bytes: &[u8]) -> anyhow::Result<ErasedAsset>;

    /// The Rust type name of the assets this loader produces.
    fn asset_type(&self) -> &'static str;
}

/// Adapts a typed [`AssetLoader`] to [`ErasedLoader`].
pub struct TypedLoader<A, L> {
    loader: L,
    _asset: PhantomData<fn() -> A>,
}

impl<A: Asset, L: AssetLoader<A>> TypedLoader<A, L> {
    /// Wraps `loader`.
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            _asset: PhantomData,
        }
    }
}

impl<A: Asset, L: AssetLoader<A>> ErasedLoader for TypedLoader<A, L> {
    fn load_erased(&self, bytes: &[u8]) -> anyhow::Result<ErasedAsset> {
        let asset: A = self.loader.load(bytes).map_err(|e| anyhow!(e.to_string()))?;
        Ok(Arc::new(asset))
    }

    fn asset_type(&self) -> &'static str {
        std::any::type_name::<A>()
    }
}

/// Finds the loader registered for an asset type name.
pub trait LoaderResolver: Send + Sync {
    /// The loader for `asset_type_name`, if one is registered.
    fn resolve(&self, asset_type_name: &str) -> Option<Arc<dyn ErasedLoader>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Text(String);
    impl Asset for Text {}

    struct Utf8Loader;
    impl AssetLoader<Text> for Utf8Loader {
        fn load(&self, bytes: &[u8]) -> Result<Text, Box<dyn Error + Send + Sync>> {
            Ok(Text(std::str::from_utf8(bytes)?.to_string()))
        }
    }

    #[test]
    fn test_typed_loader_erases_and_downcasts() {
        let loader = TypedLoader::<Text, _>::new(Utf8Loader);
        let erased = loader.load_erased(b"hello").unwrap();
        let text = erased.downcast::<Text>().unwrap();
        assert_eq!(*text, Text("hello".to_string()));
        assert!(loader.asset_type().ends_with("Text"));
    }

    #[test]
    fn test_loader_errors_are_propagated() {
        let loader = TypedLoader::<Text, _>::new(Utf8Loader);
        assert!(loader.load_erased(&[0xC3, 0x28]).is_err());
    }
}
