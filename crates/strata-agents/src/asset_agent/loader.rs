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

//! A registry for asset loaders, enabling dynamic loading of different asset types by name.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use strata_core::asset::Asset;
use strata_core::sync::{read, write};
use strata_data::ErasedAsset;
use strata_lanes::{AssetLoader, ErasedLoader, LoaderResolver, TypedLoader};
use strata_telemetry::{CounterHandle, HistogramHandle, MetricsRegistry, ScopedMetricTimer};

/// A collection of metric handles used by the loader registry.
struct LoaderMetrics {
    /// Histogram for tracking asset decode times in milliseconds.
    load_time_ms: HistogramHandle,
    /// Counter for tracking the total number of assets decoded.
    assets_loaded_total: CounterHandle,
}

impl LoaderMetrics {
    fn new(registry: &MetricsRegistry) -> Option<Self> {
        let load_time_ms = registry.register_histogram(
            "assets",
            "load_time",
            "Asset decoding time",
            "ms",
            vec![1.0, 5.0, 16.0, 33.0, 100.0, 500.0],
        );
        let assets_loaded_total = registry.register_counter(
            "assets",
            "loaded_total",
            "Total number of assets decoded by a loader",
        );
        match (load_time_ms, assets_loaded_total) {
            (Ok(load_time_ms), Ok(assets_loaded_total)) => Some(Self {
                load_time_ms,
                assets_loaded_total,
            }),
            (Err(e), _) | (_, Err(e)) => {
                log::warn!("Loader metrics disabled: {}", e);
                None
            }
        }
    }
}

/// Wraps an erased loader and records decode metrics around it.
struct InstrumentedLoader {
    inner: Box<dyn ErasedLoader>,
    metrics: Option<Arc<LoaderMetrics>>,
}

impl ErasedLoader for InstrumentedLoader {
    fn load_erased(&self, bytes: &[u8]) -> Result<ErasedAsset> {
        let Some(metrics) = &self.metrics else {
            return self.inner.load_erased(bytes);
        };

        let _timer = ScopedMetricTimer::new(&metrics.load_time_ms);
        let asset = self.inner.load_erased(bytes)?;
        if let Err(e) = metrics.assets_loaded_total.increment() {
            log::warn!("Failed to count loaded asset: {:?}", e);
        }
        Ok(asset)
    }

    fn asset_type(&self) -> &'static str {
        self.inner.asset_type()
    }
}

/// Maps asset type names to the loaders that decode them.
///
/// Loaders can be registered at any time, from any thread. A load task picks
/// its loader during its `prepare` phase, so a registration only affects
/// tasks prepared after it.
pub struct AssetLoaderRegistry {
    loaders: RwLock<HashMap<String, Arc<dyn ErasedLoader>>>,
    metrics: Option<Arc<LoaderMetrics>>,
}

impl AssetLoaderRegistry {
    /// Creates an empty registry reporting into `metrics_registry`.
    pub fn new(metrics_registry: &MetricsRegistry) -> Self {
        Self {
            loaders: RwLock::new(HashMap::new()),
            metrics: LoaderMetrics::new(metrics_registry).map(Arc::new),
        }
    }

    /// Registers `loader` for assets whose type name is `type_name`.
    ///
    /// A previous registration for the same name is replaced.
    pub fn register<A: Asset>(&self, type_name: &str, loader: impl AssetLoader<A> + 'static) {
        let wrapped = InstrumentedLoader {
            inner: Box::new(TypedLoader::<A, _>::new(loader)),
            metrics: self.metrics.clone(),
        };
        let previous = write(&self.loaders).insert(type_name.to_string(), Arc::new(wrapped));
        if previous.is_some() {
            log::warn!("Replaced the loader registered for asset type '{}'", type_name);
        }
    }

    /// Returns `true` if a loader is registered for `type_name`.
    pub fn contains(&self, type_name: &str) -> bool {
        read(&self.loaders).contains_key(type_name)
    }

    /// The number of registered asset types.
    pub fn len(&self) -> usize {
        read(&self.loaders).len()
    }

    /// Returns `true` if no loader is registered.
    pub fn is_empty(&self) -> bool {
        read(&self.loaders).is_empty()
    }
}

impl LoaderResolver for AssetLoaderRegistry {
    fn resolve(&self, asset_type_name: &str) -> Option<Arc<dyn ErasedLoader>> {
        read(&self.loaders).get(asset_type_name).cloned()
    }
}

impl std::fmt::Debug for AssetLoaderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<String> = read(&self.loaders).keys().cloned().collect();
        types.sort();
        f.debug_struct("AssetLoaderRegistry")
            .field("types", &types)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[derive(Debug, PartialEq)]
    struct Blob(Vec<u8>);
    impl Asset for Blob {}

    struct BlobLoader;
    impl AssetLoader<Blob> for BlobLoader {
        fn load(&self, bytes: &[u8]) -> Result<Blob, Box<dyn Error + Send + Sync>> {
            if bytes.is_empty() {
                return Err("empty blob".into());
            }
            Ok(Blob(bytes.to_vec()))
        }
    }

    #[test]
    fn test_resolve_returns_registered_loader() {
        let metrics = MetricsRegistry::new();
        let registry = AssetLoaderRegistry::new(&metrics);
        assert!(registry.resolve("blob").is_none());

        registry.register::<Blob>("blob", BlobLoader);
        assert!(registry.contains("blob"));
        assert_eq!(registry.len(), 1);

        let loader = registry.resolve("blob").unwrap();
        let asset = loader.load_erased(&[1, 2, 3]).unwrap();
        let blob = asset.downcast::<Blob>().unwrap();
        assert_eq!(*blob, Blob(vec![1, 2, 3]));
    }

    #[test]
    fn test_successful_loads_are_counted() {
        let metrics = MetricsRegistry::new();
        let registry = AssetLoaderRegistry::new(&metrics);
        registry.register::<Blob>("blob", BlobLoader);
        let loader = registry.resolve("blob").unwrap();

        loader.load_erased(&[7]).unwrap();
        assert!(loader.load_erased(&[]).is_err());

        assert_eq!(metrics.counter_value("assets", "loaded_total").unwrap(), 1);
    }
}
