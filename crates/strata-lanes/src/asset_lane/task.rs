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

use super::loader::{ErasedLoader, LoaderResolver};
use std::sync::{Arc, RwLock};
use strata_core::asset::{AssetMetadata, AssetSource, AssetUUID};
use strata_core::sync::write;
use strata_core::{Task, TaskError};
use strata_data::{ErasedAsset, LoadedAssets};
use strata_telemetry::Stopwatch;

/// Loads one asset through the task scheduler.
///
/// - `prepare` (main thread) picks the loader registered for the asset type.
/// - `execute` (worker) reads the bytes from the source and decodes them.
/// - `finalize` (main thread) publishes the asset into the loaded-asset store.
pub struct AssetLoadTask {
    metadata: AssetMetadata,
    resolver: Arc<dyn LoaderResolver>,
    source: Arc<dyn AssetSource>,
    store: Arc<RwLock<LoadedAssets>>,
    loader: Option<Arc<dyn ErasedLoader>>,
    decoded: Option<ErasedAsset>,
    stopwatch: Stopwatch,
}

impl AssetLoadTask {
    /// Creates a load task for the asset described by `metadata`.
    pub fn new(
        metadata: AssetMetadata,
        resolver: Arc<dyn LoaderResolver>,
        source: Arc<dyn AssetSource>,
        store: Arc<RwLock<LoadedAssets>>,
    ) -> Self {
        Self {
            metadata,
            resolver,
            source,
            store,
            loader: None,
            decoded: None,
            stopwatch: Stopwatch::new(),
        }
    }

    /// The asset this task loads.
    pub fn uuid(&self) -> AssetUUID {
        self.metadata.uuid
    }
}

impl Task for AssetLoadTask {
    fn name(&self) -> &str {
        &self.metadata.name
    }

    fn prepare(&mut self) -> Result<(), TaskError> {
        let loader = self
            .resolver
            .resolve(&self.metadata.asset_type_name)
            .ok_or_else(|| {
                TaskError::Prepare(format!(
                    "no loader registered for asset type '{}'",
                    self.metadata.asset_type_name
                ))
            })?;
        self.loader = Some(loader);
        Ok(())
    }

    fn execute(&mut self) -> Result<(), TaskError> {
        let loader = self
            .loader
            .as_ref()
            .ok_or_else(|| TaskError::Execute("no loader was resolved".to_string()))?;
        let bytes = self
            .source
            .read(&self.metadata)
            .map_err(|e| TaskError::Execute(e.to_string()))?;
        let asset = loader.load_erased(&bytes).map_err(|e| {
            TaskError::Execute(format!("failed to decode '{}': {e:#}", self.metadata.name))
        })?;
        self.decoded = Some(asset);
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), TaskError> {
        let asset = self
            .decoded
            .take()
            .ok_or_else(|| TaskError::Finalize("nothing was decoded".to_string()))?;
        write(&self.store).insert(self.metadata.uuid, asset);
        log::info!(
            "Loaded asset '{}' ({}) in {:.2} ms",
            self.metadata.name,
            self.metadata.asset_type_name,
            self.stopwatch.elapsed_ms_f64()
        );
        Ok(())
    }

    fn discard(&mut self, error: &TaskError) {
        self.decoded = None;
        log::error!("Failed to load asset '{}': {}", self.metadata.name, error);
    }
}
