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

use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Duration;
use strata_core::asset::{Asset, AssetMetadata, AssetSource};
use strata_core::{TaskError, TaskStatus};
use strata_data::{LoadedAssets, MemorySource};
use strata_lanes::{
    AssetLoadTask, AssetLoader, ErasedLoader, LoaderResolver, SchedulerConfig, TaskHandle,
    TaskScheduler, TypedLoader,
};

#[derive(Debug, PartialEq)]
struct Number(u32);
impl Asset for Number {}

struct NumberLoader;
impl AssetLoader<Number> for NumberLoader {
    fn load(&self, bytes: &[u8]) -> Result<Number, Box<dyn Error + Send + Sync>> {
        let bytes: [u8; 4] = bytes.try_into()?;
        Ok(Number(u32::from_le_bytes(bytes)))
    }
}

#[derive(Default)]
struct Loaders(HashMap<String, Arc<dyn ErasedLoader>>);

impl LoaderResolver for Loaders {
    fn resolve(&self, asset_type_name: &str) -> Option<Arc<dyn ErasedLoader>> {
        self.0.get(asset_type_name).cloned()
    }
}

struct Harness {
    scheduler: TaskScheduler,
    resolver: Arc<dyn LoaderResolver>,
    source: Arc<dyn AssetSource>,
    store: Arc<RwLock<LoadedAssets>>,
}

fn harness() -> Harness {
    let mut loaders = Loaders::default();
    loaders.0.insert(
        "number".to_string(),
        Arc::new(TypedLoader::<Number, _>::new(NumberLoader)),
    );
    let source = MemorySource::new()
        .with_bytes("seven", 7u32.to_le_bytes().to_vec())
        .with_bytes("short", vec![1u8, 2]);

    Harness {
        scheduler: TaskScheduler::new(SchedulerConfig::default().with_worker_count(2)).unwrap(),
        resolver: Arc::new(loaders),
        source: Arc::new(source),
        store: Arc::new(RwLock::new(LoadedAssets::new())),
    }
}

impl Harness {
    fn load(&self, metadata: AssetMetadata) -> TaskHandle {
        self.scheduler.submit_one(Box::new(AssetLoadTask::new(
            metadata,
            self.resolver.clone(),
            self.source.clone(),
            self.store.clone(),
        )))
    }

    fn run_until_finished(&self, handle: &TaskHandle) {
        for _ in 0..2_000 {
            self.scheduler.tick();
            if handle.is_finished() {
                return;
            }
            thread::sleep(Duration::from_millis(1));
        }
        panic!("task '{}' never finished", handle.name());
    }
}

#[test]
fn test_load_task_publishes_decoded_asset() {
    let h = harness();
    let meta = AssetMetadata::new("seven", "number");
    let uuid = meta.uuid;

    let handle = h.load(meta);
    assert_eq!(handle.name(), "seven");
    h.run_until_finished(&handle);

    assert_eq!(handle.status(), TaskStatus::Completed);
    assert!(handle.worker_name().is_some());
    let store = h.store.read().unwrap();
    assert_eq!(*store.get::<Number>(&uuid).unwrap(), Number(7));
}

#[test]
fn test_unregistered_type_fails_in_prepare() {
    let h = harness();
    let meta = AssetMetadata::new("seven", "texture");
    let uuid = meta.uuid;

    let handle = h.load(meta);
    h.scheduler.tick();

    assert_eq!(handle.status(), TaskStatus::Failed);
    assert!(matches!(handle.failure(), Some(TaskError::Prepare(_))));
    assert!(handle.worker_name().is_none());
    assert!(!h.store.read().unwrap().contains(&uuid));
}

#[test]
fn test_decode_error_fails_in_execute() {
    let h = harness();
    let handle = h.load(AssetMetadata::new("short", "number"));
    h.run_until_finished(&handle);

    assert_eq!(handle.status(), TaskStatus::Failed);
    match handle.failure() {
        Some(TaskError::Execute(message)) => assert!(message.contains("short")),
        other => panic!("expected an execute failure, got {other:?}"),
    }
    assert!(h.store.read().unwrap().is_empty());
}

#[test]
fn test_missing_data_fails_in_execute() {
    let h = harness();
    let handle = h.load(AssetMetadata::new("absent", "number"));
    h.run_until_finished(&handle);

    assert!(matches!(handle.failure(), Some(TaskError::Execute(_))));
}
