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

//! # Strata Lanes
//!
//! The hot path of the load pipeline.
//!
//! - [`task_lane`]: a fixed pool of [`WorkerThread`]s driven by the
//!   [`TaskScheduler`], which runs the three phases of every submitted task.
//! - [`asset_lane`]: the loader contract and the [`AssetLoadTask`] that reads
//!   and decodes one asset through the scheduler.

#![warn(missing_docs)]

pub mod asset_lane;
pub mod task_lane;

pub use asset_lane::{AssetLoadTask, AssetLoader, ErasedLoader, LoaderResolver, TypedLoader};
pub use task_lane::{
    IdleBackoff, ScheduledTask, SchedulerConfig, TaskHandle, TaskScheduler, TickReport,
    WorkerThread,
};
