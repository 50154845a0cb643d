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

//! # Strata Data
//!
//! The data layer of the load pipeline. It knows what assets exist and how
//! they relate ([`AssetDatabase`]), where their bytes come from
//! ([`DirectorySource`], [`MemorySource`]), and where decoded assets live
//! once loaded ([`LoadedAssets`], [`AssetPool`]). It also provides the
//! bounded generational [`SlotArena`] used to hand out job tickets.

#![warn(missing_docs)]

pub mod arena;
pub mod database;
pub mod pool;
pub mod source;
pub mod storage;

pub use arena::{SlotArena, SlotId};
pub use database::{AssetDatabase, DatabaseError};
pub use pool::AssetPool;
pub use source::{DirectorySource, MemorySource};
pub use storage::{ErasedAsset, LoadedAssets};
