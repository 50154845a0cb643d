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

//! Provides the foundational traits and primitive types for the asset system.
//!
//! This module defines the "common language" for all asset-related operations.
//! It has no knowledge of how assets are stored, decoded, or scheduled:
//! - The [`Asset`] trait: a marker for all types that can be treated as assets.
//! - [`AssetUUID`]: the stable identifier every other layer keys on.
//! - [`AssetMetadata`]: the per-asset record, including declared dependencies.
//! - [`AssetSource`]: the byte provider consumed by worker threads.

mod handle;
mod metadata;
mod source;
mod uuid;

pub use handle::*;
pub use metadata::*;
pub use source::*;
pub use self::uuid::*;

/// A marker trait for types that can be managed by the asset system.
///
/// The supertraits are what make background loading possible:
/// - `Send` + `Sync`: a decoded asset is produced on a worker thread and then
///   shared with the thread that drives the engine loop.
/// - `'static`: the asset can be stored for the lifetime of the application.
///
/// # Examples
///
/// ```
/// use strata_core::asset::Asset;
///
/// struct Texture {
///     width: u32,
///     height: u32,
/// }
///
/// impl Asset for Texture {}
/// ```
pub trait Asset: Send + Sync + 'static {}
