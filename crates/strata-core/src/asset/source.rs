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

use super::AssetMetadata;
use std::io;
use std::path::PathBuf;

/// An error raised while fetching the raw bytes of an asset.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The source has no data for this asset.
    #[error("asset '{name}' is not available from this source")]
    NotFound {
        /// Name of the asset that was requested.
        name: String,
    },
    /// The data exists but could not be read.
    #[error("failed to read asset '{name}' from {path:?}: {source}")]
    Io {
        /// Name of the asset that was requested.
        name: String,
        /// Path that was read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Provides the raw bytes of an asset.
///
/// Sources are called from worker threads during the `execute` phase of a
/// load task, so implementations must be thread-safe and must not touch
/// anything that is only valid on the thread driving the engine loop.
pub trait AssetSource: Send + Sync {
    /// Reads the complete data of the asset described by `metadata`.
    fn read(&self, metadata: &AssetMetadata) -> Result<Vec<u8>, SourceError>;
}
