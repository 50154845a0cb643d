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

//! Acts as the agent for the asset subsystem.
//!
//! This module is the public-facing API for requesting assets and querying the
//! state of their loading. It delegates the heavy lifting (reading and
//! decoding bytes) to the asset lane, running on the task scheduler.

mod agent;
mod config;
mod error;
mod job;
mod loader;

pub use agent::AssetAgent;
pub use config::AgentConfig;
pub use error::AgentError;
pub use job::{AssetLoadRequest, JobState, JobStatus, JobTicket};
pub use loader::AssetLoaderRegistry;
