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

use std::time::Duration;

/// Largest number of concurrent jobs a ticket can address.
pub const MAX_JOB_CAPACITY: usize = u8::MAX as usize;

/// Configuration of the [`AssetAgent`](super::AssetAgent).
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Number of job tickets that can be live at once (1 to 255).
    pub job_capacity: usize,
    /// How long a waiting thread other than the driver blocks on the
    /// completion channel before re-checking the job status.
    pub wait_poll_interval: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            job_capacity: MAX_JOB_CAPACITY,
            wait_poll_interval: Duration::from_millis(5),
        }
    }
}

impl AgentConfig {
    /// Sets the ticket pool capacity.
    pub fn with_job_capacity(mut self, capacity: usize) -> Self {
        self.job_capacity = capacity;
        self
    }

    /// Sets the wait poll interval.
    pub fn with_wait_poll_interval(mut self, interval: Duration) -> Self {
        self.wait_poll_interval = interval;
        self
    }

    pub(crate) fn resolved_capacity(&self) -> usize {
        self.job_capacity.clamp(1, MAX_JOB_CAPACITY)
    }
}
