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

//! Asset load jobs and the tickets that address them.

use crossbeam_channel::{Receiver, Sender};
use std::collections::BTreeSet;
use std::fmt;
use strata_core::asset::AssetUUID;
use strata_data::{AssetPool, SlotId};
use strata_lanes::TaskHandle;

/// A reusable token addressing one asset load job.
///
/// Tickets are issued by [`AssetAgent::queue`](super::AssetAgent::queue) and
/// must be given back once the job is finished. The generation makes a
/// returned ticket stale even after its slot has been handed out again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobTicket {
    pub(crate) index: u8,
    pub(crate) generation: u32,
}

impl JobTicket {
    pub(crate) fn from_slot(id: SlotId) -> Self {
        Self {
            // The arena never holds more than u8::MAX slots.
            index: id.index as u8,
            generation: id.generation,
        }
    }

    pub(crate) fn slot(self) -> SlotId {
        SlotId {
            index: u32::from(self.index),
            generation: self.generation,
        }
    }

    /// The slot this ticket addresses.
    pub fn index(&self) -> u8 {
        self.index
    }
}

impl fmt::Display for JobTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}@{}", self.index, self.generation)
    }
}

/// The lifecycle state of an asset load job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JobStatus {
    /// No job is bound to the ticket.
    #[default]
    Unused,
    /// Waiting behind other jobs.
    Queued,
    /// Its layers are being loaded.
    Processing,
    /// Every layer loaded successfully.
    Completed,
    /// Resolution failed or an asset failed to load.
    Failed,
}

impl JobStatus {
    /// Returns `true` for `Completed` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// A snapshot of a job's public state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JobState {
    /// The job's status.
    pub status: JobStatus,
    /// How many dependency layers loaded successfully. A layer with a
    /// failed asset is not counted.
    pub layers_done: usize,
    /// How many dependency layers the job resolved to. Zero until the job
    /// leaves the queue.
    pub layers_total: usize,
}

/// The set of assets a caller wants loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetLoadRequest {
    assets: BTreeSet<AssetUUID>,
}

impl AssetLoadRequest {
    /// Creates an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `uuid` to the request.
    pub fn with_asset(mut self, uuid: AssetUUID) -> Self {
        self.assets.insert(uuid);
        self
    }

    /// Adds `uuid` to the request. Returns `false` if it was already there.
    pub fn insert(&mut self, uuid: AssetUUID) -> bool {
        self.assets.insert(uuid)
    }

    /// Returns `true` if `uuid` is part of the request.
    pub fn contains(&self, uuid: &AssetUUID) -> bool {
        self.assets.contains(uuid)
    }

    /// The requested assets, in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = &AssetUUID> {
        self.assets.iter()
    }

    /// The number of requested assets.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Returns `true` if nothing is requested.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl FromIterator<AssetUUID> for AssetLoadRequest {
    fn from_iter<I: IntoIterator<Item = AssetUUID>>(iter: I) -> Self {
        Self {
            assets: iter.into_iter().collect(),
        }
    }
}

/// The part of a job slot readers may look at.
#[derive(Debug, Default)]
pub(crate) struct PublicSlot {
    pub(crate) state: JobState,
    pub(crate) generation: u32,
    pub(crate) live: bool,
    pub(crate) completion: Option<Receiver<JobStatus>>,
}

impl PublicSlot {
    pub(crate) fn matches(&self, ticket: JobTicket) -> bool {
        self.live && self.generation == ticket.generation
    }
}

/// The part of a job slot only the driver thread mutates while the job runs.
#[derive(Default)]
pub(crate) struct JobStateInternal {
    pub(crate) requested: Vec<AssetUUID>,
    /// Layers in consumption order.
    pub(crate) layers: Vec<Vec<AssetUUID>>,
    pub(crate) active_layer: usize,
    pub(crate) submitted: bool,
    pub(crate) in_flight: Vec<(AssetUUID, TaskHandle)>,
    pub(crate) assets: AssetPool,
    pub(crate) failed: bool,
    pub(crate) completion: Option<Sender<JobStatus>>,
}

/// A job waiting for the driver to pick it up.
#[derive(Debug)]
pub(crate) struct QueueEntry {
    pub(crate) ticket: JobTicket,
    pub(crate) request: AssetLoadRequest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_merges_duplicates() {
        let a = AssetUUID::new_v5("a");
        let b = AssetUUID::new_v5("b");
        let request: AssetLoadRequest = [a, b, a].into_iter().collect();
        assert_eq!(request.len(), 2);
        assert!(request.contains(&a));

        let mut request = AssetLoadRequest::new().with_asset(a);
        assert!(!request.insert(a));
        assert!(request.insert(b));
    }

    #[test]
    fn test_ticket_maps_back_to_its_slot() {
        let ticket = JobTicket::from_slot(SlotId {
            index: 254,
            generation: 9,
        });
        assert_eq!(ticket.index(), 254);
        assert_eq!(ticket.slot().index, 254);
        assert_eq!(ticket.slot().generation, 9);
        assert_eq!(ticket.to_string(), "#254@9");
    }

    #[test]
    fn test_only_finished_jobs_are_terminal() {
        assert!(!JobStatus::Unused.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }
}
