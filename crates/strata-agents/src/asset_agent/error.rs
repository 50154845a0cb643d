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

use super::job::{JobStatus, JobTicket};
use strata_core::asset::AssetUUID;

/// An error returned by the [`AssetAgent`](super::AssetAgent).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AgentError {
    /// A request names an asset the database does not know.
    #[error("asset {0} is not in the database")]
    UnknownAsset(AssetUUID),
    /// No asset has this name.
    #[error("no asset named '{0}' in the database")]
    UnknownAssetName(String),
    /// Every job ticket is in use.
    #[error("all {capacity} job tickets are in use")]
    PoolExhausted {
        /// The ticket pool capacity.
        capacity: usize,
    },
    /// The ticket was never issued, or was already returned.
    #[error("ticket {0} does not refer to a live job")]
    UnknownTicket(JobTicket),
    /// The ticket's job has not finished yet.
    #[error("ticket {ticket} is still {status:?}")]
    TicketInUse {
        /// The ticket.
        ticket: JobTicket,
        /// The job's status.
        status: JobStatus,
    },
}
