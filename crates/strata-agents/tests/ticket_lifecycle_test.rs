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

use std::sync::Arc;
use strata_agents::{AgentConfig, AgentError, AssetAgent, AssetLoadRequest, JobStatus};
use strata_core::asset::{AssetMetadata, AssetUUID};
use strata_data::{AssetDatabase, MemorySource};
use strata_lanes::{SchedulerConfig, TaskScheduler};
use strata_telemetry::MetricsRegistry;

fn agent_with(config: AgentConfig) -> AssetAgent {
    strata_telemetry::init_test_logging();
    // No loader is registered: jobs that reach a worker fail, which is enough
    // to move tickets through their lifecycle.
    let database = AssetDatabase::from_metadata([AssetMetadata::new("a", "text")]).unwrap();
    let scheduler =
        Arc::new(TaskScheduler::new(SchedulerConfig::default().with_worker_count(1)).unwrap());
    AssetAgent::with_config(
        database,
        Arc::new(MemorySource::new()),
        scheduler,
        Arc::new(MetricsRegistry::new()),
        config,
    )
}

fn request() -> AssetLoadRequest {
    AssetLoadRequest::new().with_asset(AssetUUID::new_v5("a"))
}

#[test]
fn test_ticket_pool_is_bounded() {
    let agent = agent_with(AgentConfig::default());
    assert_eq!(agent.ticket_capacity(), 255);

    let tickets: Vec<_> = (0..255).map(|_| agent.queue(&request()).unwrap()).collect();
    assert_eq!(agent.live_tickets(), 255);
    assert_eq!(
        agent.queue(&request()),
        Err(AgentError::PoolExhausted { capacity: 255 })
    );

    // Finishing one job frees exactly one ticket.
    assert!(!agent.wait_blocking(tickets[0]).unwrap());
    assert_eq!(agent.live_tickets(), 254);
    assert!(agent.queue(&request()).is_ok());
}

#[test]
fn test_unfinished_ticket_cannot_be_returned() {
    let agent = agent_with(AgentConfig::default());
    let ticket = agent.queue(&request()).unwrap();

    assert_eq!(
        agent.return_ticket(ticket),
        Err(AgentError::TicketInUse {
            ticket,
            status: JobStatus::Queued
        })
    );
    assert_eq!(agent.query(ticket).unwrap().status, JobStatus::Queued);
    assert_eq!(agent.live_tickets(), 1);
}

#[test]
fn test_processing_ticket_cannot_be_returned() {
    let agent = agent_with(AgentConfig::default());
    let ticket = agent.queue(&request()).unwrap();

    // One update starts the job; without a scheduler tick it stays in flight.
    agent.update();
    assert_eq!(agent.query(ticket).unwrap().status, JobStatus::Processing);

    assert_eq!(
        agent.return_ticket(ticket),
        Err(AgentError::TicketInUse {
            ticket,
            status: JobStatus::Processing
        })
    );
    assert_eq!(agent.query(ticket).unwrap().status, JobStatus::Processing);
    assert_eq!(agent.live_tickets(), 1);

    // The job still runs to the end and hands the ticket back.
    assert!(!agent.wait_blocking(ticket).unwrap());
    assert_eq!(agent.live_tickets(), 0);
}

#[test]
fn test_returned_ticket_goes_stale() {
    let agent = agent_with(AgentConfig::default().with_job_capacity(1));
    let ticket = agent.queue(&request()).unwrap();
    assert!(!agent.wait_blocking(ticket).unwrap());

    assert_eq!(agent.query(ticket), Err(AgentError::UnknownTicket(ticket)));
    assert_eq!(
        agent.return_ticket(ticket),
        Err(AgentError::UnknownTicket(ticket))
    );
    assert!(agent.job_assets(ticket).is_err());

    // The single slot is reused under a new generation.
    let reissued = agent.queue(&request()).unwrap();
    assert_eq!(reissued.index(), ticket.index());
    assert_ne!(reissued, ticket);
    assert_eq!(agent.query(ticket), Err(AgentError::UnknownTicket(ticket)));
    assert_eq!(agent.query(reissued).unwrap().status, JobStatus::Queued);
}

#[test]
fn test_small_pool_reports_its_capacity() {
    let agent = agent_with(AgentConfig::default().with_job_capacity(2));
    agent.queue(&request()).unwrap();
    agent.queue(&request()).unwrap();
    assert_eq!(
        agent.queue(&request()),
        Err(AgentError::PoolExhausted { capacity: 2 })
    );
}
