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

//! The AssetAgent turns asset requests into asset load jobs and drives them.
//!
//! A job resolves its request into dependency layers, then loads one layer at
//! a time on the task scheduler: a layer is only submitted once every task of
//! the previous one has been retired. Only one job is processed at a time,
//! the others wait in FIFO order.
//!
//! `update` must be called on the driver thread (the thread that created the
//! agent), after `TaskScheduler::tick`. Everything else can be called from any
//! thread.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, ThreadId};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use strata_core::asset::{Asset, AssetHandle, AssetSource, AssetUUID};
use strata_core::sync::{lock, read};
use strata_core::{resolve_layers, Task, TaskStatus};
use strata_data::{AssetDatabase, AssetPool, LoadedAssets, SlotArena};
use strata_lanes::{AssetLoadTask, AssetLoader, TaskScheduler};
use strata_telemetry::{CounterHandle, MetricsRegistry};

use super::config::AgentConfig;
use super::error::AgentError;
use super::job::{
    AssetLoadRequest, JobState, JobStateInternal, JobStatus, JobTicket, PublicSlot, QueueEntry,
};
use super::loader::AssetLoaderRegistry;

struct AgentMetrics {
    jobs_completed: CounterHandle,
    jobs_failed: CounterHandle,
}

impl AgentMetrics {
    fn new(registry: &MetricsRegistry) -> Option<Self> {
        let completed = registry.register_counter(
            "jobs",
            "completed_total",
            "Asset load jobs that loaded every layer",
        );
        let failed = registry.register_counter(
            "jobs",
            "failed_total",
            "Asset load jobs that failed to resolve or to load",
        );
        match (completed, failed) {
            (Ok(jobs_completed), Ok(jobs_failed)) => Some(Self {
                jobs_completed,
                jobs_failed,
            }),
            (Err(e), _) | (_, Err(e)) => {
                log::warn!("Job metrics disabled: {}", e);
                None
            }
        }
    }

    fn record(&self, status: JobStatus) {
        let counter = match status {
            JobStatus::Completed => &self.jobs_completed,
            _ => &self.jobs_failed,
        };
        if let Err(e) = counter.increment() {
            log::warn!("Failed to record job outcome: {:?}", e);
        }
    }
}

/// One ticket's worth of job state.
///
/// Lock order is `internal` then `public`.
#[derive(Default)]
struct JobSlot {
    public: Mutex<PublicSlot>,
    internal: Mutex<JobStateInternal>,
}

/// Schedules asset load jobs and hands out the loaded assets.
pub struct AssetAgent {
    database: Arc<AssetDatabase>,
    loaders: Arc<AssetLoaderRegistry>,
    source: Arc<dyn AssetSource>,
    assets: Arc<RwLock<LoadedAssets>>,
    scheduler: Arc<TaskScheduler>,
    queue: Mutex<VecDeque<QueueEntry>>,
    tickets: Mutex<SlotArena>,
    slots: Vec<JobSlot>,
    /// The job currently being processed, if any.
    active: Mutex<Option<JobTicket>>,
    driver: ThreadId,
    config: AgentConfig,
    metrics: Option<AgentMetrics>,
}

impl AssetAgent {
    /// Creates an agent with the default configuration.
    ///
    /// The calling thread becomes the driver thread.
    pub fn new(
        database: AssetDatabase,
        source: Arc<dyn AssetSource>,
        scheduler: Arc<TaskScheduler>,
        metrics_registry: Arc<MetricsRegistry>,
    ) -> Self {
        Self::with_config(
            database,
            source,
            scheduler,
            metrics_registry,
            AgentConfig::default(),
        )
    }

    /// Creates an agent with an explicit configuration.
    pub fn with_config(
        database: AssetDatabase,
        source: Arc<dyn AssetSource>,
        scheduler: Arc<TaskScheduler>,
        metrics_registry: Arc<MetricsRegistry>,
        config: AgentConfig,
    ) -> Self {
        if !scheduler.is_main_thread() {
            log::warn!(
                "AssetAgent created off the scheduler's main thread; blocking waits will not tick it"
            );
        }

        let capacity = config.resolved_capacity();
        Self {
            database: Arc::new(database),
            loaders: Arc::new(AssetLoaderRegistry::new(&metrics_registry)),
            source,
            assets: Arc::new(RwLock::new(LoadedAssets::new())),
            scheduler,
            queue: Mutex::new(VecDeque::new()),
            tickets: Mutex::new(SlotArena::with_capacity(capacity)),
            slots: (0..capacity).map(|_| JobSlot::default()).collect(),
            active: Mutex::new(None),
            driver: thread::current().id(),
            config,
            metrics: AgentMetrics::new(&metrics_registry),
        }
    }

    /// Registers a loader for a specific asset type name.
    pub fn register_loader<A: Asset>(
        &self,
        type_name: &str,
        loader: impl AssetLoader<A> + 'static,
    ) {
        self.loaders.register::<A>(type_name, loader);
    }

    /// Looks up `name` in the database and adds the asset to `request`.
    pub fn prescribe(
        &self,
        request: &mut AssetLoadRequest,
        name: &str,
    ) -> Result<AssetUUID, AgentError> {
        let metadata = self
            .database
            .get_by_name(name)
            .ok_or_else(|| AgentError::UnknownAssetName(name.to_string()))?;
        request.insert(metadata.uuid);
        Ok(metadata.uuid)
    }

    /// Queues an asset load job for `request` and returns its ticket.
    ///
    /// The job only starts on a later [`update`](Self::update). The ticket
    /// must be given back with [`return_ticket`](Self::return_ticket) or
    /// [`wait_blocking`](Self::wait_blocking) once the job has finished.
    pub fn queue(&self, request: &AssetLoadRequest) -> Result<JobTicket, AgentError> {
        if let Some(unknown) = request.iter().find(|uuid| !self.database.contains(uuid)) {
            log::error!("Cannot queue asset {}: it is not in the database", unknown);
            return Err(AgentError::UnknownAsset(*unknown));
        }

        let capacity = self.slots.len();
        let Some(id) = lock(&self.tickets).allocate() else {
            log::error!("Cannot queue asset load job: all {} tickets are in use", capacity);
            return Err(AgentError::PoolExhausted { capacity });
        };
        let ticket = JobTicket::from_slot(id);
        let slot = &self.slots[usize::from(ticket.index)];

        let (sender, receiver) = crossbeam_channel::bounded(1);
        *lock(&slot.internal) = JobStateInternal {
            requested: request.iter().copied().collect(),
            completion: Some(sender),
            ..Default::default()
        };
        *lock(&slot.public) = PublicSlot {
            state: JobState {
                status: JobStatus::Queued,
                ..Default::default()
            },
            generation: ticket.generation,
            live: true,
            completion: Some(receiver),
        };
        lock(&self.queue).push_back(QueueEntry {
            ticket,
            request: request.clone(),
        });

        log::debug!("Queued asset load job {} ({} assets)", ticket, request.len());
        Ok(ticket)
    }

    /// Advances the active job, or starts the next queued one.
    ///
    /// Call once per frame on the driver thread, after the scheduler tick.
    /// Calls from any other thread are ignored.
    pub fn update(&self) {
        if !self.is_driver_thread() {
            log::error!("AssetAgent::update called off the driver thread; ignored");
            return;
        }

        let active = *lock(&self.active);
        match active {
            Some(ticket) => {
                let slot = self.slot_of(ticket);
                let mut internal = lock(&slot.internal);
                self.advance(ticket, &mut internal);
            }
            None => self.process_queue(),
        }
    }

    /// Snapshot of the job addressed by `ticket`.
    pub fn query(&self, ticket: JobTicket) -> Result<JobState, AgentError> {
        let slot = self.slot(ticket)?;
        let public = lock(&slot.public);
        if !public.matches(ticket) {
            log::error!("Queried ticket {} which is stale or was never issued", ticket);
            return Err(AgentError::UnknownTicket(ticket));
        }
        Ok(public.state)
    }

    /// Gives a finished job's ticket back.
    ///
    /// Returning a ticket whose job is still queued or processing is refused
    /// and leaves the job untouched.
    pub fn return_ticket(&self, ticket: JobTicket) -> Result<(), AgentError> {
        let slot = self.slot(ticket)?;
        {
            let mut public = lock(&slot.public);
            if !public.matches(ticket) {
                log::error!("Ticket {} returned twice or never issued", ticket);
                return Err(AgentError::UnknownTicket(ticket));
            }
            let status = public.state.status;
            if !status.is_terminal() {
                log::error!("Ticket {} returned while its job is {:?}", ticket, status);
                return Err(AgentError::TicketInUse { ticket, status });
            }
            let generation = public.generation;
            *public = PublicSlot {
                generation,
                ..Default::default()
            };
        }

        *lock(&slot.internal) = JobStateInternal::default();
        lock(&self.tickets).release(ticket.slot());
        Ok(())
    }

    /// Blocks until the job addressed by `ticket` finishes, then returns the
    /// ticket. Returns `true` if the job completed.
    ///
    /// On the driver thread this drives the scheduler and the agent itself.
    /// On any other thread it waits for the driver to finish the job.
    pub fn wait_blocking(&self, ticket: JobTicket) -> Result<bool, AgentError> {
        let completion = {
            let slot = self.slot(ticket)?;
            let public = lock(&slot.public);
            if !public.matches(ticket) {
                return Err(AgentError::UnknownTicket(ticket));
            }
            public.completion.clone()
        };

        let status = if self.is_driver_thread() {
            self.drive_until_finished(ticket)?
        } else {
            self.await_completion(ticket, completion)?
        };

        self.return_ticket(ticket)?;
        Ok(status == JobStatus::Completed)
    }

    /// Queues `request` and waits for it. See [`wait_blocking`](Self::wait_blocking).
    pub fn queue_and_wait(&self, request: &AssetLoadRequest) -> Result<bool, AgentError> {
        let ticket = self.queue(request)?;
        self.wait_blocking(ticket)
    }

    /// The assets pinned by the job addressed by `ticket` so far.
    ///
    /// A failed job keeps whatever it loaded before the failure.
    pub fn job_assets(&self, ticket: JobTicket) -> Result<AssetPool, AgentError> {
        let slot = self.slot(ticket)?;
        let internal = lock(&slot.internal);
        if !lock(&slot.public).matches(ticket) {
            return Err(AgentError::UnknownTicket(ticket));
        }
        Ok(internal.assets.clone())
    }

    /// A typed handle to a loaded asset.
    pub fn get<A: Asset>(&self, uuid: &AssetUUID) -> Option<AssetHandle<A>> {
        read(&self.assets).get::<A>(uuid)
    }

    /// A typed handle to a loaded asset, looked up by name.
    pub fn get_by_name<A: Asset>(&self, name: &str) -> Option<AssetHandle<A>> {
        let metadata = self.database.get_by_name(name)?;
        self.get::<A>(&metadata.uuid)
    }

    /// Returns `true` if the asset is in the loaded-asset store.
    pub fn is_loaded(&self, uuid: &AssetUUID) -> bool {
        read(&self.assets).contains(uuid)
    }

    /// The number of assets in the loaded-asset store.
    pub fn loaded_count(&self) -> usize {
        read(&self.assets).len()
    }

    /// Pins the already loaded assets of `request` into a new pool.
    ///
    /// Requested assets that are not loaded are skipped.
    pub fn create_asset_pool(&self, request: &AssetLoadRequest) -> AssetPool {
        let loaded = read(&self.assets);
        let mut pool = AssetPool::new();
        for uuid in request.iter() {
            if let Some(asset) = loaded.get_erased(uuid) {
                pool.pin(*uuid, asset);
            }
        }
        pool
    }

    /// The asset database this agent resolves requests against.
    pub fn database(&self) -> &AssetDatabase {
        &self.database
    }

    /// The scheduler load tasks run on.
    pub fn scheduler(&self) -> &Arc<TaskScheduler> {
        &self.scheduler
    }

    /// The number of tickets currently handed out.
    pub fn live_tickets(&self) -> usize {
        lock(&self.tickets).live_count()
    }

    /// The number of tickets that can be live at once.
    pub fn ticket_capacity(&self) -> usize {
        self.slots.len()
    }

    fn is_driver_thread(&self) -> bool {
        thread::current().id() == self.driver
    }

    fn slot(&self, ticket: JobTicket) -> Result<&JobSlot, AgentError> {
        self.slots
            .get(usize::from(ticket.index))
            .ok_or(AgentError::UnknownTicket(ticket))
    }

    fn slot_of(&self, ticket: JobTicket) -> &JobSlot {
        &self.slots[usize::from(ticket.index)]
    }

    fn publish(&self, ticket: JobTicket, f: impl FnOnce(&mut JobState)) {
        f(&mut lock(&self.slot_of(ticket).public).state);
    }

    /// Pops queued jobs until one has work to do, and starts it.
    ///
    /// Jobs that fail to resolve or have nothing to load finish right here.
    fn process_queue(&self) {
        loop {
            let Some(entry) = lock(&self.queue).pop_front() else {
                return;
            };
            let ticket = entry.ticket;
            let mut internal = lock(&self.slot_of(ticket).internal);

            let resolved = {
                let loaded = read(&self.assets);
                resolve_layers(
                    entry.request.iter().copied(),
                    |uuid| self.database.dependencies_of(uuid).iter().copied(),
                    |uuid| loaded.contains(uuid),
                )
            };
            let layers = match resolved {
                Ok(layers) => layers,
                Err(e) => {
                    log::error!("Asset load job {} cannot be resolved: {}", ticket, e);
                    self.finish(ticket, &mut internal, JobStatus::Failed);
                    continue;
                }
            };

            if let Some(missing) = layers
                .production_order()
                .iter()
                .flatten()
                .find(|uuid| !self.database.contains(uuid))
            {
                log::error!(
                    "Asset load job {} depends on asset {} which is not in the database",
                    ticket,
                    missing
                );
                self.finish(ticket, &mut internal, JobStatus::Failed);
                continue;
            }

            if layers.is_empty() {
                log::debug!("Asset load job {} has nothing to load", ticket);
                self.finish(ticket, &mut internal, JobStatus::Completed);
                continue;
            }

            let total = layers.len();
            log::debug!(
                "Asset load job {} resolved to {} layers ({} assets)",
                ticket,
                total,
                layers.node_count()
            );
            internal.layers = layers.into_consumption_order();
            self.publish(ticket, |state| {
                state.status = JobStatus::Processing;
                state.layers_total = total;
            });
            *lock(&self.active) = Some(ticket);

            // Start on the first layer without waiting for the next update.
            self.advance(ticket, &mut internal);
            return;
        }
    }

    /// Submits the current layer, or retires it once every task is finished.
    fn advance(&self, ticket: JobTicket, internal: &mut JobStateInternal) {
        if !internal.submitted {
            self.submit_layer(internal);
            return;
        }
        if internal.in_flight.iter().any(|(_, task)| !task.is_finished()) {
            return;
        }

        self.absorb_layer(ticket, internal);
        internal.active_layer += 1;
        internal.submitted = false;
        if !internal.failed {
            let done = internal.active_layer;
            self.publish(ticket, |state| state.layers_done = done);
        }

        if internal.failed {
            self.finish(ticket, internal, JobStatus::Failed);
        } else if internal.active_layer >= internal.layers.len() {
            self.finish(ticket, internal, JobStatus::Completed);
        } else {
            self.submit_layer(internal);
        }
    }

    fn submit_layer(&self, internal: &mut JobStateInternal) {
        let mut tasks: Vec<Box<dyn Task>> = Vec::new();
        let mut uuids = Vec::new();
        {
            let loaded = read(&self.assets);
            for uuid in &internal.layers[internal.active_layer] {
                if let Some(asset) = loaded.get_erased(uuid) {
                    internal.assets.pin(*uuid, asset);
                    continue;
                }
                // Checked when the job was resolved.
                let Some(metadata) = self.database.get(uuid) else {
                    continue;
                };
                tasks.push(Box::new(AssetLoadTask::new(
                    metadata.clone(),
                    self.loaders.clone(),
                    self.source.clone(),
                    self.assets.clone(),
                )));
                uuids.push(*uuid);
            }
        }

        let handles = self.scheduler.submit(tasks);
        internal.in_flight = uuids.into_iter().zip(handles).collect();
        internal.submitted = true;
    }

    fn absorb_layer(&self, ticket: JobTicket, internal: &mut JobStateInternal) {
        let loaded = read(&self.assets);
        for (uuid, task) in internal.in_flight.drain(..) {
            match (task.status(), loaded.get_erased(&uuid)) {
                (TaskStatus::Completed, Some(asset)) => internal.assets.pin(uuid, asset),
                (status, _) => {
                    internal.failed = true;
                    let reason = task.failure().map(|e| e.to_string()).unwrap_or_default();
                    log::error!(
                        "Asset load job {}: '{}' ended {:?} {}",
                        ticket,
                        task.name(),
                        status,
                        reason
                    );
                }
            }
        }
    }

    fn finish(&self, ticket: JobTicket, internal: &mut JobStateInternal, status: JobStatus) {
        {
            let loaded = read(&self.assets);
            for uuid in &internal.requested {
                if internal.assets.contains(uuid) {
                    continue;
                }
                if let Some(asset) = loaded.get_erased(uuid) {
                    internal.assets.pin(*uuid, asset);
                }
            }
        }
        internal.in_flight.clear();
        internal.submitted = false;

        if let Some(metrics) = &self.metrics {
            metrics.record(status);
        }
        self.publish(ticket, |state| state.status = status);
        if let Some(sender) = internal.completion.take() {
            // Nobody may be listening.
            let _ = sender.try_send(status);
        }

        let mut active = lock(&self.active);
        if *active == Some(ticket) {
            *active = None;
        }

        log::info!(
            "Asset load job {} {:?} with {} assets pinned",
            ticket,
            status,
            internal.assets.len()
        );
    }

    fn drive_until_finished(&self, ticket: JobTicket) -> Result<JobStatus, AgentError> {
        let tick = self.scheduler.is_main_thread();
        loop {
            let state = self.query(ticket)?;
            if state.status.is_terminal() {
                return Ok(state.status);
            }
            thread::yield_now();
            if tick {
                self.scheduler.tick();
            }
            self.update();
        }
    }

    fn await_completion(
        &self,
        ticket: JobTicket,
        completion: Option<Receiver<JobStatus>>,
    ) -> Result<JobStatus, AgentError> {
        let interval = self.config.wait_poll_interval;
        loop {
            let state = self.query(ticket)?;
            if state.status.is_terminal() {
                return Ok(state.status);
            }
            match &completion {
                Some(receiver) => match receiver.recv_timeout(interval) {
                    Ok(status) => return Ok(status),
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => thread::sleep(interval),
                },
                None => thread::sleep(interval),
            }
        }
    }
}

impl std::fmt::Debug for AssetAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetAgent")
            .field("assets", &self.database.len())
            .field("loaded", &self.loaded_count())
            .field("queued", &lock(&self.queue).len())
            .field("live_tickets", &self.live_tickets())
            .field("loaders", &self.loaders)
            .finish()
    }
}
