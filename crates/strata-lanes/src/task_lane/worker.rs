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

//! A single background worker with double-buffered task exchange.

use super::config::IdleBackoff;
use super::handle::ScheduledTask;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle, Thread};
use strata_core::sync::lock;

#[derive(Default)]
struct Buffers {
    incoming: Mutex<Vec<ScheduledTask>>,
    outgoing: Mutex<Vec<ScheduledTask>>,
}

/// One OS thread that runs the `execute` phase of the tasks handed to it.
///
/// Tasks arrive through `enqueue` into the incoming buffer. The worker swaps
/// that buffer into a private list, executes the tasks strictly one after
/// the other without holding any lock, and pushes each finished task into the
/// outgoing buffer, from which `fetch` collects them.
pub struct WorkerThread {
    index: usize,
    name: String,
    buffers: Arc<Buffers>,
    running: Arc<AtomicBool>,
    thread: Thread,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl WorkerThread {
    /// Spawns worker number `index`, named `#<index>`.
    pub fn spawn(index: usize, idle: IdleBackoff) -> io::Result<Self> {
        let name = format!("#{index}");
        let buffers = Arc::new(Buffers::default());
        let running = Arc::new(AtomicBool::new(true));

        let join = thread::Builder::new()
            .name(format!("strata-worker{name}"))
            .spawn({
                let name = name.clone();
                let buffers = buffers.clone();
                let running = running.clone();
                move || run(&name, &buffers, &running, idle)
            })?;

        log::debug!("Spawned worker {}", name);
        Ok(Self {
            index,
            name,
            buffers,
            running,
            thread: join.thread().clone(),
            join: Mutex::new(Some(join)),
        })
    }

    /// The worker's index in its scheduler.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The worker's name, `#<index>`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hands tasks to the worker and wakes it up.
    pub fn enqueue(&self, tasks: Vec<ScheduledTask>) {
        if tasks.is_empty() {
            return;
        }
        lock(&self.buffers.incoming).extend(tasks);
        self.thread.unpark();
    }

    /// Takes every task the worker has finished executing since the last fetch.
    pub fn fetch(&self) -> Vec<ScheduledTask> {
        std::mem::take(&mut *lock(&self.buffers.outgoing))
    }

    /// Returns `true` until the worker has been killed.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stops the worker and waits for its thread to exit. The task being
    /// executed, if any, runs to completion first.
    pub fn kill(&self) {
        self.running.store(false, Ordering::Release);
        self.thread.unpark();
        if let Some(join) = lock(&self.join).take() {
            if join.join().is_err() {
                log::error!("Worker {} terminated abnormally", self.name);
            } else {
                log::debug!("Worker {} stopped", self.name);
            }
        }
    }

    /// Takes every task still held by the worker, executed or not.
    pub(crate) fn drain(&self) -> Vec<ScheduledTask> {
        let mut tasks = self.fetch();
        tasks.append(&mut lock(&self.buffers.incoming));
        tasks
    }
}

impl Drop for WorkerThread {
    fn drop(&mut self) {
        self.kill();
    }
}

impl std::fmt::Debug for WorkerThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerThread")
            .field("name", &self.name)
            .field("running", &self.is_running())
            .finish()
    }
}

fn run(name: &str, buffers: &Buffers, running: &AtomicBool, idle: IdleBackoff) {
    let mut working: Vec<ScheduledTask> = Vec::new();
    let mut idle_cycles: u32 = 0;

    while running.load(Ordering::Acquire) {
        std::mem::swap(&mut *lock(&buffers.incoming), &mut working);

        if working.is_empty() {
            idle_cycles = idle_cycles.saturating_add(1);
            match idle.pause_for(idle_cycles) {
                Some(pause) => thread::park_timeout(pause),
                None => thread::yield_now(),
            }
            continue;
        }

        idle_cycles = 0;
        log::trace!("Worker {} picked up {} task(s)", name, working.len());
        for mut scheduled in working.drain(..) {
            scheduled.run_execute(name);
            lock(&buffers.outgoing).push(scheduled);
        }
    }
}
