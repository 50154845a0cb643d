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

//! The task scheduler: drives submitted tasks through their three phases.

use super::config::SchedulerConfig;
use super::handle::{ScheduledTask, TaskHandle};
use super::worker::WorkerThread;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread::{self, ThreadId};
use strata_core::sync::lock;
use strata_core::{Task, TaskError, TaskStatus};
use strata_telemetry::metrics::MetricsResult;
use strata_telemetry::{CounterHandle, HistogramHandle, MetricsRegistry};

/// What one [`TaskScheduler::tick`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tasks taken from the pending queue and prepared.
    pub prepared: usize,
    /// Tasks handed to workers.
    pub dispatched: usize,
    /// Tasks retired as `Completed`.
    pub completed: usize,
    /// Tasks retired as `Failed`, including those that failed to prepare.
    pub failed: usize,
    /// The worker that received the first chunk, if anything was dispatched.
    pub first_worker: Option<usize>,
}

struct SchedulerMetrics {
    completed_total: CounterHandle,
    failed_total: CounterHandle,
    execute_time: HistogramHandle,
}

impl SchedulerMetrics {
    fn new(registry: &MetricsRegistry) -> MetricsResult<Self> {
        Ok(Self {
            completed_total: registry.register_counter(
                "tasks",
                "completed_total",
                "Tasks retired successfully",
            )?,
            failed_total: registry.register_counter(
                "tasks",
                "failed_total",
                "Tasks retired as failed",
            )?,
            execute_time: registry.register_histogram(
                "tasks",
                "execute_time",
                "Time spent in the execute phase",
                "ms",
                vec![0.1, 1.0, 5.0, 16.0, 33.0, 100.0, 500.0],
            )?,
        })
    }

    fn record(&self, status: TaskStatus, execute_ms: f64) {
        let counter = if status == TaskStatus::Completed {
            &self.completed_total
        } else {
            &self.failed_total
        };
        if let Err(e) = counter.increment() {
            log::warn!("Failed to record task outcome: {}", e);
        }
        if let Err(e) = self.execute_time.observe(execute_ms) {
            log::warn!("Failed to record execute time: {}", e);
        }
    }
}

/// Distributes three-phase tasks over a fixed pool of worker threads.
///
/// The thread that builds the scheduler is its main thread: `tick` must be
/// called from it, once per frame. `prepare` and `finalize` run there;
/// `execute` runs on exactly one worker. `submit` may be called from any
/// thread.
pub struct TaskScheduler {
    workers: Vec<WorkerThread>,
    pending: Mutex<Vec<ScheduledTask>>,
    /// Worker that received the first chunk on the last dispatching tick.
    last_start: AtomicUsize,
    main_thread: ThreadId,
    shut_down: AtomicBool,
    metrics: Option<SchedulerMetrics>,
}

impl TaskScheduler {
    /// Spawns the workers described by `config`.
    pub fn new(config: SchedulerConfig) -> io::Result<Self> {
        let count = config.resolved_worker_count();
        let workers = (0..count)
            .map(|index| WorkerThread::spawn(index, config.idle))
            .collect::<io::Result<Vec<_>>>()?;
        log::info!("Task scheduler started with {} worker(s)", count);

        Ok(Self {
            workers,
            pending: Mutex::new(Vec::new()),
            last_start: AtomicUsize::new(count - 1),
            main_thread: thread::current().id(),
            shut_down: AtomicBool::new(false),
            metrics: None,
        })
    }

    /// Like [`TaskScheduler::new`], reporting task outcomes and execute times
    /// to `registry`.
    pub fn with_metrics(config: SchedulerConfig, registry: &MetricsRegistry) -> io::Result<Self> {
        let mut scheduler = Self::new(config)?;
        match SchedulerMetrics::new(registry) {
            Ok(metrics) => scheduler.metrics = Some(metrics),
            Err(e) => log::warn!("Task scheduler runs without metrics: {}", e),
        }
        Ok(scheduler)
    }

    /// Queues tasks for the next tick and marks them `Processing`.
    pub fn submit(&self, tasks: impl IntoIterator<Item = Box<dyn Task>>) -> Vec<TaskHandle> {
        let (envelopes, handles): (Vec<_>, Vec<_>) =
            tasks.into_iter().map(ScheduledTask::new).unzip();

        if self.shut_down.load(Ordering::Acquire) {
            log::warn!(
                "Submitted {} task(s) to a scheduler that has shut down",
                envelopes.len()
            );
            for mut scheduled in envelopes {
                abandon(&mut scheduled);
            }
            return handles;
        }

        lock(&self.pending).extend(envelopes);
        handles
    }

    /// Queues a single task.
    pub fn submit_one(&self, task: Box<dyn Task>) -> TaskHandle {
        let mut handles = self.submit(std::iter::once(task));
        // One task in, one handle out.
        handles.remove(0)
    }

    /// Runs one scheduling step on the main thread.
    ///
    /// 1. Takes every pending task and runs `prepare` on each, in order.
    /// 2. Splits the prepared tasks into chunks of `ceil(n / workers)` and
    ///    hands chunk `k` to worker `(first + k) % workers`, where `first`
    ///    moves one worker forward on every tick that dispatches work.
    /// 3. Fetches every finished task from every worker and runs `finalize`.
    pub fn tick(&self) -> TickReport {
        let mut report = TickReport::default();
        if !self.is_main_thread() {
            log::error!("TaskScheduler::tick called off the main thread; ignored");
            return report;
        }
        if self.shut_down.load(Ordering::Acquire) {
            return report;
        }

        let batch = std::mem::take(&mut *lock(&self.pending));
        let mut ready = Vec::with_capacity(batch.len());
        for mut scheduled in batch {
            report.prepared += 1;
            match scheduled.run_prepare() {
                Ok(()) => ready.push(scheduled),
                Err(error) => {
                    log::warn!("Task '{}' failed to prepare: {}", scheduled.name(), error);
                    scheduled.discard(&error);
                    self.retire_failed(&scheduled, error);
                    report.failed += 1;
                }
            }
        }

        if !ready.is_empty() {
            report.dispatched = ready.len();
            report.first_worker = Some(self.dispatch(ready));
        }

        for worker in &self.workers {
            for mut scheduled in worker.fetch() {
                if scheduled.state().status() != TaskStatus::Processing {
                    continue;
                }
                match scheduled.run_finalize() {
                    Ok(()) => {
                        self.retire(&scheduled, TaskStatus::Completed);
                        report.completed += 1;
                    }
                    Err(error) => {
                        log::warn!("Task '{}' failed: {}", scheduled.name(), error);
                        self.retire_failed(&scheduled, error);
                        report.failed += 1;
                    }
                }
            }
        }

        report
    }

    fn dispatch(&self, ready: Vec<ScheduledTask>) -> usize {
        let worker_count = self.workers.len();
        let first = (self.last_start.load(Ordering::Relaxed) + 1) % worker_count;
        self.last_start.store(first, Ordering::Relaxed);

        let chunk_size = ready.len().div_ceil(worker_count);
        let mut tasks = ready.into_iter();
        for k in 0..worker_count {
            let chunk: Vec<ScheduledTask> = tasks.by_ref().take(chunk_size).collect();
            if chunk.is_empty() {
                break;
            }
            self.workers[(first + k) % worker_count].enqueue(chunk);
        }
        first
    }

    fn retire(&self, scheduled: &ScheduledTask, status: TaskStatus) {
        let state = scheduled.state();
        if let Some(metrics) = &self.metrics {
            metrics.record(status, state.execute_time().as_secs_f64() * 1000.0);
        }
        state.set_status(status);
    }

    fn retire_failed(&self, scheduled: &ScheduledTask, error: TaskError) {
        let state = scheduled.state();
        if let Some(metrics) = &self.metrics {
            metrics.record(TaskStatus::Failed, state.execute_time().as_secs_f64() * 1000.0);
        }
        state.fail(error);
    }

    /// Returns `true` on the thread that built the scheduler.
    pub fn is_main_thread(&self) -> bool {
        thread::current().id() == self.main_thread
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Number of tasks waiting for the next tick.
    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Stops every worker and fails all tasks that were not retired yet with
    /// [`TaskError::Abandoned`]. Later calls do nothing.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        for worker in &self.workers {
            worker.kill();
        }

        let mut leftovers = std::mem::take(&mut *lock(&self.pending));
        for worker in &self.workers {
            leftovers.extend(worker.drain());
        }
        if !leftovers.is_empty() {
            log::warn!("Abandoning {} unfinished task(s) at shutdown", leftovers.len());
        }
        for mut scheduled in leftovers {
            abandon(&mut scheduled);
        }
        log::info!("Task scheduler shut down");
    }
}

fn abandon(scheduled: &mut ScheduledTask) {
    let error = TaskError::Abandoned;
    scheduled.discard(&error);
    scheduled.state().fail(error);
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("workers", &self.workers.len())
            .field("pending", &self.pending_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn scheduler(workers: usize) -> TaskScheduler {
        TaskScheduler::new(SchedulerConfig::default().with_worker_count(workers)).unwrap()
    }

    fn tick_until_finished(scheduler: &TaskScheduler, handles: &[TaskHandle]) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !handles.iter().all(TaskHandle::is_finished) {
            assert!(Instant::now() < deadline, "tasks did not finish in time");
            scheduler.tick();
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[derive(Default)]
    struct Phases {
        prepared: AtomicUsize,
        executed: AtomicUsize,
        finalized: AtomicUsize,
        discarded: AtomicUsize,
    }

    struct Probe {
        phases: Arc<Phases>,
        fail_prepare: bool,
        fail_execute: bool,
        main: ThreadId,
    }

    impl Probe {
        fn new(phases: &Arc<Phases>) -> Self {
            Self {
                phases: phases.clone(),
                fail_prepare: false,
                fail_execute: false,
                main: thread::current().id(),
            }
        }
    }

    impl Task for Probe {
        fn prepare(&mut self) -> Result<(), TaskError> {
            assert_eq!(thread::current().id(), self.main);
            self.phases.prepared.fetch_add(1, Ordering::SeqCst);
            if self.fail_prepare {
                return Err(TaskError::Prepare("no".into()));
            }
            Ok(())
        }
        fn execute(&mut self) -> Result<(), TaskError> {
            assert_ne!(thread::current().id(), self.main);
            self.phases.executed.fetch_add(1, Ordering::SeqCst);
            if self.fail_execute {
                return Err(TaskError::Execute("no".into()));
            }
            Ok(())
        }
        fn finalize(&mut self) -> Result<(), TaskError> {
            assert_eq!(thread::current().id(), self.main);
            self.phases.finalized.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn discard(&mut self, _error: &TaskError) {
            self.phases.discarded.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_phases_run_on_the_right_threads() {
        let scheduler = scheduler(2);
        let phases = Arc::new(Phases::default());
        let handles = scheduler.submit((0..8).map(|_| Box::new(Probe::new(&phases)) as Box<dyn Task>));
        assert!(handles.iter().all(|h| h.status() == TaskStatus::Processing));

        tick_until_finished(&scheduler, &handles);

        assert!(handles.iter().all(|h| h.status() == TaskStatus::Completed));
        assert_eq!(phases.prepared.load(Ordering::SeqCst), 8);
        assert_eq!(phases.executed.load(Ordering::SeqCst), 8);
        assert_eq!(phases.finalized.load(Ordering::SeqCst), 8);
        assert!(handles.iter().all(|h| h.worker_name().is_some()));
    }

    #[test]
    fn test_failed_prepare_is_never_dispatched() {
        let scheduler = scheduler(1);
        let phases = Arc::new(Phases::default());
        let mut probe = Probe::new(&phases);
        probe.fail_prepare = true;
        let handle = scheduler.submit_one(Box::new(probe));

        let report = scheduler.tick();
        assert_eq!(report.prepared, 1);
        assert_eq!(report.dispatched, 0);
        assert_eq!(report.failed, 1);
        assert_eq!(report.first_worker, None);

        assert_eq!(handle.status(), TaskStatus::Failed);
        assert_eq!(handle.failure(), Some(TaskError::Prepare("no".into())));
        assert_eq!(phases.executed.load(Ordering::SeqCst), 0);
        assert_eq!(phases.discarded.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_execute_skips_finalize_but_not_siblings() {
        let scheduler = scheduler(1);
        let phases = Arc::new(Phases::default());
        let mut failing = Probe::new(&phases);
        failing.fail_execute = true;
        let tasks: Vec<Box<dyn Task>> = vec![
            Box::new(failing),
            Box::new(Probe::new(&phases)),
            Box::new(Probe::new(&phases)),
        ];
        let handles = scheduler.submit(tasks);

        tick_until_finished(&scheduler, &handles);

        assert_eq!(handles[0].status(), TaskStatus::Failed);
        assert_eq!(handles[1].status(), TaskStatus::Completed);
        assert_eq!(handles[2].status(), TaskStatus::Completed);
        assert_eq!(phases.executed.load(Ordering::SeqCst), 3);
        assert_eq!(phases.finalized.load(Ordering::SeqCst), 2);
        assert_eq!(phases.discarded.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_first_chunk_rotates_across_ticks() {
        let scheduler = scheduler(3);
        let mut firsts = Vec::new();
        for _ in 0..6 {
            scheduler.submit_one(Box::new(Probe::new(&Arc::default())));
            firsts.push(scheduler.tick().first_worker.unwrap());
        }
        assert_eq!(firsts, vec![0, 1, 2, 0, 1, 2]);

        // Ticks without work do not advance the rotation: worker 0 is next,
        // not worker 1.
        assert_eq!(scheduler.tick().first_worker, None);
        scheduler.submit_one(Box::new(Probe::new(&Arc::default())));
        assert_eq!(scheduler.tick().first_worker, Some(0));
    }

    #[test]
    fn test_each_task_runs_on_at_most_one_worker() {
        struct Exclusive {
            in_execute: Arc<AtomicUsize>,
            runs: Arc<AtomicUsize>,
        }
        impl Task for Exclusive {
            fn execute(&mut self) -> Result<(), TaskError> {
                assert_eq!(self.in_execute.fetch_add(1, Ordering::SeqCst), 0);
                std::thread::sleep(Duration::from_micros(200));
                self.in_execute.fetch_sub(1, Ordering::SeqCst);
                self.runs.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }

        let scheduler = scheduler(4);
        let counters: Vec<(Arc<AtomicUsize>, Arc<AtomicUsize>)> =
            (0..64).map(|_| (Arc::default(), Arc::default())).collect();
        let handles = scheduler.submit(counters.iter().map(|(in_execute, runs)| {
            Box::new(Exclusive {
                in_execute: in_execute.clone(),
                runs: runs.clone(),
            }) as Box<dyn Task>
        }));

        tick_until_finished(&scheduler, &handles);

        assert!(handles.iter().all(|h| h.status() == TaskStatus::Completed));
        assert!(counters.iter().all(|(_, runs)| runs.load(Ordering::SeqCst) == 1));
    }

    #[test]
    fn test_metrics_are_recorded() {
        let registry = MetricsRegistry::new();
        let scheduler =
            TaskScheduler::with_metrics(SchedulerConfig::default().with_worker_count(1), &registry)
                .unwrap();
        let phases = Arc::new(Phases::default());
        let mut failing = Probe::new(&phases);
        failing.fail_execute = true;
        let tasks: Vec<Box<dyn Task>> = vec![Box::new(failing), Box::new(Probe::new(&phases))];
        let handles = scheduler.submit(tasks);

        tick_until_finished(&scheduler, &handles);

        assert_eq!(registry.counter_value("tasks", "completed_total").unwrap(), 1);
        assert_eq!(registry.counter_value("tasks", "failed_total").unwrap(), 1);
    }

    #[test]
    fn test_shutdown_abandons_pending_tasks() {
        let scheduler = scheduler(1);
        let handle = scheduler.submit_one(Box::new(Probe::new(&Arc::default())));
        scheduler.shutdown();

        assert_eq!(handle.status(), TaskStatus::Failed);
        assert_eq!(handle.failure(), Some(TaskError::Abandoned));

        let late = scheduler.submit_one(Box::new(Probe::new(&Arc::default())));
        assert_eq!(late.status(), TaskStatus::Failed);
    }

    #[test]
    fn test_tick_off_main_thread_is_ignored() {
        let scheduler = Arc::new(scheduler(1));
        scheduler.submit_one(Box::new(Probe::new(&Arc::default())));

        let remote = scheduler.clone();
        let report = std::thread::spawn(move || remote.tick()).join().unwrap();
        assert_eq!(report, TickReport::default());
        assert_eq!(scheduler.pending_count(), 1);
    }
}
