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

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};
use strata_core::sync::lock;
use strata_core::{Task, TaskError, TaskPhase, TaskStatus};

/// Observable state of one task, shared between its envelope and its handles.
#[derive(Debug, Default)]
pub(crate) struct TaskState {
    status: AtomicU8,
    worker: OnceLock<String>,
    execute_micros: AtomicU64,
    failure: Mutex<Option<TaskError>>,
}

impl TaskState {
    pub(crate) fn status(&self) -> TaskStatus {
        TaskStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub(crate) fn set_status(&self, status: TaskStatus) {
        self.status.store(status as u8, Ordering::Release);
    }

    pub(crate) fn fail(&self, error: TaskError) {
        *lock(&self.failure) = Some(error);
        self.set_status(TaskStatus::Failed);
    }

    fn record_execution(&self, worker: &str, elapsed: Duration) {
        let _ = self.worker.set(worker.to_string());
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.execute_micros.store(micros, Ordering::Relaxed);
    }

    pub(crate) fn execute_time(&self) -> Duration {
        Duration::from_micros(self.execute_micros.load(Ordering::Relaxed))
    }
}

/// A cheap, clonable view of a submitted task.
///
/// The scheduler owns the task itself; a handle only observes its progress.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    name: Arc<str>,
    state: Arc<TaskState>,
}

impl TaskHandle {
    /// The task's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The current status.
    pub fn status(&self) -> TaskStatus {
        self.state.status()
    }

    /// Returns `true` once the task is `Completed` or `Failed`.
    pub fn is_finished(&self) -> bool {
        self.status().is_terminal()
    }

    /// Name of the worker that ran `execute`, once it has run.
    pub fn worker_name(&self) -> Option<&str> {
        self.state.worker.get().map(String::as_str)
    }

    /// Time spent in `execute`.
    pub fn execute_time(&self) -> Duration {
        self.state.execute_time()
    }

    /// Why the task failed, if it did.
    pub fn failure(&self) -> Option<TaskError> {
        lock(&self.state.failure).clone()
    }
}

/// A task in flight, together with the bookkeeping the scheduler needs.
///
/// Envelopes are moved, never shared: from the pending queue to one worker's
/// incoming buffer, to its outgoing buffer, and back to the scheduler.
pub struct ScheduledTask {
    task: Box<dyn Task>,
    name: Arc<str>,
    state: Arc<TaskState>,
    execute_error: Option<TaskError>,
}

impl ScheduledTask {
    /// Wraps a task and marks it `Processing`.
    pub fn new(task: Box<dyn Task>) -> (Self, TaskHandle) {
        let name: Arc<str> = Arc::from(task.name());
        let state = Arc::new(TaskState::default());
        state.set_status(TaskStatus::Processing);
        let handle = TaskHandle {
            name: name.clone(),
            state: state.clone(),
        };
        let scheduled = Self {
            task,
            name,
            state,
            execute_error: None,
        };
        (scheduled, handle)
    }

    /// The task's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn state(&self) -> &TaskState {
        &self.state
    }

    pub(crate) fn run_prepare(&mut self) -> Result<(), TaskError> {
        let task = &mut self.task;
        contain(TaskPhase::Prepare, || task.prepare())
    }

    /// Runs `execute` and records the outcome, the worker, and the duration.
    /// A panic is recorded as a failure.
    pub(crate) fn run_execute(&mut self, worker: &str) {
        let started = Instant::now();
        let task = &mut self.task;
        let outcome = contain(TaskPhase::Execute, || task.execute());
        self.state.record_execution(worker, started.elapsed());
        self.execute_error = outcome.err();
    }

    /// Runs `finalize` if every earlier phase succeeded, `discard` otherwise.
    pub(crate) fn run_finalize(&mut self) -> Result<(), TaskError> {
        match self.execute_error.take() {
            Some(error) => {
                self.discard(&error);
                Err(error)
            }
            None => {
                let task = &mut self.task;
                contain(TaskPhase::Finalize, || task.finalize())
            }
        }
    }

    pub(crate) fn discard(&mut self, error: &TaskError) {
        let task = &mut self.task;
        if contain(TaskPhase::Finalize, || {
            task.discard(error);
            Ok(())
        })
        .is_err()
        {
            log::error!("Task '{}' panicked while discarding", self.name);
        }
    }
}

impl std::fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("name", &self.name)
            .field("status", &self.state.status())
            .finish()
    }
}

fn contain(
    phase: TaskPhase,
    f: impl FnOnce() -> Result<(), TaskError>,
) -> Result<(), TaskError> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(TaskError::from_panic(phase, payload.as_ref())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named;
    impl Task for Named {
        fn name(&self) -> &str {
            "named"
        }
        fn execute(&mut self) -> Result<(), TaskError> {
            panic!("worker blew up")
        }
    }

    #[test]
    fn test_new_envelope_is_processing() {
        let (scheduled, handle) = ScheduledTask::new(Box::new(Named));
        assert_eq!(scheduled.name(), "named");
        assert_eq!(handle.name(), "named");
        assert_eq!(handle.status(), TaskStatus::Processing);
        assert!(!handle.is_finished());
        assert!(handle.worker_name().is_none());
    }

    #[test]
    fn test_execute_panic_is_recorded() {
        let (mut scheduled, handle) = ScheduledTask::new(Box::new(Named));
        scheduled.run_execute("#0");

        assert_eq!(handle.worker_name(), Some("#0"));
        // Status only changes when the scheduler retires the task.
        assert_eq!(handle.status(), TaskStatus::Processing);

        let error = scheduled.run_finalize().unwrap_err();
        assert!(matches!(
            error,
            TaskError::Panicked {
                phase: TaskPhase::Execute,
                ..
            }
        ));
    }
}
