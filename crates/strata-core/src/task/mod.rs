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

//! The three-phase task contract.
//!
//! A [`Task`] moves through three phases, each on a well-defined thread:
//! 1. `prepare` runs on the submitting thread, before any worker sees the task.
//! 2. `execute` runs exactly once, on exactly one worker thread.
//! 3. `finalize` runs back on the submitting thread, after the task has been
//!    fetched from its worker. This is where results are published.

use std::fmt;

/// The observable lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum TaskStatus {
    /// The task has not been submitted.
    #[default]
    Unused = 0,
    /// The task was submitted and has not been retired yet.
    Processing = 1,
    /// Every phase succeeded.
    Completed = 2,
    /// A phase failed, panicked, or the task was abandoned at shutdown.
    Failed = 3,
}

impl TaskStatus {
    /// Returns `true` for `Completed` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Decodes a status stored in an atomic cell.
    ///
    /// Unknown values map to `Failed`.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => TaskStatus::Unused,
            1 => TaskStatus::Processing,
            2 => TaskStatus::Completed,
            _ => TaskStatus::Failed,
        }
    }
}

/// The phase a task was in when something went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskPhase {
    /// Submitting-thread setup.
    Prepare,
    /// Worker-thread body.
    Execute,
    /// Submitting-thread publication.
    Finalize,
}

impl fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskPhase::Prepare => "prepare",
            TaskPhase::Execute => "execute",
            TaskPhase::Finalize => "finalize",
        };
        f.write_str(name)
    }
}

/// The reason a task ended in [`TaskStatus::Failed`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    /// `prepare` reported a failure.
    #[error("prepare failed: {0}")]
    Prepare(String),
    /// `execute` reported a failure.
    #[error("execute failed: {0}")]
    Execute(String),
    /// `finalize` reported a failure.
    #[error("finalize failed: {0}")]
    Finalize(String),
    /// A phase panicked. The panic was contained by the scheduler.
    #[error("{phase} panicked: {message}")]
    Panicked {
        /// The phase that panicked.
        phase: TaskPhase,
        /// The panic payload, when it was a string.
        message: String,
    },
    /// The scheduler shut down before the task was retired.
    #[error("task abandoned at scheduler shutdown")]
    Abandoned,
}

impl TaskError {
    /// Builds a [`TaskError::Panicked`] from a caught panic payload.
    pub fn from_panic(phase: TaskPhase, payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        TaskError::Panicked { phase, message }
    }
}

/// A unit of deferred work with three sequential phases.
///
/// The scheduler owns the task exclusively for its whole life and hands it
/// between threads only under the lock of the destination buffer, so
/// implementations need `Send` but not `Sync`.
///
/// Every phase defaults to success, so a task only overrides what it needs.
pub trait Task: Send {
    /// A short label used in logs.
    fn name(&self) -> &str {
        "task"
    }

    /// Runs on the submitting thread before the task is dispatched.
    ///
    /// May touch resources that are not safe to touch from workers.
    /// An error here means the task is never dispatched.
    fn prepare(&mut self) -> Result<(), TaskError> {
        Ok(())
    }

    /// Runs on a worker thread. Must not touch submitting-thread-only resources.
    fn execute(&mut self) -> Result<(), TaskError> {
        Ok(())
    }

    /// Runs on the submitting thread once `execute` has returned successfully.
    fn finalize(&mut self) -> Result<(), TaskError> {
        Ok(())
    }

    /// Cleanup hook run on the submitting thread instead of `finalize`
    /// when `prepare` or `execute` failed.
    fn discard(&mut self, _error: &TaskError) {}
}
