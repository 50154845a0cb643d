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

use std::num::NonZeroUsize;
use std::time::Duration;

/// Upper bound for the worker count picked from the hardware.
pub const MAX_DEFAULT_WORKERS: usize = 4;

/// How an idle worker backs off.
///
/// A worker counts consecutive cycles in which it found no work. Below
/// `short_after` it only yields; from `short_after` it sleeps `short_pause`;
/// from `long_after` it sleeps `long_pause`. New work wakes it immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleBackoff {
    /// Idle cycles before the short pause kicks in.
    pub short_after: u32,
    /// The short pause.
    pub short_pause: Duration,
    /// Idle cycles before the long pause kicks in.
    pub long_after: u32,
    /// The long pause.
    pub long_pause: Duration,
}

impl Default for IdleBackoff {
    fn default() -> Self {
        Self {
            short_after: 16,
            short_pause: Duration::from_millis(32),
            long_after: 128,
            long_pause: Duration::from_millis(256),
        }
    }
}

impl IdleBackoff {
    /// The pause for a worker that has been idle for `idle_cycles` cycles,
    /// or `None` if it should only yield.
    pub fn pause_for(&self, idle_cycles: u32) -> Option<Duration> {
        if idle_cycles >= self.long_after {
            Some(self.long_pause)
        } else if idle_cycles >= self.short_after {
            Some(self.short_pause)
        } else {
            None
        }
    }
}

/// Configuration of a [`TaskScheduler`](super::TaskScheduler).
#[derive(Debug, Clone, Default)]
pub struct SchedulerConfig {
    /// Number of worker threads. `None` picks a count from the hardware.
    pub worker_count: Option<usize>,
    /// Idle policy of every worker.
    pub idle: IdleBackoff,
}

impl SchedulerConfig {
    /// Sets an explicit worker count (at least one worker is always spawned).
    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = Some(count);
        self
    }

    /// Sets the idle policy.
    pub fn with_idle_backoff(mut self, idle: IdleBackoff) -> Self {
        self.idle = idle;
        self
    }

    /// The number of workers this configuration spawns.
    pub fn resolved_worker_count(&self) -> usize {
        self.worker_count
            .map(|count| count.max(1))
            .unwrap_or_else(default_worker_count)
    }
}

/// Picks a worker count from the available parallelism of the machine.
pub fn default_worker_count() -> usize {
    let hardware = std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1);
    workers_for_parallelism(hardware)
}

/// Maps a hardware thread count to a worker count.
///
/// Machines with six or more hardware threads keep four of them free.
pub fn workers_for_parallelism(hardware_threads: usize) -> usize {
    let workers = if hardware_threads >= 6 {
        hardware_threads - 4
    } else if hardware_threads >= 4 {
        2
    } else {
        1
    };
    workers.clamp(1, MAX_DEFAULT_WORKERS)
}
