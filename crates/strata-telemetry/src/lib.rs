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

//! # Strata Telemetry
//!
//! Observability plumbing shared by the scheduler and the asset agent:
//! logger initialisation, an in-memory metrics registry, and timers that
//! feed histograms.

#![warn(missing_docs)]

pub mod logging;
pub mod metrics;
pub mod timer;

pub use logging::{init_logging, init_test_logging};
pub use metrics::{CounterHandle, HistogramHandle, MetricsRegistry};
pub use timer::{ScopedMetricTimer, Stopwatch};
