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

//! Registry for managing metrics.

use super::types::{Metric, MetricId, MetricType, MetricValue, MetricsError, MetricsResult};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

type MetricStore = Arc<RwLock<HashMap<MetricId, Metric>>>;

fn with_metric<R>(
    store: &MetricStore,
    id: &MetricId,
    f: impl FnOnce(&mut Metric) -> MetricsResult<R>,
) -> MetricsResult<R> {
    let mut metrics = store
        .write()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let metric = metrics
        .get_mut(id)
        .ok_or_else(|| MetricsError::MetricNotFound(id.clone()))?;
    f(metric)
}

/// Central, thread-safe registry for the pipeline's metrics.
///
/// Cloning the registry is cheap; every clone observes the same metrics.
#[derive(Debug, Clone, Default)]
pub struct MetricsRegistry {
    metrics: MetricStore,
}

impl MetricsRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a counter, or returns a handle to the existing one.
    ///
    /// Fails with [`MetricsError::TypeMismatch`] if the id is already used by
    /// a histogram.
    pub fn register_counter(
        &self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> MetricsResult<CounterHandle> {
        let id = MetricId::new(namespace, name);
        self.register(Metric::new_counter(id.clone(), description))?;
        Ok(CounterHandle {
            id,
            store: self.metrics.clone(),
        })
    }

    /// Registers a histogram, or returns a handle to the existing one.
    pub fn register_histogram(
        &self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        unit: impl Into<String>,
        buckets: Vec<f64>,
    ) -> MetricsResult<HistogramHandle> {
        let id = MetricId::new(namespace, name);
        self.register(Metric::new_histogram(id.clone(), description, unit, buckets))?;
        Ok(HistogramHandle {
            id,
            store: self.metrics.clone(),
        })
    }

    fn register(&self, metric: Metric) -> MetricsResult<()> {
        let mut metrics = self
            .metrics
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(existing) = metrics.get(&metric.id) {
            let found = existing.value.metric_type();
            let expected = metric.value.metric_type();
            return if found == expected {
                Ok(())
            } else {
                Err(MetricsError::TypeMismatch { expected, found })
            };
        }
        metrics.insert(metric.id.clone(), metric);
        Ok(())
    }

    /// Returns a snapshot of a metric.
    pub fn get_metric(&self, id: &MetricId) -> MetricsResult<Metric> {
        self.metrics
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| MetricsError::MetricNotFound(id.clone()))
    }

    /// Returns the current value of the counter `namespace:name`.
    pub fn counter_value(&self, namespace: &str, name: &str) -> MetricsResult<u64> {
        let metric = self.get_metric(&MetricId::new(namespace, name))?;
        metric
            .value
            .as_counter()
            .ok_or(MetricsError::TypeMismatch {
                expected: MetricType::Counter,
                found: metric.value.metric_type(),
            })
    }

    /// Check if a metric exists.
    pub fn contains_metric(&self, id: &MetricId) -> bool {
        self.metrics
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains_key(id)
    }

    /// Get the total number of metrics.
    pub fn metric_count(&self) -> usize {
        self.metrics
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

/// Handle for counter operations.
#[derive(Debug, Clone)]
pub struct CounterHandle {
    id: MetricId,
    store: MetricStore,
}

impl CounterHandle {
    /// Increments the counter by 1, returning the new value.
    pub fn increment(&self) -> MetricsResult<u64> {
        self.increment_by(1)
    }

    /// Increments the counter by `amount`, returning the new value.
    pub fn increment_by(&self, amount: u64) -> MetricsResult<u64> {
        with_metric(&self.store, &self.id, |metric| match &mut metric.value {
            MetricValue::Counter(value) => {
                *value += amount;
                Ok(*value)
            }
            other => Err(MetricsError::TypeMismatch {
                expected: MetricType::Counter,
                found: other.metric_type(),
            }),
        })
    }

    /// Get the current counter value.
    pub fn get(&self) -> MetricsResult<u64> {
        with_metric(&self.store, &self.id, |metric| {
            metric.value.as_counter().ok_or(MetricsError::TypeMismatch {
                expected: MetricType::Counter,
                found: metric.value.metric_type(),
            })
        })
    }

    /// Get the metric ID.
    pub fn id(&self) -> &MetricId {
        &self.id
    }
}

/// Handle for histogram operations.
#[derive(Debug, Clone)]
pub struct HistogramHandle {
    id: MetricId,
    store: MetricStore,
}

impl HistogramHandle {
    /// Records a sample.
    pub fn observe(&self, sample: f64) -> MetricsResult<()> {
        with_metric(&self.store, &self.id, |metric| match &mut metric.value {
            MetricValue::Histogram {
                samples,
                bucket_bounds,
                bucket_counts,
            } => {
                samples.push(sample);
                for (bound, count) in bucket_bounds.iter().zip(bucket_counts.iter_mut()) {
                    if sample <= *bound {
                        *count += 1;
                    }
                }
                Ok(())
            }
            other => Err(MetricsError::TypeMismatch {
                expected: MetricType::Histogram,
                found: other.metric_type(),
            }),
        })
    }

    /// The number of samples recorded so far.
    pub fn count(&self) -> MetricsResult<usize> {
        with_metric(&self.store, &self.id, |metric| match &metric.value {
            MetricValue::Histogram { samples, .. } => Ok(samples.len()),
            other => Err(MetricsError::TypeMismatch {
                expected: MetricType::Histogram,
                found: other.metric_type(),
            }),
        })
    }

    /// Get the metric ID.
    pub fn id(&self) -> &MetricId {
        &self.id
    }
}
