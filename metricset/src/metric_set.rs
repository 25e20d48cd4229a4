//! Batching of validated metrics into one transmissible unit.
//!
//! A [`MetricSet`] can only be obtained from an [`Aggregator`], a
//! [`SharedAggregator`] snapshot or [`MetricSet::decode`], so holding one
//! means every metric in it passed validation.

use bytes::{Buf, Bytes};
use parking_lot::Mutex;
use prost::Message;
use serde::Serialize;
use tracing::debug;

use error::{AggregatorError, CodecError, MetricSetError};

use crate::model::{Metric, MetricDescriptor};
use crate::policy::ValidationPolicy;
use crate::{descriptor, proto, timeseries};

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MetricSet {
    metrics: Vec<Metric>,
}

sa::assert_impl_all!(MetricSet: Send, Sync);

impl MetricSet {
    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Metric> {
        self.metrics.iter()
    }

    pub fn into_metrics(self) -> Vec<Metric> {
        self.metrics
    }

    /// Total number of time series across all metrics.
    pub fn num_series(&self) -> usize {
        self.metrics.iter().map(|m| m.timeseries.len()).sum()
    }

    /// Total number of points across all time series.
    pub fn num_points(&self) -> usize {
        self.metrics
            .iter()
            .flat_map(|m| m.timeseries.iter())
            .map(|ts| ts.points.len())
            .sum()
    }

    /// Serializes the set. Identical sets always produce identical bytes.
    pub fn encode(&self) -> Bytes {
        let msg = proto::MetricSet {
            metrics: self
                .metrics
                .iter()
                .map(|m| proto::Metric {
                    metric_descriptor: Some(descriptor::to_proto(&m.descriptor)),
                    timeseries: m.timeseries.iter().map(timeseries::to_proto).collect(),
                })
                .collect(),
        };
        Bytes::from(msg.encode_to_vec())
    }

    /// Parses and validates a set, failing on the first malformed or invalid
    /// metric.
    pub fn decode<B: Buf>(buf: B, policy: &ValidationPolicy) -> Result<Self, MetricSetError> {
        let msg = proto::MetricSet::decode(buf).map_err(CodecError::from)?;

        let mut metrics = Vec::with_capacity(msg.metrics.len());
        for (index, m) in msg.metrics.into_iter().enumerate() {
            metrics.push(metric_from_proto(index, m, policy)?);
        }

        let set = Self { metrics };
        debug!(
            metrics = set.len(),
            series = set.num_series(),
            "decoded metric set"
        );
        Ok(set)
    }

    /// Parses a set and reports every violation in it instead of stopping at
    /// the first one. Only bytes that are not a metric set at all fail.
    pub fn diagnose<B: Buf>(
        buf: B,
        policy: &ValidationPolicy,
    ) -> Result<Vec<MetricSetError>, CodecError> {
        let msg = proto::MetricSet::decode(buf)?;
        let mut errors = Vec::new();

        for (index, m) in msg.metrics.into_iter().enumerate() {
            let descriptor = match descriptor_from_proto(m.metric_descriptor) {
                Ok(d) => d,
                Err(source) => {
                    errors.push(MetricSetError::MalformedMetric { index, source });
                    continue;
                }
            };

            for source in descriptor::violations(&descriptor, policy) {
                let source = AggregatorError::Descriptor {
                    metric: descriptor.name.clone(),
                    source,
                };
                errors.push(MetricSetError::Metric { index, source });
            }

            for (series, ts) in m.timeseries.into_iter().enumerate() {
                for source in timeseries::diagnose_proto(ts, &descriptor, policy) {
                    let source = AggregatorError::Series {
                        metric: descriptor.name.clone(),
                        series,
                        source,
                    };
                    errors.push(MetricSetError::Metric { index, source });
                }
            }
        }

        Ok(errors)
    }
}

impl<'a> IntoIterator for &'a MetricSet {
    type Item = &'a Metric;
    type IntoIter = std::slice::Iter<'a, Metric>;

    fn into_iter(self) -> Self::IntoIter {
        self.metrics.iter()
    }
}

fn descriptor_from_proto(
    msg: Option<proto::MetricDescriptor>,
) -> Result<MetricDescriptor, CodecError> {
    let msg = msg.ok_or(CodecError::MissingField {
        entity: "Metric",
        field: "metric_descriptor",
    })?;
    descriptor::from_proto(msg)
}

fn metric_from_proto(
    index: usize,
    msg: proto::Metric,
    policy: &ValidationPolicy,
) -> Result<Metric, MetricSetError> {
    let descriptor = descriptor_from_proto(msg.metric_descriptor)
        .map_err(|source| MetricSetError::MalformedMetric { index, source })?;

    descriptor::validate(&descriptor, policy).map_err(|source| MetricSetError::Metric {
        index,
        source: AggregatorError::Descriptor {
            metric: descriptor.name.clone(),
            source,
        },
    })?;

    let mut series = Vec::with_capacity(msg.timeseries.len());
    for (idx, ts) in msg.timeseries.into_iter().enumerate() {
        let ts = timeseries::from_proto(ts, &descriptor, policy).map_err(|source| {
            MetricSetError::Metric {
                index,
                source: AggregatorError::Series {
                    metric: descriptor.name.clone(),
                    series: idx,
                    source,
                },
            }
        })?;
        series.push(ts);
    }

    Ok(Metric::new(descriptor, series))
}

/// Runs every check a metric must pass to be part of a set.
pub fn validate_metric(metric: &Metric, policy: &ValidationPolicy) -> Result<(), AggregatorError> {
    let descriptor = &metric.descriptor;

    descriptor::validate(descriptor, policy).map_err(|source| AggregatorError::Descriptor {
        metric: descriptor.name.clone(),
        source,
    })?;

    for (series, ts) in metric.timeseries.iter().enumerate() {
        timeseries::check(ts, descriptor, policy).map_err(|source| AggregatorError::Series {
            metric: descriptor.name.clone(),
            series,
            source,
        })?;
    }

    Ok(())
}

/// Single-owner builder of a [`MetricSet`].
#[derive(Debug, Default)]
pub struct Aggregator {
    policy: ValidationPolicy,
    metrics: Vec<Metric>,
}

impl Aggregator {
    pub fn new(policy: ValidationPolicy) -> Self {
        Self {
            policy,
            metrics: Vec::new(),
        }
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    /// Accepts `metric` if it passes validation. A rejected metric leaves the
    /// aggregator untouched.
    pub fn add(&mut self, metric: Metric) -> Result<(), AggregatorError> {
        validate_metric(&metric, &self.policy)?;

        debug!(
            metric = %metric.descriptor.name,
            series = metric.timeseries.len(),
            "accepted metric"
        );
        self.metrics.push(metric);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn finalize(self) -> MetricSet {
        MetricSet {
            metrics: self.metrics,
        }
    }
}

/// Aggregator that multiple producers can add to concurrently.
///
/// Each call to [`SharedAggregator::take_snapshot`] hands the metrics
/// accumulated so far to the caller; later additions go to the next snapshot.
#[derive(Debug, Default)]
pub struct SharedAggregator {
    policy: ValidationPolicy,
    pending: Mutex<Vec<Metric>>,
}

sa::assert_impl_all!(SharedAggregator: Send, Sync);

impl SharedAggregator {
    pub fn new(policy: ValidationPolicy) -> Self {
        Self {
            policy,
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn add(&self, metric: Metric) -> Result<(), AggregatorError> {
        // Validation does not need the lock.
        validate_metric(&metric, &self.policy)?;

        debug!(
            metric = %metric.descriptor.name,
            series = metric.timeseries.len(),
            "accepted metric"
        );
        self.pending.lock().push(metric);
        Ok(())
    }

    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn take_snapshot(&self) -> MetricSet {
        let metrics = std::mem::take(&mut *self.pending.lock());
        debug!(metrics = metrics.len(), "took metric set snapshot");
        MetricSet { metrics }
    }
}
