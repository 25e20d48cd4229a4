//! In-memory representation of metrics.
//!
//! Every entity is a plain value record. Ownership is strictly tree shaped:
//!
//! ```text
//! MetricSet
//!  └── Metric
//!       ├── MetricDescriptor
//!       └── TimeSeries*
//!            └── Points (gauge or cumulative)
//!                 └── CumulativePoint
//!                      └── DistributionValue
//! ```
//!
//! Constructing a value enforces nothing. Validation lives in
//! [`crate::descriptor`], [`crate::distribution`] and [`crate::timeseries`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A point in time as seconds since the Unix epoch plus a sub-second offset.
///
/// Field order makes the derived ordering chronological, provided `nanos`
/// lies in `0..1_000_000_000`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: i32,
}

impl Timestamp {
    pub const NANOS_PER_SECOND: i32 = 1_000_000_000;

    pub fn new(seconds: i64, nanos: i32) -> Self {
        Self { seconds, nanos }
    }

    pub fn now() -> Self {
        Utc::now().into()
    }

    /// Returns true if the sub-second offset is normalized.
    pub fn is_valid(&self) -> bool {
        (0..Self::NANOS_PER_SECOND).contains(&self.nanos)
    }

    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        if !self.is_valid() {
            return None;
        }
        DateTime::from_timestamp(self.seconds, self.nanos as u32)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        // chrono encodes leap seconds as nanos past one second
        let nanos = dt.timestamp_subsec_nanos().min(999_999_999);
        Self {
            seconds: dt.timestamp(),
            nanos: nanos as i32,
        }
    }
}

/// Kind of data a metric reports.
///
/// `Unspecified` is the wire default and never describes a real metric.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    ::prost::Enumeration,
    Serialize,
    Deserialize,
)]
#[repr(i32)]
pub enum MetricType {
    Unspecified = 0,
    Gauge = 1,
    Cumulative = 2,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Unspecified => "unspecified",
            MetricType::Gauge => "gauge",
            MetricType::Cumulative => "cumulative",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDescriptor {
    pub name: String,
    pub description: String,
    pub unit: String,
    pub metric_type: MetricType,
    /// Schema every time series of the metric must match positionally.
    pub label_keys: Vec<String>,
}

impl MetricDescriptor {
    pub fn new(name: impl Into<String>, metric_type: MetricType) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            unit: String::new(),
            metric_type,
            label_keys: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_label_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.label_keys = keys.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GaugeValue {
    Int64(i64),
    Double(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaugePoint {
    pub timestamp: Timestamp,
    pub value: GaugeValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CumulativeValue {
    Int64(i64),
    Double(f64),
    Distribution(DistributionValue),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CumulativePoint {
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub value: CumulativeValue,
}

/// The points of a time series. Exactly one kind per series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Points {
    Gauge(Vec<GaugePoint>),
    Cumulative(Vec<CumulativePoint>),
}

impl Points {
    pub fn len(&self) -> usize {
        match self {
            Points::Gauge(points) => points.len(),
            Points::Cumulative(points) => points.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Positionally aligned with the descriptor's label keys.
    pub label_values: Vec<String>,
    pub points: Points,
}

impl TimeSeries {
    pub fn gauge<I, S>(label_values: I, points: Vec<GaugePoint>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            label_values: label_values.into_iter().map(Into::into).collect(),
            points: Points::Gauge(points),
        }
    }

    pub fn cumulative<I, S>(label_values: I, points: Vec<CumulativePoint>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            label_values: label_values.into_iter().map(Into::into).collect(),
            points: Points::Cumulative(points),
        }
    }
}

/// Smallest and largest observed value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bucket {
    pub count: i64,
}

/// Summary statistics over a population, with an optional histogram.
///
/// With `N = bucket_bounds.len() + 1` buckets, bucket `0` covers
/// `(-inf, bounds[0])`, bucket `i` covers `[bounds[i - 1], bounds[i])` and
/// bucket `N - 1` covers `[bounds[N - 2], +inf)`.
///
/// The default value is the empty distribution.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DistributionValue {
    pub count: i64,
    pub mean: f64,
    /// Sum of squared deviations from the mean, as accumulated by Welford's
    /// online algorithm.
    pub sum_of_squared_deviation: f64,
    pub range: Option<Range>,
    pub bucket_bounds: Vec<f64>,
    pub buckets: Vec<Bucket>,
}

impl DistributionValue {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Population variance, or `None` for an empty distribution.
    pub fn variance(&self) -> Option<f64> {
        if self.count <= 0 {
            return None;
        }
        Some(self.sum_of_squared_deviation / self.count as f64)
    }

    /// Lower (inclusive) and upper (exclusive) boundary of bucket `index`.
    pub fn bucket_interval(&self, index: usize) -> Option<(f64, f64)> {
        let bounds = &self.bucket_bounds;
        if index > bounds.len() {
            return None;
        }

        let lower = match index {
            0 => f64::NEG_INFINITY,
            i => bounds[i - 1],
        };
        let upper = bounds.get(index).copied().unwrap_or(f64::INFINITY);
        Some((lower, upper))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub descriptor: MetricDescriptor,
    pub timeseries: Vec<TimeSeries>,
}

impl Metric {
    pub fn new(descriptor: MetricDescriptor, timeseries: Vec<TimeSeries>) -> Self {
        Self {
            descriptor,
            timeseries,
        }
    }
}
