//! Metrics data model, validation and wire codec.
//!
//! A [`MetricSet`] batches [`Metric`]s, each pairing a [`MetricDescriptor`]
//! with the [`TimeSeries`] reported for it. Sets are built through an
//! [`Aggregator`], which validates every metric it accepts, and cross the
//! wire as protobuf (see [`proto`] for the field layout).
//!
//! ```
//! use metricset::{
//!     Aggregator, CumulativePoint, CumulativeValue, Metric, MetricDescriptor, MetricSet,
//!     MetricType, TimeSeries, Timestamp, ValidationPolicy,
//! };
//!
//! let descriptor = MetricDescriptor::new("http/requests", MetricType::Cumulative)
//!     .with_unit("1")
//!     .with_label_keys(["region"]);
//! let series = TimeSeries::cumulative(
//!     ["us"],
//!     vec![CumulativePoint {
//!         start_time: Timestamp::new(1_700_000_000, 0),
//!         end_time: Timestamp::new(1_700_000_060, 0),
//!         value: CumulativeValue::Int64(42),
//!     }],
//! );
//!
//! let mut aggregator = Aggregator::default();
//! aggregator.add(Metric::new(descriptor, vec![series])).unwrap();
//! let set = aggregator.finalize();
//!
//! let bytes = set.encode();
//! assert_eq!(MetricSet::decode(bytes, &ValidationPolicy::default()).unwrap(), set);
//! ```

extern crate static_assertions as sa;

pub mod descriptor;
pub mod distribution;
pub mod metric_set;
pub mod model;
pub mod policy;
pub mod proto;
pub mod timeseries;

pub use error::{
    AggregatorError, CodecError, DescriptorError, DistributionDecodeError, DistributionError,
    MetricSetError, TimeSeriesError,
};
pub use metric_set::{Aggregator, MetricSet, SharedAggregator};
pub use model::{
    Bucket, CumulativePoint, CumulativeValue, DistributionValue, GaugePoint, GaugeValue, Metric,
    MetricDescriptor, MetricType, Points, Range, TimeSeries, Timestamp,
};
pub use policy::{Check, ValidationPolicy};
