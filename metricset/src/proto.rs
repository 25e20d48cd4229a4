//! Protobuf wire messages.
//!
//! Field tags are part of the interchange contract with existing consumers
//! and must not change. Tagged-union arms are declared as explicitly present
//! fields rather than a `oneof`: the bytes on the wire are identical, but the
//! decoder gets to see how many arms were actually set and can reject zero or
//! several of them.

pub use crate::model::MetricType;

/// Same layout as `google.protobuf.Timestamp`.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Timestamp {
    #[prost(int64, tag = "1")]
    pub seconds: i64,
    #[prost(int32, tag = "2")]
    pub nanos: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MetricSet {
    #[prost(message, repeated, tag = "1")]
    pub metrics: Vec<Metric>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Metric {
    #[prost(message, optional, tag = "1")]
    pub metric_descriptor: Option<MetricDescriptor>,
    #[prost(message, repeated, tag = "2")]
    pub timeseries: Vec<TimeSeries>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MetricDescriptor {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub description: String,
    #[prost(string, tag = "3")]
    pub unit: String,
    #[prost(enumeration = "MetricType", tag = "4")]
    pub r#type: i32,
    #[prost(string, repeated, tag = "5")]
    pub label_keys: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TimeSeries {
    #[prost(string, repeated, tag = "1")]
    pub label_values: Vec<String>,
    #[prost(message, repeated, tag = "2")]
    pub gauge_points: Vec<GaugePoint>,
    #[prost(message, repeated, tag = "3")]
    pub cumulative_points: Vec<CumulativePoint>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GaugePoint {
    #[prost(message, optional, tag = "1")]
    pub timestamp: Option<Timestamp>,
    #[prost(int64, optional, tag = "2")]
    pub int64_value: Option<i64>,
    #[prost(double, optional, tag = "3")]
    pub double_value: Option<f64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CumulativePoint {
    #[prost(message, optional, tag = "1")]
    pub start_time: Option<Timestamp>,
    #[prost(message, optional, tag = "2")]
    pub end_time: Option<Timestamp>,
    #[prost(int64, optional, tag = "3")]
    pub int64_value: Option<i64>,
    #[prost(double, optional, tag = "4")]
    pub double_value: Option<f64>,
    #[prost(message, optional, tag = "5")]
    pub distribution_value: Option<DistributionValue>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DistributionValue {
    #[prost(int64, tag = "1")]
    pub count: i64,
    #[prost(double, tag = "2")]
    pub mean: f64,
    #[prost(double, tag = "3")]
    pub sum_of_squared_deviation: f64,
    #[prost(message, optional, tag = "4")]
    pub range: Option<Range>,
    #[prost(double, repeated, tag = "5")]
    pub bucket_bounds: Vec<f64>,
    #[prost(message, repeated, tag = "6")]
    pub buckets: Vec<Bucket>,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Range {
    #[prost(double, tag = "1")]
    pub min: f64,
    #[prost(double, tag = "2")]
    pub max: f64,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Bucket {
    #[prost(int64, tag = "1")]
    pub count: i64,
}
