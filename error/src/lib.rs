use thiserror::Error;

/// Malformed input: bytes that can not be turned into a model value.
///
/// A parse error makes the whole entity being decoded unusable.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("failed to decode protobuf message: {0}")]
    Protobuf(#[from] prost::DecodeError),

    /// A message field that must always be present was omitted
    #[error("{entity} is missing required field {field}")]
    MissingField {
        entity: &'static str,
        field: &'static str,
    },

    /// None of the value arms of a tagged union was set
    #[error("{entity} has no value set")]
    MissingValue { entity: &'static str },

    /// More than one value arm of a tagged union was set
    #[error("{entity} has {arms} values set, expected exactly one")]
    MultipleValues { entity: &'static str, arms: usize },

    #[error("unknown metric type: {0}")]
    UnknownMetricType(i32),

    /// Sub-second offset outside of `0..1_000_000_000`
    #[error("invalid timestamp: {seconds}s {nanos}ns")]
    InvalidTimestamp { seconds: i64, nanos: i32 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("metric name is empty")]
    EmptyName,

    #[error("metric type is unspecified")]
    UnspecifiedType,

    #[error("label key {key:?} at position {duplicate} duplicates position {first}")]
    DuplicateLabelKey {
        key: String,
        first: usize,
        duplicate: usize,
    },
}

/// A distribution value that is not internally consistent.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DistributionError {
    #[error("count is negative: {0}")]
    NegativeCount(i64),

    #[error("empty distribution has non-zero mean: {mean}")]
    EmptyWithMean { mean: f64 },

    #[error("empty distribution has non-zero sum of squared deviation: {sum_of_squared_deviation}")]
    EmptyWithDeviation { sum_of_squared_deviation: f64 },

    #[error("empty distribution has a range")]
    EmptyWithRange,

    /// Also covers a NaN deviation.
    #[error("sum of squared deviation is negative or NaN: {0}")]
    NegativeSumOfSquaredDeviation(f64),

    /// Also covers a NaN endpoint.
    #[error("range minimum {min} is not at most maximum {max}")]
    InvertedRange { min: f64, max: f64 },

    /// `bucket_bounds[index]` is not strictly greater than its predecessor
    #[error("bucket bound at index {index} is not strictly increasing")]
    NonMonotonicBounds { index: usize },

    #[error("{buckets} buckets for {bounds} bucket bounds")]
    BucketArityMismatch { bounds: usize, buckets: usize },

    #[error("bucket {index} has negative count: {count}")]
    NegativeBucketCount { index: usize, count: i64 },

    #[error("sum of bucket counts overflows")]
    BucketCountOverflow,

    /// Bucket counts do not add up to the distribution's count
    #[error("bucket counts sum to {actual}, expected {expected}")]
    BucketCountMismatch { expected: i64, actual: i64 },
}

/// Failure to decode a standalone distribution value.
#[derive(Error, Debug)]
pub enum DistributionDecodeError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Invalid(#[from] DistributionError),
}

#[derive(Error, Debug)]
pub enum TimeSeriesError {
    #[error("malformed time series: {0}")]
    Codec(#[from] CodecError),

    #[error("time series has {actual} label values, descriptor declares {expected} label keys")]
    LabelArityMismatch { expected: usize, actual: usize },

    #[error("time series holds {found} points, descriptor declares {declared}")]
    PointTypeMismatch {
        declared: &'static str,
        found: &'static str,
    },

    #[error("malformed point {index}: {source}")]
    MalformedPoint {
        index: usize,
        #[source]
        source: CodecError,
    },

    #[error("invalid distribution in point {index}: {source}")]
    Distribution {
        index: usize,
        #[source]
        source: DistributionError,
    },

    /// `end_time` went backwards within one accumulation epoch
    #[error("point {index} ends before the previous point of the same epoch")]
    NonMonotonicEndTime { index: usize },

    #[error("point {index} starts after it ends")]
    StartAfterEnd { index: usize },

    /// A reset moved `start_time` backwards
    #[error("point {index} starts a new epoch before the previous one")]
    StartTimeRegression { index: usize },
}

impl TimeSeriesError {
    /// Index of the offending point, if the error is about a single point.
    pub fn point_index(&self) -> Option<usize> {
        match self {
            Self::MalformedPoint { index, .. }
            | Self::Distribution { index, .. }
            | Self::NonMonotonicEndTime { index }
            | Self::StartAfterEnd { index }
            | Self::StartTimeRegression { index } => Some(*index),
            _ => None,
        }
    }
}

/// Rejection of a whole metric.
#[derive(Error, Debug)]
pub enum AggregatorError {
    #[error("metric {metric:?}: {source}")]
    Descriptor {
        metric: String,
        #[source]
        source: DescriptorError,
    },

    #[error("metric {metric:?}, series {series}: {source}")]
    Series {
        metric: String,
        series: usize,
        #[source]
        source: TimeSeriesError,
    },
}

impl AggregatorError {
    pub fn metric(&self) -> &str {
        match self {
            Self::Descriptor { metric, .. } | Self::Series { metric, .. } => metric,
        }
    }

    pub fn series_index(&self) -> Option<usize> {
        match self {
            Self::Series { series, .. } => Some(*series),
            Self::Descriptor { .. } => None,
        }
    }

    pub fn point_index(&self) -> Option<usize> {
        match self {
            Self::Series { source, .. } => source.point_index(),
            Self::Descriptor { .. } => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum MetricSetError {
    #[error("malformed metric set: {0}")]
    Codec(#[from] CodecError),

    #[error("malformed metric {index}: {source}")]
    MalformedMetric {
        index: usize,
        #[source]
        source: CodecError,
    },

    #[error("invalid metric {index}: {source}")]
    Metric {
        index: usize,
        #[source]
        source: AggregatorError,
    },
}
