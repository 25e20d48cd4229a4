//! Distribution value codec.
//!
//! [`check_invariants`] runs on both sides of the wire: [`encode`] refuses
//! to serialize an inconsistent value and [`decode`] refuses to hand one out.
//! Mapping raw samples to buckets is the producer's business; this module only
//! judges whether an already populated value is consistent.

use std::cmp::Ordering;

use prost::Message;

use error::{DistributionDecodeError, DistributionError};

use crate::model::{Bucket, DistributionValue, Range};
use crate::policy::Violations;
use crate::proto;

/// Checks every invariant of `value`, reporting the first violation.
pub fn check_invariants(value: &DistributionValue) -> Result<(), DistributionError> {
    let mut v = Violations::fail_fast();
    walk(value, &mut v);
    v.into_result()
}

/// Checks every invariant of `value`, reporting all violations.
pub fn invariant_violations(value: &DistributionValue) -> Vec<DistributionError> {
    let mut v = Violations::collect_all();
    walk(value, &mut v);
    v.into_vec()
}

pub fn encode(value: &DistributionValue) -> Result<Vec<u8>, DistributionError> {
    check_invariants(value)?;
    Ok(to_proto(value).encode_to_vec())
}

pub fn decode(bytes: &[u8]) -> Result<DistributionValue, DistributionDecodeError> {
    let msg = proto::DistributionValue::decode(bytes).map_err(error::CodecError::from)?;
    let value = from_proto(msg);
    check_invariants(&value)?;
    Ok(value)
}

pub(crate) fn walk(value: &DistributionValue, v: &mut Violations<DistributionError>) {
    if value.count < 0 && v.record(DistributionError::NegativeCount(value.count)) {
        return;
    }

    if value.count == 0 {
        if value.mean != 0.0 && v.record(DistributionError::EmptyWithMean { mean: value.mean }) {
            return;
        }

        if value.sum_of_squared_deviation != 0.0 {
            let err = DistributionError::EmptyWithDeviation {
                sum_of_squared_deviation: value.sum_of_squared_deviation,
            };
            if v.record(err) {
                return;
            }
        }

        if value.range.is_some() && v.record(DistributionError::EmptyWithRange) {
            return;
        }
    }

    let deviation = value.sum_of_squared_deviation;
    if deviation.is_nan() || deviation < 0.0 {
        let err = DistributionError::NegativeSumOfSquaredDeviation(value.sum_of_squared_deviation);
        if v.record(err) {
            return;
        }
    }

    if let Some(Range { min, max }) = value.range {
        let ordered = matches!(min.partial_cmp(&max), Some(Ordering::Less | Ordering::Equal));
        if !ordered && v.record(DistributionError::InvertedRange { min, max }) {
            return;
        }
    }

    // NaN bounds compare as unordered and are rejected.
    for (idx, pair) in value.bucket_bounds.windows(2).enumerate() {
        if pair[0].partial_cmp(&pair[1]) != Some(Ordering::Less)
            && v.record(DistributionError::NonMonotonicBounds { index: idx + 1 })
        {
            return;
        }
    }

    if value.buckets.is_empty() {
        return;
    }

    if value.buckets.len() != value.bucket_bounds.len() + 1 {
        let err = DistributionError::BucketArityMismatch {
            bounds: value.bucket_bounds.len(),
            buckets: value.buckets.len(),
        };
        if v.record(err) {
            return;
        }
    }

    let mut total: Option<i64> = Some(0);
    for (idx, bucket) in value.buckets.iter().enumerate() {
        if bucket.count < 0 {
            let err = DistributionError::NegativeBucketCount {
                index: idx,
                count: bucket.count,
            };
            if v.record(err) {
                return;
            }
        }
        total = total.and_then(|t| t.checked_add(bucket.count));
    }

    match total {
        None => {
            v.record(DistributionError::BucketCountOverflow);
        }
        Some(actual) if actual != value.count => {
            v.record(DistributionError::BucketCountMismatch {
                expected: value.count,
                actual,
            });
        }
        Some(_) => {}
    }
}

pub(crate) fn to_proto(value: &DistributionValue) -> proto::DistributionValue {
    proto::DistributionValue {
        count: value.count,
        mean: value.mean,
        sum_of_squared_deviation: value.sum_of_squared_deviation,
        range: value.range.map(|r| proto::Range {
            min: r.min,
            max: r.max,
        }),
        bucket_bounds: value.bucket_bounds.clone(),
        buckets: value
            .buckets
            .iter()
            .map(|b| proto::Bucket { count: b.count })
            .collect(),
    }
}

pub(crate) fn from_proto(msg: proto::DistributionValue) -> DistributionValue {
    DistributionValue {
        count: msg.count,
        mean: msg.mean,
        sum_of_squared_deviation: msg.sum_of_squared_deviation,
        range: msg.range.map(|r| Range {
            min: r.min,
            max: r.max,
        }),
        bucket_bounds: msg.bucket_bounds,
        buckets: msg
            .buckets
            .into_iter()
            .map(|b| Bucket { count: b.count })
            .collect(),
    }
}
