//! Time series codec.
//!
//! A series is checked against its descriptor in this order:
//!
//! 1. label arity,
//! 2. point kind against the declared metric type,
//! 3. each point (timestamps, distribution invariants),
//! 4. time ordering of cumulative points, subject to [`ValidationPolicy`].
//!
//! Decoding runs the same steps while converting wire messages, so a bad
//! series is rejected before the rest of it is looked at.

use prost::Message;
use tracing::warn;

use error::{CodecError, TimeSeriesError};

use crate::distribution;
use crate::model::{
    CumulativePoint, CumulativeValue, GaugePoint, GaugeValue, MetricDescriptor, MetricType,
    Points, TimeSeries, Timestamp,
};
use crate::policy::{Check, ValidationPolicy, Violations};
use crate::proto;

/// Runs the validation path without producing bytes.
pub fn check(
    series: &TimeSeries,
    descriptor: &MetricDescriptor,
    policy: &ValidationPolicy,
) -> Result<(), TimeSeriesError> {
    let mut v = Violations::fail_fast();
    walk(series, descriptor, policy, &mut v);
    v.into_result()
}

/// Like [`check`], but reports every violation.
pub fn diagnose(
    series: &TimeSeries,
    descriptor: &MetricDescriptor,
    policy: &ValidationPolicy,
) -> Vec<TimeSeriesError> {
    let mut v = Violations::collect_all();
    walk(series, descriptor, policy, &mut v);
    v.into_vec()
}

pub fn encode(
    series: &TimeSeries,
    descriptor: &MetricDescriptor,
    policy: &ValidationPolicy,
) -> Result<Vec<u8>, TimeSeriesError> {
    check(series, descriptor, policy)?;
    Ok(to_proto(series).encode_to_vec())
}

pub fn decode(
    bytes: &[u8],
    descriptor: &MetricDescriptor,
    policy: &ValidationPolicy,
) -> Result<TimeSeries, TimeSeriesError> {
    let msg = proto::TimeSeries::decode(bytes).map_err(CodecError::from)?;
    from_proto(msg, descriptor, policy)
}

pub(crate) fn from_proto(
    msg: proto::TimeSeries,
    descriptor: &MetricDescriptor,
    policy: &ValidationPolicy,
) -> Result<TimeSeries, TimeSeriesError> {
    let mut v = Violations::fail_fast();
    let series = convert(msg, descriptor, policy, &mut v);
    v.into_result().map(|()| series)
}

/// Reports every violation in a wire series, parse errors included.
pub(crate) fn diagnose_proto(
    msg: proto::TimeSeries,
    descriptor: &MetricDescriptor,
    policy: &ValidationPolicy,
) -> Vec<TimeSeriesError> {
    let mut v = Violations::collect_all();
    convert(msg, descriptor, policy, &mut v);
    v.into_vec()
}

/// Which point lists of a series are populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PointKind {
    None,
    Gauge,
    Cumulative,
    Mixed,
}

impl PointKind {
    fn from_lists(has_gauge: bool, has_cumulative: bool) -> Self {
        match (has_gauge, has_cumulative) {
            (false, false) => PointKind::None,
            (true, false) => PointKind::Gauge,
            (false, true) => PointKind::Cumulative,
            (true, true) => PointKind::Mixed,
        }
    }

    fn of(points: &Points) -> Self {
        match points {
            Points::Gauge(p) => Self::from_lists(!p.is_empty(), false),
            Points::Cumulative(p) => Self::from_lists(false, !p.is_empty()),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            PointKind::None => "no",
            PointKind::Gauge => "gauge",
            PointKind::Cumulative => "cumulative",
            PointKind::Mixed => "gauge and cumulative",
        }
    }
}

fn check_arity(actual: usize, descriptor: &MetricDescriptor) -> Result<(), TimeSeriesError> {
    let expected = descriptor.label_keys.len();
    if actual != expected {
        return Err(TimeSeriesError::LabelArityMismatch { expected, actual });
    }
    Ok(())
}

fn check_kind(declared: MetricType, found: PointKind) -> Result<(), TimeSeriesError> {
    match (declared, found) {
        (MetricType::Gauge, PointKind::Gauge) | (MetricType::Cumulative, PointKind::Cumulative) => {
            Ok(())
        }
        _ => Err(TimeSeriesError::PointTypeMismatch {
            declared: declared.as_str(),
            found: found.as_str(),
        }),
    }
}

fn walk(
    series: &TimeSeries,
    descriptor: &MetricDescriptor,
    policy: &ValidationPolicy,
    v: &mut Violations<TimeSeriesError>,
) {
    if let Err(e) = check_arity(series.label_values.len(), descriptor) {
        if v.record(e) {
            return;
        }
    }

    if let Err(e) = check_kind(descriptor.metric_type, PointKind::of(&series.points)) {
        if v.record(e) {
            return;
        }
    }

    walk_points(&series.points, policy, v);
}

fn walk_points(points: &Points, policy: &ValidationPolicy, v: &mut Violations<TimeSeriesError>) {
    match points {
        Points::Gauge(points) => walk_gauge_points(points.iter().enumerate(), v),
        Points::Cumulative(points) => {
            walk_cumulative_points(points.iter().enumerate(), policy, v)
        }
    }
}

/// Points are paired with their position in the series, which need not be
/// contiguous when malformed wire points were skipped.
fn walk_gauge_points<'a, I>(points: I, v: &mut Violations<TimeSeriesError>)
where
    I: IntoIterator<Item = (usize, &'a GaugePoint)>,
{
    for (index, point) in points {
        if let Err(source) = check_timestamp(&point.timestamp) {
            if v.record(TimeSeriesError::MalformedPoint { index, source }) {
                return;
            }
        }
    }
}

fn walk_cumulative_points<'a, I>(
    points: I,
    policy: &ValidationPolicy,
    v: &mut Violations<TimeSeriesError>,
) where
    I: IntoIterator<Item = (usize, &'a CumulativePoint)> + Clone,
{
    for (index, point) in points.clone() {
        if walk_cumulative_point(index, point, v) {
            return;
        }
    }
    walk_time_order(points, policy, v);
}

/// Returns true if the walk must stop.
fn walk_cumulative_point(
    index: usize,
    point: &CumulativePoint,
    v: &mut Violations<TimeSeriesError>,
) -> bool {
    for ts in [&point.start_time, &point.end_time] {
        if let Err(source) = check_timestamp(ts) {
            if v.record(TimeSeriesError::MalformedPoint { index, source }) {
                return true;
            }
        }
    }

    if let CumulativeValue::Distribution(dist) = &point.value {
        let mut inner = v.nested();
        distribution::walk(dist, &mut inner);
        for source in inner.into_vec() {
            if v.record(TimeSeriesError::Distribution { index, source }) {
                return true;
            }
        }
    }

    false
}

/// Ordering is only checked between points that are adjacent in the series.
fn walk_time_order<'a, I>(
    points: I,
    policy: &ValidationPolicy,
    v: &mut Violations<TimeSeriesError>,
) where
    I: IntoIterator<Item = (usize, &'a CumulativePoint)>,
{
    let mut prev: Option<(usize, &CumulativePoint)> = None;

    for (index, point) in points {
        if point.start_time > point.end_time
            && apply(policy.epoch_order, TimeSeriesError::StartAfterEnd { index }, v)
        {
            return;
        }

        let adjacent = prev.filter(|(prev_index, _)| prev_index + 1 == index);
        prev = Some((index, point));
        let Some((_, before)) = adjacent else {
            continue;
        };

        if point.start_time == before.start_time {
            if point.end_time < before.end_time
                && apply(
                    policy.end_time_order,
                    TimeSeriesError::NonMonotonicEndTime { index },
                    v,
                )
            {
                return;
            }
        } else if point.start_time < before.start_time
            && apply(
                policy.epoch_order,
                TimeSeriesError::StartTimeRegression { index },
                v,
            )
        {
            return;
        }
    }
}

/// Handles a violation of a toggleable check. Returns true if the walk must
/// stop.
fn apply(check: Check, err: TimeSeriesError, v: &mut Violations<TimeSeriesError>) -> bool {
    match check {
        Check::Enforce => v.record(err),
        Check::Warn => {
            warn!(error = %err, "accepting out of order cumulative point");
            false
        }
        Check::Ignore => false,
    }
}

fn check_timestamp(ts: &Timestamp) -> Result<(), CodecError> {
    if !ts.is_valid() {
        return Err(CodecError::InvalidTimestamp {
            seconds: ts.seconds,
            nanos: ts.nanos,
        });
    }
    Ok(())
}

/// Converts a wire series while validating it.
///
/// The returned series is only meaningful if no violation was recorded.
fn convert(
    msg: proto::TimeSeries,
    descriptor: &MetricDescriptor,
    policy: &ValidationPolicy,
    v: &mut Violations<TimeSeriesError>,
) -> TimeSeries {
    let proto::TimeSeries {
        label_values,
        gauge_points,
        cumulative_points,
    } = msg;

    let mut series = TimeSeries {
        label_values,
        points: Points::Gauge(Vec::new()),
    };

    if let Err(e) = check_arity(series.label_values.len(), descriptor) {
        if v.record(e) {
            return series;
        }
    }

    let found = PointKind::from_lists(!gauge_points.is_empty(), !cumulative_points.is_empty());
    if let Err(e) = check_kind(descriptor.metric_type, found) {
        if v.record(e) {
            return series;
        }
    }

    let use_cumulative = match descriptor.metric_type {
        MetricType::Cumulative => true,
        MetricType::Gauge => false,
        MetricType::Unspecified => found == PointKind::Cumulative,
    };

    series.points = if use_cumulative {
        let points = convert_points(cumulative_points, cumulative_point_from_proto, v);
        if !v.stopped() {
            walk_cumulative_points(points.iter().map(|(i, p)| (*i, p)), policy, v);
        }
        Points::Cumulative(points.into_iter().map(|(_, p)| p).collect())
    } else {
        let points = convert_points(gauge_points, gauge_point_from_proto, v);
        if !v.stopped() {
            walk_gauge_points(points.iter().map(|(i, p)| (*i, p)), v);
        }
        Points::Gauge(points.into_iter().map(|(_, p)| p).collect())
    };

    series
}

/// Converts wire points, keeping each one's index in the wire series.
fn convert_points<M, P, F>(
    msgs: Vec<M>,
    f: F,
    v: &mut Violations<TimeSeriesError>,
) -> Vec<(usize, P)>
where
    F: Fn(M) -> Result<P, CodecError>,
{
    let mut points = Vec::with_capacity(msgs.len());
    for (index, msg) in msgs.into_iter().enumerate() {
        match f(msg) {
            Ok(point) => points.push((index, point)),
            Err(source) => {
                if v.record(TimeSeriesError::MalformedPoint { index, source }) {
                    break;
                }
            }
        }
    }
    points
}

fn timestamp_from_proto(
    ts: Option<proto::Timestamp>,
    entity: &'static str,
    field: &'static str,
) -> Result<Timestamp, CodecError> {
    let ts = ts.ok_or(CodecError::MissingField { entity, field })?;
    let ts = Timestamp::new(ts.seconds, ts.nanos);
    check_timestamp(&ts)?;
    Ok(ts)
}

fn timestamp_to_proto(ts: Timestamp) -> Option<proto::Timestamp> {
    Some(proto::Timestamp {
        seconds: ts.seconds,
        nanos: ts.nanos,
    })
}

fn gauge_point_from_proto(msg: proto::GaugePoint) -> Result<GaugePoint, CodecError> {
    const ENTITY: &str = "GaugePoint";

    let timestamp = timestamp_from_proto(msg.timestamp, ENTITY, "timestamp")?;
    let value = match (msg.int64_value, msg.double_value) {
        (Some(v), None) => GaugeValue::Int64(v),
        (None, Some(v)) => GaugeValue::Double(v),
        (None, None) => return Err(CodecError::MissingValue { entity: ENTITY }),
        (Some(_), Some(_)) => {
            return Err(CodecError::MultipleValues {
                entity: ENTITY,
                arms: 2,
            })
        }
    };

    Ok(GaugePoint { timestamp, value })
}

fn cumulative_point_from_proto(msg: proto::CumulativePoint) -> Result<CumulativePoint, CodecError> {
    const ENTITY: &str = "CumulativePoint";

    let start_time = timestamp_from_proto(msg.start_time, ENTITY, "start_time")?;
    let end_time = timestamp_from_proto(msg.end_time, ENTITY, "end_time")?;

    let arms = usize::from(msg.int64_value.is_some())
        + usize::from(msg.double_value.is_some())
        + usize::from(msg.distribution_value.is_some());
    if arms > 1 {
        return Err(CodecError::MultipleValues {
            entity: ENTITY,
            arms,
        });
    }

    let value = if let Some(v) = msg.int64_value {
        CumulativeValue::Int64(v)
    } else if let Some(v) = msg.double_value {
        CumulativeValue::Double(v)
    } else if let Some(dist) = msg.distribution_value {
        CumulativeValue::Distribution(distribution::from_proto(dist))
    } else {
        return Err(CodecError::MissingValue { entity: ENTITY });
    };

    Ok(CumulativePoint {
        start_time,
        end_time,
        value,
    })
}

pub(crate) fn to_proto(series: &TimeSeries) -> proto::TimeSeries {
    let mut msg = proto::TimeSeries {
        label_values: series.label_values.clone(),
        ..Default::default()
    };

    match &series.points {
        Points::Gauge(points) => {
            msg.gauge_points = points
                .iter()
                .map(|p| {
                    let (int64_value, double_value) = match p.value {
                        GaugeValue::Int64(v) => (Some(v), None),
                        GaugeValue::Double(v) => (None, Some(v)),
                    };
                    proto::GaugePoint {
                        timestamp: timestamp_to_proto(p.timestamp),
                        int64_value,
                        double_value,
                    }
                })
                .collect();
        }
        Points::Cumulative(points) => {
            msg.cumulative_points = points
                .iter()
                .map(|p| {
                    let mut point = proto::CumulativePoint {
                        start_time: timestamp_to_proto(p.start_time),
                        end_time: timestamp_to_proto(p.end_time),
                        ..Default::default()
                    };
                    match &p.value {
                        CumulativeValue::Int64(v) => point.int64_value = Some(*v),
                        CumulativeValue::Double(v) => point.double_value = Some(*v),
                        CumulativeValue::Distribution(d) => {
                            point.distribution_value = Some(distribution::to_proto(d))
                        }
                    }
                    point
                })
                .collect();
        }
    }

    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Bucket, DistributionValue};
    use error::DistributionError;

    fn ts(seconds: i64) -> Timestamp {
        Timestamp::new(seconds, 0)
    }

    fn cumulative(start: i64, end: i64, value: i64) -> CumulativePoint {
        CumulativePoint {
            start_time: ts(start),
            end_time: ts(end),
            value: CumulativeValue::Int64(value),
        }
    }

    fn gauge(at: i64, value: f64) -> GaugePoint {
        GaugePoint {
            timestamp: ts(at),
            value: GaugeValue::Double(value),
        }
    }

    fn requests() -> MetricDescriptor {
        MetricDescriptor::new("requests", MetricType::Cumulative).with_label_keys(["region"])
    }

    fn temperature() -> MetricDescriptor {
        MetricDescriptor::new("temperature", MetricType::Gauge).with_label_keys(["room"])
    }

    fn policy() -> ValidationPolicy {
        ValidationPolicy::default()
    }

    #[test]
    fn test_cumulative_series_round_trip() {
        let series =
            TimeSeries::cumulative(["us"], vec![cumulative(0, 10, 5), cumulative(0, 20, 9)]);

        let bytes = encode(&series, &requests(), &policy()).unwrap();
        let decoded = decode(&bytes, &requests(), &policy()).unwrap();
        assert_eq!(decoded, series);
        assert_eq!(encode(&decoded, &requests(), &policy()).unwrap(), bytes);
    }

    #[test]
    fn test_gauge_series_round_trip() {
        let series = TimeSeries::gauge(
            ["kitchen"],
            vec![
                gauge(5, 21.5),
                GaugePoint {
                    timestamp: Timestamp::new(3, 999_999_999),
                    value: GaugeValue::Int64(0),
                },
            ],
        );

        let bytes = encode(&series, &temperature(), &policy()).unwrap();
        assert_eq!(decode(&bytes, &temperature(), &policy()).unwrap(), series);
    }

    #[test]
    fn test_label_arity_mismatch() {
        let series = TimeSeries::cumulative(["us", "east"], vec![cumulative(0, 10, 5)]);
        assert!(matches!(
            check(&series, &requests(), &policy()),
            Err(TimeSeriesError::LabelArityMismatch {
                expected: 1,
                actual: 2
            })
        ));

        let series = TimeSeries::cumulative(Vec::<String>::new(), vec![cumulative(0, 10, 5)]);
        assert!(matches!(
            encode(&series, &requests(), &policy()),
            Err(TimeSeriesError::LabelArityMismatch {
                expected: 1,
                actual: 0
            })
        ));
    }

    #[test]
    fn test_point_type_mismatch() {
        let series = TimeSeries::gauge(["us"], vec![gauge(1, 1.0)]);
        assert!(matches!(
            check(&series, &requests(), &policy()),
            Err(TimeSeriesError::PointTypeMismatch {
                declared: "cumulative",
                found: "gauge"
            })
        ));

        let series = TimeSeries::cumulative(["kitchen"], vec![cumulative(0, 1, 1)]);
        assert!(matches!(
            check(&series, &temperature(), &policy()),
            Err(TimeSeriesError::PointTypeMismatch {
                declared: "gauge",
                found: "cumulative"
            })
        ));
    }

    #[test]
    fn test_series_without_points() {
        let series = TimeSeries::cumulative(["us"], Vec::new());
        assert!(matches!(
            check(&series, &requests(), &policy()),
            Err(TimeSeriesError::PointTypeMismatch { found: "no", .. })
        ));
    }

    #[test]
    fn test_unspecified_descriptor_never_matches() {
        let descriptor = MetricDescriptor::new("x", MetricType::Unspecified);
        let series = TimeSeries::gauge(Vec::<String>::new(), vec![gauge(1, 1.0)]);
        assert!(matches!(
            check(&series, &descriptor, &policy()),
            Err(TimeSeriesError::PointTypeMismatch {
                declared: "unspecified",
                ..
            })
        ));
    }

    #[test]
    fn test_decode_rejects_both_point_lists() {
        let mut msg = to_proto(&TimeSeries::cumulative(["us"], vec![cumulative(0, 1, 1)]));
        msg.gauge_points = to_proto(&TimeSeries::gauge(["us"], vec![gauge(1, 1.0)])).gauge_points;

        let bytes = msg.encode_to_vec();
        assert!(matches!(
            decode(&bytes, &requests(), &policy()),
            Err(TimeSeriesError::PointTypeMismatch {
                found: "gauge and cumulative",
                ..
            })
        ));
    }

    #[test]
    fn test_distribution_error_carries_point_index() {
        let bad = DistributionValue {
            count: 6,
            mean: 1.0,
            bucket_bounds: vec![0.0, 10.0],
            buckets: vec![Bucket { count: 2 }, Bucket { count: 3 }, Bucket { count: 2 }],
            ..Default::default()
        };
        let series = TimeSeries::cumulative(
            ["us"],
            vec![
                cumulative(0, 10, 1),
                CumulativePoint {
                    start_time: ts(0),
                    end_time: ts(20),
                    value: CumulativeValue::Distribution(bad),
                },
            ],
        );

        let err = check(&series, &requests(), &policy()).unwrap_err();
        assert_eq!(err.point_index(), Some(1));
        assert!(matches!(
            err,
            TimeSeriesError::Distribution {
                index: 1,
                source: DistributionError::BucketCountMismatch {
                    expected: 6,
                    actual: 7
                }
            }
        ));
    }

    #[test]
    fn test_non_monotonic_end_time() {
        let series =
            TimeSeries::cumulative(["us"], vec![cumulative(0, 20, 1), cumulative(0, 10, 2)]);

        assert!(matches!(
            check(&series, &requests(), &policy()),
            Err(TimeSeriesError::NonMonotonicEndTime { index: 1 })
        ));

        for end_time_order in [Check::Warn, Check::Ignore] {
            let policy = ValidationPolicy {
                end_time_order,
                ..Default::default()
            };
            assert!(check(&series, &requests(), &policy).is_ok());
        }
    }

    #[test]
    fn test_equal_end_times_are_accepted() {
        let series =
            TimeSeries::cumulative(["us"], vec![cumulative(0, 10, 1), cumulative(0, 10, 1)]);
        assert!(check(&series, &requests(), &policy()).is_ok());
    }

    #[test]
    fn test_reset_starts_new_epoch() {
        // The counter resets at 30 and the new epoch ends before the last
        // end time of the previous one would have.
        let series = TimeSeries::cumulative(
            ["us"],
            vec![cumulative(0, 10, 5), cumulative(0, 40, 9), cumulative(30, 35, 1)],
        );
        assert!(check(&series, &requests(), &policy()).is_ok());
    }

    #[test]
    fn test_start_time_regression() {
        let series =
            TimeSeries::cumulative(["us"], vec![cumulative(10, 20, 5), cumulative(5, 25, 1)]);
        assert!(matches!(
            check(&series, &requests(), &policy()),
            Err(TimeSeriesError::StartTimeRegression { index: 1 })
        ));

        let lenient = ValidationPolicy {
            epoch_order: Check::Ignore,
            ..Default::default()
        };
        assert!(check(&series, &requests(), &lenient).is_ok());
    }

    #[test]
    fn test_start_after_end() {
        let series = TimeSeries::cumulative(["us"], vec![cumulative(10, 5, 1)]);
        assert!(matches!(
            check(&series, &requests(), &policy()),
            Err(TimeSeriesError::StartAfterEnd { index: 0 })
        ));
    }

    #[test]
    fn test_checks_are_independent() {
        // end time goes backwards within an epoch, start times are fine
        let series =
            TimeSeries::cumulative(["us"], vec![cumulative(0, 20, 1), cumulative(0, 10, 2)]);
        let policy = ValidationPolicy {
            epoch_order: Check::Ignore,
            ..Default::default()
        };
        assert!(matches!(
            check(&series, &requests(), &policy),
            Err(TimeSeriesError::NonMonotonicEndTime { .. })
        ));
    }

    #[test]
    fn test_invalid_timestamp() {
        let mut series = TimeSeries::gauge(["kitchen"], vec![gauge(1, 1.0)]);
        if let Points::Gauge(points) = &mut series.points {
            points[0].timestamp.nanos = -1;
        }

        assert!(matches!(
            check(&series, &temperature(), &policy()),
            Err(TimeSeriesError::MalformedPoint {
                index: 0,
                source: CodecError::InvalidTimestamp { nanos: -1, .. }
            })
        ));
    }

    #[test]
    fn test_decode_rejects_multiple_value_arms() {
        let mut msg = to_proto(&TimeSeries::gauge(["kitchen"], vec![gauge(1, 1.0), gauge(2, 2.0)]));
        msg.gauge_points[1].int64_value = Some(3);

        let bytes = msg.encode_to_vec();
        assert!(matches!(
            decode(&bytes, &temperature(), &policy()),
            Err(TimeSeriesError::MalformedPoint {
                index: 1,
                source: CodecError::MultipleValues { arms: 2, .. }
            })
        ));
    }

    #[test]
    fn test_decode_rejects_missing_value() {
        let mut msg = to_proto(&TimeSeries::cumulative(["us"], vec![cumulative(0, 1, 1)]));
        msg.cumulative_points[0].int64_value = None;

        let bytes = msg.encode_to_vec();
        assert!(matches!(
            decode(&bytes, &requests(), &policy()),
            Err(TimeSeriesError::MalformedPoint {
                index: 0,
                source: CodecError::MissingValue {
                    entity: "CumulativePoint"
                }
            })
        ));
    }

    #[test]
    fn test_decode_rejects_missing_timestamp() {
        let mut msg = to_proto(&TimeSeries::cumulative(["us"], vec![cumulative(0, 1, 1)]));
        msg.cumulative_points[0].end_time = None;

        let bytes = msg.encode_to_vec();
        assert!(matches!(
            decode(&bytes, &requests(), &policy()),
            Err(TimeSeriesError::MalformedPoint {
                index: 0,
                source: CodecError::MissingField {
                    field: "end_time",
                    ..
                }
            })
        ));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode(&[0xff, 0xff, 0xff], &requests(), &policy()),
            Err(TimeSeriesError::Codec(CodecError::Protobuf(_)))
        ));
    }

    #[test]
    fn test_decode_checks_arity_first() {
        // Also carries gauge points under a cumulative descriptor, but the
        // label arity is reported.
        let msg = to_proto(&TimeSeries::gauge(["a", "b"], vec![gauge(1, 1.0)]));
        assert!(matches!(
            decode(&msg.encode_to_vec(), &requests(), &policy()),
            Err(TimeSeriesError::LabelArityMismatch { .. })
        ));
    }

    fn bad_histogram() -> CumulativeValue {
        CumulativeValue::Distribution(DistributionValue {
            count: 1,
            mean: 1.0,
            bucket_bounds: vec![0.0],
            buckets: vec![Bucket { count: 1 }, Bucket { count: 1 }],
            ..Default::default()
        })
    }

    #[test]
    fn test_decode_rejects_embedded_distribution() {
        let mut bad = cumulative(0, 20, 0);
        bad.value = bad_histogram();
        let series = TimeSeries::cumulative(["us"], vec![cumulative(0, 10, 1), bad]);

        // to_proto does not validate, so the bytes carry the broken value.
        let bytes = to_proto(&series).encode_to_vec();
        assert!(matches!(
            decode(&bytes, &requests(), &policy()),
            Err(TimeSeriesError::Distribution {
                index: 1,
                source: DistributionError::BucketCountMismatch {
                    expected: 1,
                    actual: 2
                }
            })
        ));
    }

    #[test]
    fn test_diagnose_wire_keeps_point_indices() {
        let mut bad = cumulative(0, 30, 0);
        bad.value = bad_histogram();
        let series = TimeSeries::cumulative(
            ["us"],
            vec![cumulative(0, 10, 1), cumulative(0, 20, 2), bad],
        );
        let mut msg = to_proto(&series);
        msg.cumulative_points[0].int64_value = None;

        let errors = diagnose_proto(msg, &requests(), &policy());
        let indices: Vec<_> = errors.iter().map(TimeSeriesError::point_index).collect();
        assert_eq!(indices, vec![Some(0), Some(2)]);
        assert!(matches!(
            errors[0],
            TimeSeriesError::MalformedPoint {
                index: 0,
                source: CodecError::MissingValue { .. }
            }
        ));
        assert!(matches!(
            errors[1],
            TimeSeriesError::Distribution {
                index: 2,
                source: DistributionError::BucketCountMismatch { .. }
            }
        ));
    }

    #[test]
    fn test_diagnose_wire_skips_order_across_malformed_point() {
        // Points 0 and 2 are out of order, but point 1 between them does not
        // decode, so they are not compared.
        let series = TimeSeries::cumulative(
            ["us"],
            vec![cumulative(0, 30, 1), cumulative(0, 40, 2), cumulative(0, 10, 3)],
        );
        let mut msg = to_proto(&series);
        msg.cumulative_points[1].start_time = None;

        let errors = diagnose_proto(msg, &requests(), &policy());
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            TimeSeriesError::MalformedPoint {
                index: 1,
                source: CodecError::MissingField {
                    field: "start_time",
                    ..
                }
            }
        ));
    }

    #[test]
    fn test_diagnose_reports_everything() {
        let series = TimeSeries::cumulative(
            ["us", "extra"],
            vec![cumulative(0, 20, 1), cumulative(0, 10, 2), cumulative(30, 25, 3)],
        );

        let errors = diagnose(&series, &requests(), &policy());
        assert_eq!(errors.len(), 3);
        assert!(matches!(errors[0], TimeSeriesError::LabelArityMismatch { .. }));
        assert!(matches!(
            errors[1],
            TimeSeriesError::NonMonotonicEndTime { index: 1 }
        ));
        assert!(matches!(errors[2], TimeSeriesError::StartAfterEnd { index: 2 }));
    }
}
