use chrono::{DateTime, TimeDelta, Utc};

use metricset::{
    Aggregator, AggregatorError, Bucket, CumulativePoint, CumulativeValue, DistributionValue,
    GaugePoint, GaugeValue, Metric, MetricDescriptor, MetricSet, MetricType, Range, TimeSeries,
    Timestamp,
};

const REGIONS: [&str; 3] = ["us", "eu", "ap"];

/// Builds the `idx`-th sample set of an accumulation epoch that began at
/// `epoch_start`. Consecutive sets end ten seconds apart.
pub fn metric_set(epoch_start: DateTime<Utc>, idx: usize) -> Result<MetricSet, AggregatorError> {
    let start_time = Timestamp::from(epoch_start);
    let end_time = Timestamp::from(epoch_start + TimeDelta::seconds(10 * (idx as i64 + 1)));
    let n = idx as i64 + 1;

    let mut aggregator = Aggregator::default();

    aggregator.add(Metric::new(
        MetricDescriptor::new("process/cpu/utilization", MetricType::Gauge)
            .with_description("Fraction of CPU time used by the process")
            .with_unit("1"),
        vec![TimeSeries::gauge(
            Vec::<String>::new(),
            vec![GaugePoint {
                timestamp: end_time,
                value: GaugeValue::Double(0.25),
            }],
        )],
    ))?;

    let requests = REGIONS
        .iter()
        .enumerate()
        .map(|(i, region)| {
            TimeSeries::cumulative(
                [*region],
                vec![CumulativePoint {
                    start_time,
                    end_time,
                    value: CumulativeValue::Int64(n * 100 * (i as i64 + 1)),
                }],
            )
        })
        .collect();
    aggregator.add(Metric::new(
        MetricDescriptor::new("http/server/requests", MetricType::Cumulative)
            .with_description("Requests served")
            .with_unit("1")
            .with_label_keys(["region"]),
        requests,
    ))?;

    // 6n samples: 2n below 5ms, 3n in [5ms, 50ms), n at or above 50ms
    let latency = DistributionValue {
        count: 6 * n,
        mean: 21.0,
        sum_of_squared_deviation: 1750.0 * n as f64,
        range: Some(Range {
            min: 0.5,
            max: 120.0,
        }),
        bucket_bounds: vec![5.0, 50.0],
        buckets: vec![
            Bucket { count: 2 * n },
            Bucket { count: 3 * n },
            Bucket { count: n },
        ],
    };
    aggregator.add(Metric::new(
        MetricDescriptor::new("http/server/latency", MetricType::Cumulative)
            .with_description("Request latency")
            .with_unit("ms"),
        vec![TimeSeries::cumulative(
            Vec::<String>::new(),
            vec![CumulativePoint {
                start_time,
                end_time,
                value: CumulativeValue::Distribution(latency),
            }],
        )],
    ))?;

    Ok(aggregator.finalize())
}
