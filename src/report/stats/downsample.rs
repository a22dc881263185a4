use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct GraphPoint {
    pub(crate) timestamp: DateTime<Utc>,
    pub(crate) value: f64,
}

struct BucketAggregate {
    min: GraphPoint,
    max: GraphPoint,
}

/// Min/max bucketing over time so peaks survive the reduction to at most `2 * width_px` points.
pub(crate) fn downsample_points(points: &[GraphPoint], width_px: usize) -> Vec<GraphPoint> {
    if points.len() <= 2 || points.len() <= width_px {
        return points.to_vec();
    }

    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return Vec::new();
    };
    let start_ts = first.timestamp.timestamp_millis();
    let end_ts = last.timestamp.timestamp_millis();

    if end_ts <= start_ts {
        return points.to_vec();
    }

    let bucket_count = width_px.max(1);
    let mut buckets: Vec<Option<BucketAggregate>> =
        std::iter::repeat_with(|| None).take(bucket_count).collect();

    for point in points {
        let position =
            (point.timestamp.timestamp_millis() - start_ts) as f64 / (end_ts - start_ts) as f64;
        let bucket_index = (position * (bucket_count - 1) as f64).floor() as usize;

        let bucket = &mut buckets[bucket_index.min(bucket_count - 1)];
        match bucket {
            Some(existing) => {
                if point.value < existing.min.value {
                    existing.min = *point;
                }
                if point.value > existing.max.value {
                    existing.max = *point;
                }
            }
            None => {
                *bucket = Some(BucketAggregate {
                    min: *point,
                    max: *point,
                });
            }
        }
    }

    let mut reduced = Vec::with_capacity(bucket_count * 2);
    for bucket in buckets.into_iter().flatten() {
        let (earlier, later) = if bucket.min.timestamp <= bucket.max.timestamp {
            (bucket.min, bucket.max)
        } else {
            (bucket.max, bucket.min)
        };
        reduced.push(earlier);
        if later.timestamp != earlier.timestamp {
            reduced.push(later);
        }
    }

    reduced
}
