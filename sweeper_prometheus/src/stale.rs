use chrono::{DateTime, Duration, Utc};

use crate::{MetricFamilies, MetricSample};

/// The gauge a push-gateway attaches to every group, holding the Unix time of its last push
pub const PUSH_TIME_METRIC: &str = "push_time_seconds";

/// Whether a push timestamp (in seconds) falls before the retention window.
///
/// The timestamp is truncated to whole seconds; `now` is not.
pub fn is_stale(timestamp: f64, retention: Duration, now: DateTime<Utc>) -> bool {
    let cutoff = match now.checked_sub_signed(retention) {
        Some(cutoff) => cutoff,
        // A window reaching past chrono's range either keeps or expires everything
        None => return retention < Duration::zero(),
    };
    let secs = timestamp as i64; // saturates for ±inf, NaN becomes 0
    match DateTime::from_timestamp(secs, 0) {
        Some(pushed_at) => pushed_at < cutoff,
        // Outside chrono's range: only the far past can be stale
        None => secs < 0,
    }
}

/// Collect the push-time samples whose group hasn't been pushed within `retention`.
///
/// Samples in any other family are ignored.
pub fn stale_samples(
    families: &MetricFamilies,
    retention: Duration,
    now: DateTime<Utc>,
) -> Vec<&MetricSample> {
    match families.get(PUSH_TIME_METRIC) {
        Some(family) => family
            .samples
            .iter()
            .filter(|sample| is_stale(sample.value, retention, now))
            .collect(),
        None => Vec::new(),
    }
}
