use chrono::{DateTime, Duration, Utc};
use std::io::Write;

use crate::debug::SweepStats;
use crate::error::SweepResult;
use crate::gateway::Gateway;
use crate::grouping::GroupingKey;
use crate::parser;
use crate::stale::{self, PUSH_TIME_METRIC};
use crate::MetricType;

/// Run one sweep: fetch the gateway's metrics, then delete every group whose last
/// push is older than `retention`.
///
/// Each deletion is written to `out` as `DELETE <url>` once the gateway accepts it.
/// The first failure ends the sweep; groups after it are left untouched.
pub async fn sweep<W: Write>(
    gateway: &Gateway,
    retention: Duration,
    now: DateTime<Utc>,
    out: &mut W,
) -> SweepResult<SweepStats> {
    let body = gateway.fetch_metrics().await?;
    let families = parser::parse(&body)?;

    let mut stats = SweepStats {
        families: families.len(),
        ..Default::default()
    };
    if let Some(family) = families.get(PUSH_TIME_METRIC) {
        stats.groups = family.samples.len();
        if family.metric_type != MetricType::Gauge {
            tracing::warn!(
                metric_type = family.metric_type.as_str(),
                "{} is not declared as a gauge",
                PUSH_TIME_METRIC
            );
        }
    }

    let stale = stale::stale_samples(&families, retention, now);
    stats.stale = stale.len();
    tracing::debug!(groups = stats.groups, stale = stats.stale, "found stale groups");

    for sample in stale {
        let key = GroupingKey::from_labels(&sample.labels);
        let url = gateway.delete_group(&key).await?;
        writeln!(out, "DELETE {}", url)?;
        stats.deleted += 1;
    }
    out.flush()?;

    Ok(stats)
}
