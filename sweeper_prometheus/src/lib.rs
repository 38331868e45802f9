//! Finds stale groups on a Prometheus push-gateway and deletes them.

pub mod debug;
pub mod error;
pub mod gateway;
pub mod grouping;
pub mod parser;
pub mod stale;
pub mod sweep;

use indexmap::IndexMap;
use std::str::FromStr;

/// Metric families keyed by name, in the order they first appeared
pub type MetricFamilies = IndexMap<String, MetricFamily>;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MetricType {
    Counter,
    Gauge,
    Summary,
    Histogram,
    Untyped,
}

impl MetricType {
    pub fn as_str(&self) -> &str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
            MetricType::Summary => "summary",
            MetricType::Histogram => "histogram",
            MetricType::Untyped => "untyped",
        }
    }
}

impl Default for MetricType {
    fn default() -> Self {
        MetricType::Untyped
    }
}

impl FromStr for MetricType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "counter" => Ok(MetricType::Counter),
            "gauge" => Ok(MetricType::Gauge),
            "summary" => Ok(MetricType::Summary),
            "histogram" => Ok(MetricType::Histogram),
            "untyped" => Ok(MetricType::Untyped),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Label {
    pub name: String,
    pub value: String,
}

impl Label {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Label {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A single measurement within a family.
///
/// `name` is the series name as written, which differs from the family name
/// for the `_sum`, `_count` and `_bucket` series of summaries and histograms.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricSample {
    pub name: String,
    pub labels: Vec<Label>,
    pub value: f64,
    pub timestamp_ms: Option<i64>,
}

impl MetricSample {
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|label| label.name == name)
            .map(|label| label.value.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetricFamily {
    pub name: String,
    pub help: Option<String>,
    pub metric_type: MetricType,
    pub samples: Vec<MetricSample>,

    /// Whether a `# TYPE` line was seen for this family
    pub(crate) typed: bool,
}

impl MetricFamily {
    pub fn new(name: impl Into<String>) -> Self {
        MetricFamily {
            name: name.into(),
            ..Default::default()
        }
    }
}
