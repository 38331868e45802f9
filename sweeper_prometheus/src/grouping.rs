use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use std::fmt;

use crate::Label;

/// The labels identifying one pushed group, ordered the way the push-gateway
/// expects them in a url: `job` first, then the rest as they were exposed.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupingKey<'a> {
    labels: Vec<&'a Label>,
}

impl<'a> GroupingKey<'a> {
    pub fn from_labels(labels: &'a [Label]) -> Self {
        let mut ordered = Vec::with_capacity(labels.len());
        ordered.extend(labels.iter().filter(|label| label.name == "job"));
        ordered.extend(labels.iter().filter(|label| label.name != "job"));
        GroupingKey { labels: ordered }
    }

    pub fn job(&self) -> Option<&str> {
        self.labels
            .first()
            .filter(|label| label.name == "job")
            .map(|label| label.value.as_str())
    }

    /// The group's path below the gateway's base url, e.g. `/metrics/job/a/instance/b`
    pub fn path(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for GroupingKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("/metrics")?;
        for label in &self.labels {
            if label.value.is_empty() {
                write!(f, "/{}@base64/=", label.name)?;
            } else if is_plain_segment(&label.value) {
                write!(f, "/{}/{}", label.name, label.value)?;
            } else {
                write!(f, "/{}@base64/{}", label.name, URL_SAFE.encode(&label.value))?;
            }
        }
        Ok(())
    }
}

/// Whether a value survives url parsing unchanged as a single path segment.
///
/// Only unreserved characters qualify, and `.` and `..` are excluded since they
/// are collapsed as dot-segments.
fn is_plain_segment(value: &str) -> bool {
    value != "."
        && value != ".."
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~'))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn puts_job_first() {
        let labels = vec![Label::new("instance", "b"), Label::new("job", "a")];
        let key = GroupingKey::from_labels(&labels);
        assert_eq!(key.job(), Some("a"));
        assert_eq!(key.path(), "/metrics/job/a/instance/b");
    }

    #[test]
    fn keeps_exposed_order_after_job() {
        let labels = vec![
            Label::new("zone", "eu"),
            Label::new("instance", "host-1"),
            Label::new("job", "batch"),
            Label::new("attempt", "3"),
        ];
        let key = GroupingKey::from_labels(&labels);
        assert_eq!(
            key.path(),
            "/metrics/job/batch/zone/eu/instance/host-1/attempt/3"
        );
    }

    #[test]
    fn omits_missing_job() {
        let labels = vec![Label::new("instance", "b")];
        let key = GroupingKey::from_labels(&labels);
        assert_eq!(key.job(), None);
        assert_eq!(key.path(), "/metrics/instance/b");
        assert_eq!(GroupingKey::from_labels(&[]).path(), "/metrics");
    }

    #[test]
    fn encodes_values_that_are_not_path_segments() {
        let labels = vec![
            Label::new("job", "nightly/backup"),
            Label::new("instance", ""),
        ];
        let key = GroupingKey::from_labels(&labels);
        assert_eq!(
            key.path(),
            "/metrics/job@base64/bmlnaHRseS9iYWNrdXA=/instance@base64/="
        );
    }

    #[test]
    fn encodes_values_with_url_syntax() {
        let labels = vec![
            Label::new("job", "a"),
            Label::new("instance", "fresh-host?old"),
            Label::new("shard", "a#b"),
            Label::new("load", "50%"),
            Label::new("parent", ".."),
            Label::new("current", "."),
            Label::new("version", "v1.2_rc~3"),
        ];
        let key = GroupingKey::from_labels(&labels);
        assert_eq!(
            key.path(),
            "/metrics/job/a/instance@base64/ZnJlc2gtaG9zdD9vbGQ=/shard@base64/YSNi\
             /load@base64/NTAl/parent@base64/Li4=/current@base64/Lg==/version/v1.2_rc~3"
        );
    }
}
