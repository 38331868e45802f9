use async_std::future::timeout;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::time::Duration;
use surf::http::headers::AUTHORIZATION;
use surf::http::Method;
use surf::{StatusCode, Url};

use crate::error::{SweepError, SweepResult};
use crate::grouping::GroupingKey;

/// How long to wait for any single request to the gateway, including its body
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Static basic-auth credentials
#[derive(Clone, Debug, PartialEq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    fn header_value(&self) -> String {
        let pair = format!("{}:{}", self.username, self.password);
        format!("Basic {}", STANDARD.encode(pair))
    }
}

/// A push-gateway, reached through a single shared http client
pub struct Gateway {
    /// The gateway's base url, without a trailing slash.
    ///
    /// e.g. http://pushgateway.monitoring:9091
    base_url: String,

    /// Precomputed `Authorization` header, if credentials were given
    authorization: Option<String>,

    timeout: Duration,
    client: surf::Client,
}

impl Gateway {
    pub fn new(base_url: &str, credentials: Option<Credentials>) -> SweepResult<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(SweepError::InvalidUrl {
                url: base_url.to_owned(),
                reason: "URL is required".to_owned(),
            });
        }
        Url::parse(base_url).map_err(|err| SweepError::InvalidUrl {
            url: base_url.to_owned(),
            reason: err.to_string(),
        })?;

        Ok(Gateway {
            base_url: base_url.to_owned(),
            authorization: credentials.as_ref().map(Credentials::header_value),
            timeout: REQUEST_TIMEOUT,
            client: surf::Client::new(),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn metrics_url(&self) -> String {
        format!("{}/metrics", self.base_url)
    }

    pub fn group_url(&self, key: &GroupingKey<'_>) -> String {
        format!("{}{}", self.base_url, key)
    }

    /// Read the gateway's exposition text; anything but `200 OK` is an error
    pub async fn fetch_metrics(&self) -> SweepResult<String> {
        let url = self.metrics_url();
        tracing::debug!(%url, "fetching metrics");
        let exchange = async {
            let mut response = self.send(Method::Get, &url).await?;
            expect_status(&response, StatusCode::Ok, Method::Get, &url)?;
            response
                .body_string()
                .await
                .map_err(|error| SweepError::Transport {
                    method: Method::Get,
                    url: url.clone(),
                    error,
                })
        };
        timeout(self.timeout, exchange)
            .await
            .map_err(|_| SweepError::Timeout {
                method: Method::Get,
                url: url.clone(),
            })?
    }

    /// Delete one group; anything but `202 Accepted` is an error.
    ///
    /// Returns the url that was deleted.
    pub async fn delete_group(&self, key: &GroupingKey<'_>) -> SweepResult<String> {
        let url = self.group_url(key);
        tracing::debug!(%url, job = key.job().unwrap_or_default(), "deleting group");
        let exchange = async {
            let response = self.send(Method::Delete, &url).await?;
            expect_status(&response, StatusCode::Accepted, Method::Delete, &url)
        };
        timeout(self.timeout, exchange)
            .await
            .map_err(|_| SweepError::Timeout {
                method: Method::Delete,
                url: url.clone(),
            })??;
        Ok(url)
    }

    async fn send(&self, method: Method, url: &str) -> SweepResult<surf::Response> {
        let parsed = Url::parse(url).map_err(|err| SweepError::InvalidUrl {
            url: url.to_owned(),
            reason: err.to_string(),
        })?;
        let mut request = surf::Request::new(method, parsed);
        if let Some(authorization) = &self.authorization {
            request.insert_header(AUTHORIZATION, authorization.as_str());
        }
        self.client
            .send(request)
            .await
            .map_err(|error| SweepError::Transport {
                method,
                url: url.to_owned(),
                error,
            })
    }
}

fn expect_status(
    response: &surf::Response,
    expected: StatusCode,
    method: Method,
    url: &str,
) -> SweepResult<()> {
    let status = response.status();
    if status == expected {
        Ok(())
    } else {
        Err(SweepError::UnexpectedStatus {
            method,
            url: url.to_owned(),
            status: status.into(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Label;

    #[test]
    fn trims_trailing_slash() {
        let gateway = Gateway::new("http://localhost:9091/", None).unwrap();
        assert_eq!(gateway.base_url(), "http://localhost:9091");
        assert_eq!(gateway.metrics_url(), "http://localhost:9091/metrics");

        let labels = vec![Label::new("instance", "b"), Label::new("job", "a")];
        assert_eq!(
            gateway.group_url(&GroupingKey::from_labels(&labels)),
            "http://localhost:9091/metrics/job/a/instance/b"
        );
    }

    #[test]
    fn rejects_missing_or_relative_urls() {
        assert!(matches!(
            Gateway::new("", None),
            Err(SweepError::InvalidUrl { .. })
        ));
        assert!(matches!(
            Gateway::new("  ", None),
            Err(SweepError::InvalidUrl { .. })
        ));
        assert!(matches!(
            Gateway::new("localhost/pushgateway", None),
            Err(SweepError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn encodes_basic_auth() {
        let credentials = Credentials {
            username: "Aladdin".into(),
            password: "open sesame".into(),
        };
        assert_eq!(
            credentials.header_value(),
            "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ=="
        );
    }
}
