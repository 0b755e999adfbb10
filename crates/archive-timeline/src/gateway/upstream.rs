//! The upstream records API.

use std::fmt;

use async_trait::async_trait;
use axum::body::Bytes;
use serde::de::IgnoredAny;
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};

/// A paginated, offset-cursor records API.
#[async_trait]
pub trait RecordsUpstream: Send + Sync + fmt::Debug {
    /// List one page of records starting at `offset`.
    ///
    /// Returns the raw body, already checked to be JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UpstreamUnavailable`] for network failures and non-2xx
    /// statuses, and [`Error::MalformedResponse`] when the body is not JSON.
    async fn list_records(&self, offset: Option<&str>) -> Result<Bytes>;
}

/// Airtable's list-records endpoint.
#[derive(Clone)]
pub struct AirtableUpstream {
    client: reqwest::Client,
    url: String,
    token: String,
}

impl fmt::Debug for AirtableUpstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AirtableUpstream")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl AirtableUpstream {
    /// Build from the `[upstream]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns an error if required values are missing or the HTTP client
    /// cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate_upstream()?;
        let client = reqwest::Client::builder()
            .timeout(config.upstream_timeout())
            .build()?;
        Ok(Self {
            client,
            url: config.upstream_url(),
            token: config.upstream.access_token.clone(),
        })
    }

    /// Table URL requests are sent to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RecordsUpstream for AirtableUpstream {
    async fn list_records(&self, offset: Option<&str>) -> Result<Bytes> {
        let mut request = self.client.get(&self.url).bearer_auth(&self.token);
        if let Some(offset) = offset {
            request = request.query(&[("offset", offset)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::upstream(format!("upstream responded with {status}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::upstream(format!("reading body: {e}")))?;
        debug!(bytes = body.len(), "upstream page received");
        serde_json::from_slice::<IgnoredAny>(&body)
            .map_err(|e| Error::malformed(e.to_string()))?;
        Ok(body)
    }
}
