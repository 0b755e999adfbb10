//! Where pages come from.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::record::Page;

/// Gateway route serving record pages.
pub const RECORDS_PATH: &str = "/api/records";

/// A provider of record pages addressed by an opaque cursor.
///
/// The first page is requested with `None`.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch the page starting at `cursor`.
    ///
    /// # Errors
    ///
    /// Returns an error when the page cannot be retrieved or decoded.
    async fn fetch(&self, cursor: Option<&str>) -> Result<Page>;
}

#[async_trait]
impl<T: PageSource + ?Sized> PageSource for std::sync::Arc<T> {
    async fn fetch(&self, cursor: Option<&str>) -> Result<Page> {
        (**self).fetch(cursor).await
    }
}

/// Pages fetched from the gateway over HTTP.
#[derive(Debug, Clone)]
pub struct HttpPageSource {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPageSource {
    /// Create a source for the gateway rooted at `gateway_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(gateway_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}{RECORDS_PATH}", gateway_url.trim_end_matches('/')),
        })
    }

    /// Create a source from the `[client]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.client.gateway_url, config.client_timeout())
    }

    /// Full URL of the records route.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch(&self, cursor: Option<&str>) -> Result<Page> {
        let mut request = self.client.get(&self.endpoint);
        if let Some(cursor) = cursor {
            request = request.query(&[("offset", cursor)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::fetch_failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::fetch_failed(format!(
                "gateway responded with {status}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::fetch_failed(format!("unreadable body: {e}")))?;
        let page = Page::from_value(body)?;
        debug!(
            records = page.records.len(),
            has_next = !page.is_last(),
            "page received"
        );
        Ok(page)
    }
}
