//! Network capability: obtain a complete scan report.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};
use url::Url;
use wardeck_model::ScanDataset;

use crate::error::{Result, SyncError};

/// Anything that can produce a complete scan report.
#[async_trait]
pub trait ScanFetcher: Send + Sync + std::fmt::Debug {
    async fn fetch_scan(&self) -> Result<ScanDataset>;
}

/// Fetches the report from the scanner's HTTP endpoint.
#[derive(Clone, Debug)]
pub struct HttpScanFetcher {
    client: Client,
    endpoint: Url,
    timeout: Duration,
}

impl HttpScanFetcher {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        info!("scan fetcher targeting {}", endpoint);

        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// A client-side timeout reports the same error as the controller's own
    /// deadline.
    fn classify(&self, err: reqwest::Error) -> SyncError {
        if err.is_timeout() {
            SyncError::Timeout(self.timeout)
        } else {
            SyncError::from(err)
        }
    }
}

#[async_trait]
impl ScanFetcher for HttpScanFetcher {
    async fn fetch_scan(&self) -> Result<ScanDataset> {
        debug!("GET {}", self.endpoint);
        let response = self
            .client
            .get(self.endpoint.clone())
            .send()
            .await
            .map_err(|err| self.classify(err))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SyncError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await.map_err(|err| self.classify(err))?;
        Ok(ScanDataset::from_json_slice(&bytes)?)
    }
}
