use std::time::Duration;

use reqwest::Client;

use adspend_core::RawRecordSet;

use crate::decode::decode_csv;
use crate::error::FetchError;

/// HTTP client for retrieving raw CSV exports from a direct-download URL.
///
/// Retrieval is a single-shot request: the surrounding system decides
/// whether and when to retry a failed ingest.
#[derive(Debug, Clone)]
pub struct CsvFetcher {
    client: Client,
}

impl CsvFetcher {
    /// Creates a `CsvFetcher` with the configured timeout and `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed (e.g., invalid TLS config).
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    /// Fetches the raw bytes of a CSV export.
    ///
    /// # Errors
    ///
    /// - [`FetchError::UnexpectedStatus`] — any non-2xx response.
    /// - [`FetchError::Http`] — network or TLS failure.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// Fetches a CSV export and decodes it into a [`RawRecordSet`].
    ///
    /// # Errors
    ///
    /// Propagates [`FetchError::Http`] / [`FetchError::UnexpectedStatus`]
    /// from the fetch and [`FetchError::Decode`] from the decoder.
    pub async fn fetch_record_set(&self, url: &str) -> Result<RawRecordSet, FetchError> {
        let bytes = self.fetch(url).await?;
        decode_csv(&bytes)
    }
}
