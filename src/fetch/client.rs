// src/fetch/client.rs

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::request::SeriesRequest;
use crate::cache::{CacheKey, PayloadCache};
use crate::config::FetchConfig;
use crate::normalize::BlsResponse;

/// Thin wrapper over one `reqwest::Client` pointed at the timeseries endpoint.
#[derive(Debug, Clone)]
pub struct BlsClient {
    client: Client,
    endpoint: Url,
    registration_key: Option<String>,
}

impl BlsClient {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint)
            .with_context(|| format!("parsing endpoint {}", config.endpoint))?;
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            endpoint,
            registration_key: config.registration_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// POST the request and decode the response. Transport failures, non-2xx
    /// statuses, undecodable bodies and API-level failures are all errors.
    #[instrument(level = "info", skip(self, request), fields(series = request.series_ids.len(), start = request.start_year, end = request.end_year))]
    pub async fn fetch(&self, request: &SeriesRequest) -> Result<BlsResponse> {
        request.validate()?;
        let body = request.body(self.registration_key.as_deref());

        debug!(endpoint = %self.endpoint, "POST");
        let text = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .with_context(|| format!("POST {} failed", self.endpoint))?
            .error_for_status()
            .with_context(|| format!("Non-success status {}", self.endpoint))?
            .text()
            .await
            .with_context(|| format!("Reading body from {}", self.endpoint))?;

        if text.trim().is_empty() {
            return Err(anyhow!("empty response body from {}", self.endpoint));
        }
        let response: BlsResponse =
            serde_json::from_str(&text).context("decoding timeseries response")?;
        let response = check_status(response)?;
        info!(series = response.series().len(), "fetched");
        Ok(response)
    }

    /// Serve from `cache` when a fresh payload exists; otherwise fetch and store.
    pub async fn fetch_cached(
        &self,
        cache: &dyn PayloadCache,
        request: &SeriesRequest,
    ) -> Result<BlsResponse> {
        let key = CacheKey::from_request(request);
        match cache.get(&key) {
            Ok(Some(hit)) => {
                info!(key = %key.fingerprint(), "cache hit");
                return Ok(hit);
            }
            Ok(None) => debug!(key = %key.fingerprint(), "cache miss"),
            Err(e) => warn!(error = %e, "cache read failed; fetching"),
        }

        let response = self.fetch(request).await?;
        if let Err(e) = cache.put(&key, &response) {
            warn!(error = %e, "cache write failed");
        }
        Ok(response)
    }
}

/// Accept only `REQUEST_SUCCEEDED` responses that carry a `Results` container.
pub fn check_status(response: BlsResponse) -> Result<BlsResponse> {
    if !response.succeeded() {
        return Err(anyhow!(
            "request not processed ({}): {}",
            response.status,
            response.message.join("; ")
        ));
    }
    if response.results.is_none() {
        return Err(anyhow!("response has no Results container"));
    }
    for m in &response.message {
        warn!(message = %m, "API message");
    }
    Ok(response)
}
