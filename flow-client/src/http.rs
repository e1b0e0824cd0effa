//! HTTP transport for the onboarding backend.
//!
//! Speaks plain JSON over HTTPS:
//!
//! ```text
//! GET  {base}/v1/flow       -> FlowConfig
//! POST {base}/v1/events     <- {"events": [EventEnvelope]}
//! POST {base}/v1/identify   <- IdentifyRequest
//! ```
//!
//! Every request carries the API key in the `x-api-key` header.

use std::sync::Arc;

use async_trait::async_trait;
use flow_core::FlowConfig;
use reqwest::{Client, Response};
use serde::Serialize;
use url::Url;

use crate::batcher::EventEnvelope;
use crate::identity::IdentifyRequest;
use crate::transport::{ConfigSource, EventTransport};
use crate::{ClientError, ClientResult, SdkConfig};

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// reqwest-backed [`ConfigSource`] and [`EventTransport`].
#[derive(Clone)]
pub struct HttpTransport {
    inner: Arc<InnerTransport>,
}

struct InnerTransport {
    http: Client,
    base: Url,
    api_key: String,
}

#[derive(Serialize)]
struct EventBatch<'a> {
    events: &'a [EventEnvelope],
}

impl HttpTransport {
    /// Create a transport for `config.base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] if the URL is malformed.
    /// Returns [`ClientError::Http`] if the HTTP client fails to build.
    pub fn new(config: &SdkConfig) -> ClientResult<Self> {
        let mut base =
            Url::parse(&config.base_url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(config.base_url.clone()));
        }
        // Url::join replaces the last segment unless the path ends with '/'.
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }

        let http = Client::builder()
            .user_agent(concat!("flow-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(InnerTransport {
                http,
                base,
                api_key: config.api_key.clone(),
            }),
        })
    }

    /// Absolute URL of an API path such as `v1/flow`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] if the path cannot be joined.
    pub fn endpoint(&self, path: &str) -> ClientResult<Url> {
        self.inner
            .base
            .join(path)
            .map_err(|e| ClientError::InvalidUrl(e.to_string()))
    }

    async fn check(response: Response) -> ClientResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = if body.is_empty() {
            status.canonical_reason().unwrap_or("unknown").to_string()
        } else {
            body
        };
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn post_json<T: Serialize + Sync>(&self, path: &str, body: &T) -> ClientResult<()> {
        let response = self
            .inner
            .http
            .post(self.endpoint(path)?)
            .header(API_KEY_HEADER, &self.inner.api_key)
            .json(body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl ConfigSource for HttpTransport {
    async fn fetch_config(&self) -> ClientResult<FlowConfig> {
        let response = self
            .inner
            .http
            .get(self.endpoint("v1/flow")?)
            .header(API_KEY_HEADER, &self.inner.api_key)
            .send()
            .await?;
        let body = Self::check(response).await?.text().await?;
        let config = FlowConfig::from_json(&body)?;
        tracing::info!(
            "Fetched flow version {} with {} screens",
            config.version,
            config.screens.len()
        );
        Ok(config)
    }
}

#[async_trait]
impl EventTransport for HttpTransport {
    async fn send_events(&self, events: &[EventEnvelope]) -> ClientResult<()> {
        self.post_json("v1/events", &EventBatch { events }).await
    }

    async fn identify(&self, request: &IdentifyRequest) -> ClientResult<()> {
        self.post_json("v1/identify", request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_keeps_base_path() {
        let transport =
            HttpTransport::new(&SdkConfig::new("k").with_base_url("https://api.example.com/tenant"))
                .expect("transport");
        assert_eq!(
            transport.endpoint("v1/flow").expect("url").as_str(),
            "https://api.example.com/tenant/v1/flow"
        );

        let root = HttpTransport::new(&SdkConfig::new("k").with_base_url("https://api.example.com"))
            .expect("transport");
        assert_eq!(
            root.endpoint("v1/events").expect("url").as_str(),
            "https://api.example.com/v1/events"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let result = HttpTransport::new(&SdkConfig::new("k").with_base_url("not a url"));
        assert!(matches!(result, Err(ClientError::InvalidUrl(_))));

        let result = HttpTransport::new(&SdkConfig::new("k").with_base_url("mailto:ops@example.com"));
        assert!(matches!(result, Err(ClientError::InvalidUrl(_))));
    }
}
