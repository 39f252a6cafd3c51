//! Network seam between the console components and the server.
//!
//! [`StateStreamConsumer`](crate::feed::StateStreamConsumer) and
//! [`RegistrationClient`](crate::registration::RegistrationClient) only ever
//! talk to the server through [`Transport`]. [`HttpTransport`] is the reqwest
//! implementation; tests substitute in-memory fakes.

use std::future::Future;

use futures::StreamExt;
use futures::stream::{self, BoxStream};
use reqwest::header::{ACCEPT, HeaderValue};
use tracing::debug;

use crate::error::TransportError;
use crate::models::{DriverIdentity, RegistrationRequest, RegistrationResult};
use crate::sse::{SseDecoder, SseEvent};

/// Payload strings from the push channel, in delivery order.
pub type FeedStream = BoxStream<'static, Result<String, TransportError>>;

pub trait Transport: Send + Sync {
    /// Current driver identity; `None` when nobody is registered.
    fn fetch_driver_name(
        &self,
    ) -> impl Future<Output = Result<Option<String>, TransportError>> + Send;

    fn register_driver(
        &self,
        request: &RegistrationRequest,
    ) -> impl Future<Output = Result<RegistrationResult, TransportError>> + Send;

    /// Open the long-lived state push channel.
    fn open_state_feed(&self) -> impl Future<Output = Result<FeedStream, TransportError>> + Send;
}

/// Endpoint paths relative to the server base URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    pub state_feed: String,
    pub driver_name: String,
    pub register_driver: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            state_feed: "/state_feed".to_string(),
            driver_name: "/get_driver_name".to_string(),
            register_driver: "/register_driver".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    endpoints: Endpoints,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, endpoints: Endpoints) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, endpoints)
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        endpoints: Endpoints,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            endpoints,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

impl Transport for HttpTransport {
    async fn fetch_driver_name(&self) -> Result<Option<String>, TransportError> {
        let url = self.url(&self.endpoints.driver_name);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;
        let resp = ensure_success(resp).await?;
        let identity: DriverIdentity = resp.json().await.map_err(TransportError::from_reqwest)?;
        debug!(driver_name = ?identity.driver_name, "fetched driver identity");
        Ok(identity.driver_name)
    }

    async fn register_driver(
        &self,
        request: &RegistrationRequest,
    ) -> Result<RegistrationResult, TransportError> {
        let url = self.url(&self.endpoints.register_driver);
        let resp = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;

        let status = resp.status();
        let body = resp.bytes().await.map_err(TransportError::from_reqwest)?;
        if status.is_success() {
            return Ok(serde_json::from_slice(&body)?);
        }

        // The server reports its own failures as `{success: false}` with a 5xx
        match serde_json::from_slice::<RegistrationResult>(&body) {
            Ok(result) => Ok(result),
            Err(_) => Err(TransportError::Status {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            }),
        }
    }

    async fn open_state_feed(&self) -> Result<FeedStream, TransportError> {
        let url = self.url(&self.endpoints.state_feed);
        let resp = self
            .client
            .get(&url)
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;
        let resp = ensure_success(resp).await?;
        debug!(%url, "state feed opened");

        let mut decoder = SseDecoder::new();
        let frames = resp
            .bytes_stream()
            .map(move |chunk| match chunk {
                Ok(bytes) => match decoder.push(&bytes) {
                    Ok(events) => message_payloads(events),
                    Err(e) => vec![Err(e.into())],
                },
                Err(e) => vec![Err(TransportError::from_reqwest(e))],
            })
            .flat_map(stream::iter);
        Ok(frames.boxed())
    }
}

/// Keep only unnamed (`message`) events, as a browser `onmessage` would.
fn message_payloads(events: Vec<SseEvent>) -> Vec<Result<String, TransportError>> {
    events
        .into_iter()
        .filter(|e| matches!(e.event.as_deref(), None | Some("message")))
        .map(|e| Ok(e.data))
        .collect()
}

async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response, TransportError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(TransportError::Status { status, body })
}
