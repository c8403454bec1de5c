// =============================================================================
// transport.rs — THE WIRE
// =============================================================================
//
// The one capability the scraper needs from the outside world: "GET this URL,
// tell me the status and the body, or tell me what kind of failure it was".
//
// `HttpTransport` does it for real with reqwest. `ScriptedTransport` plays
// back canned responses so the whole pipeline can be exercised without a
// network cable anywhere in sight.
// =============================================================================

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// A complete HTTP response, body already read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }
}

/// Why a request never produced a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("failed to read response body: {0}")]
    Body(String),
    #[error("request failed: {0}")]
    Request(String),
}

impl TransportError {
    /// Worth another attempt after a backoff.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TransportError::Timeout(_) | TransportError::Connect(_) | TransportError::Body(_)
        )
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<RawResponse, TransportError>;
}

/// The real thing: a reqwest client with a timeout and a browser-ish
/// User-Agent, because screeners tend to slam the door on anything that
/// looks like a script.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Ok(Self { client })
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else if err.is_body() || err.is_decode() {
        TransportError::Body(err.to_string())
    } else {
        TransportError::Request(err.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &Url) -> Result<RawResponse, TransportError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(classify)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify)?;

        debug!(url = %url, status = status, bytes = body.len(), "HTTP response received");
        Ok(RawResponse { status, body })
    }
}

type Scripted = Result<RawResponse, TransportError>;

/// Canned responses keyed by exact URL.
///
/// Each URL holds a queue. Responses are handed out in order and the last one
/// keeps repeating once the queue is down to it. URLs nobody scripted get a
/// 404. Every request is logged so tests can count them.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `url`.
    pub fn respond(&self, url: &str, response: RawResponse) -> &Self {
        self.push(url, Ok(response))
    }

    /// Queue a transport failure for `url`.
    pub fn fail(&self, url: &str, error: TransportError) -> &Self {
        self.push(url, Err(error))
    }

    fn push(&self, url: &str, scripted: Scripted) -> &Self {
        self.scripts
            .lock()
            .entry(url.to_string())
            .or_default()
            .push_back(scripted);
        self
    }

    /// Every URL requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.as_str() == url).count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, url: &Url) -> Result<RawResponse, TransportError> {
        let key = url.as_str().to_string();
        self.calls.lock().push(key.clone());

        let mut scripts = self.scripts.lock();
        match scripts.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue
                .pop_front()
                .unwrap_or_else(|| Ok(RawResponse::new(404, ""))),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| Ok(RawResponse::new(404, ""))),
            None => Ok(RawResponse::new(404, "")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(TransportError::Timeout("t".into()).is_transient());
        assert!(TransportError::Connect("c".into()).is_transient());
        assert!(TransportError::Body("b".into()).is_transient());
        assert!(!TransportError::Request("r".into()).is_transient());
    }

    #[tokio::test]
    async fn test_scripted_transport_replays_in_order_then_repeats() {
        let transport = ScriptedTransport::new();
        let url = "https://example.com/a";
        transport
            .respond(url, RawResponse::new(500, ""))
            .respond(url, RawResponse::ok("hello"));

        let parsed = Url::parse(url).unwrap();
        assert_eq!(transport.get(&parsed).await.unwrap().status, 500);
        assert_eq!(transport.get(&parsed).await.unwrap().body, "hello");
        assert_eq!(transport.get(&parsed).await.unwrap().body, "hello");
        assert_eq!(transport.calls_to(url), 3);
    }

    #[tokio::test]
    async fn test_scripted_transport_unknown_url_is_404() {
        let transport = ScriptedTransport::new();
        let parsed = Url::parse("https://example.com/missing").unwrap();
        assert_eq!(transport.get(&parsed).await.unwrap().status, 404);
        assert_eq!(transport.call_count(), 1);
        assert_eq!(transport.calls(), vec!["https://example.com/missing".to_string()]);
    }
}
