use std::time::Duration;

use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, StatusCode, header};
use url::Url;

use crate::dispatch::{StreamDispatcher, StreamHandler, StreamOutcome};
use crate::error::{Error, Result};
use crate::observability::{GATEWAY_REQUEST_ERRORS, GATEWAY_REQUESTS, STREAM_BYTES};
use crate::types::StreamRequest;

/// The OpenRouter chat-completions endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

const HTTP_REFERER: &str = "https://github.com/percent-cli";
const X_TITLE: &str = "percent-cli";
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Parses [`DEFAULT_ENDPOINT`].
pub fn default_endpoint() -> Url {
    Url::parse(DEFAULT_ENDPOINT).expect("default endpoint should be a valid URL")
}

/// Client for the chat-completions gateway.
///
/// Only the connection phase has a timeout; a completion may legitimately
/// stream for minutes.
#[derive(Debug, Clone)]
pub struct Gateway {
    client: ReqwestClient,
    connect_timeout: Duration,
}

impl Gateway {
    /// Create a new gateway client.
    pub fn new() -> Result<Self> {
        Self::with_connect_timeout(DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a new gateway client with a custom connection timeout.
    pub fn with_connect_timeout(connect_timeout: Duration) -> Result<Self> {
        let client = ReqwestClient::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;
        Ok(Self {
            client,
            connect_timeout,
        })
    }

    fn headers(request: &StreamRequest) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );
        let bearer = HeaderValue::from_str(&format!("Bearer {}", request.credential))
            .map_err(|_| Error::authentication("API key contains characters not allowed in a header"))?;
        headers.insert(header::AUTHORIZATION, bearer);
        headers.insert("http-referer", HeaderValue::from_static(HTTP_REFERER));
        headers.insert("x-title", HeaderValue::from_static(X_TITLE));
        Ok(headers)
    }

    /// Build a transport error from a non-success response.
    async fn transport_error(response: Response) -> Error {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("unknown status")
                .to_string()
        } else {
            body.trim().to_string()
        };
        Error::transport(status.as_u16(), message)
    }

    fn classify(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(format!(
                "Request timed out after {}s: {e}",
                self.connect_timeout.as_secs()
            ))
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
        }
    }

    /// Stream one chat completion, reporting progress to `handler`.
    ///
    /// Exactly one request is issued. Whatever happens, the handler sees
    /// `on_start` at most once, then tokens, then exactly one of `on_end` or
    /// `on_error`; failures are never returned as `Err`.
    pub async fn stream_chat<H: StreamHandler>(
        &self,
        request: &StreamRequest,
        handler: H,
    ) -> (H, StreamOutcome) {
        let mut dispatcher = StreamDispatcher::new(handler);
        if let Err(err) = self.pump(request, &mut dispatcher).await {
            GATEWAY_REQUEST_ERRORS.click();
            dispatcher.fail(err);
        }
        dispatcher.into_parts()
    }

    async fn pump<H: StreamHandler>(
        &self,
        request: &StreamRequest,
        dispatcher: &mut StreamDispatcher<H>,
    ) -> Result<()> {
        GATEWAY_REQUESTS.click();
        tracing::info!(
            endpoint = %request.endpoint,
            model = %request.model,
            messages = request.messages.len(),
            "sending chat request"
        );

        let response = self
            .client
            .post(request.endpoint.clone())
            .headers(Self::headers(request)?)
            .json(&request.body())
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::transport_error(response).await);
        }
        if matches!(status, StatusCode::NO_CONTENT | StatusCode::RESET_CONTENT)
            || response.content_length() == Some(0)
        {
            return Err(Error::transport(
                status.as_u16(),
                "response carried no body",
            ));
        }

        dispatcher.start();
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| {
                Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e)))
            })?;
            STREAM_BYTES.count(chunk.len() as u64);
            dispatcher.feed(&chunk);
        }
        dispatcher.finish();
        tracing::info!(state = ?dispatcher.state(), chars = dispatcher.text().len(), "stream finished");
        Ok(())
    }
}
