use std::future::Future;
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response};

use crate::config::ChatApiConfig;
use crate::error::{parse_error_message, ChatApiError};
use crate::headers::build_headers;
use crate::payload::ChatRequest;
use crate::sse::SseDecoder;
use crate::url::normalize_chat_url;

/// Per-turn cancellation flag shared between the caller and the stream loop.
pub type CancelSignal = Arc<AtomicBool>;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone)]
pub struct AgentChatClient {
    http: Client,
    config: ChatApiConfig,
}

impl AgentChatClient {
    pub fn new(config: ChatApiConfig) -> Result<Self, ChatApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ChatApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ChatApiConfig {
        &self.config
    }

    pub fn normalized_endpoint(&self) -> String {
        normalize_chat_url(&self.config.base_url)
    }

    pub fn build_headers(&self) -> Result<HeaderMap, ChatApiError> {
        let mut out = HeaderMap::new();
        for (key, value) in build_headers(&self.config) {
            out.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| ChatApiError::InvalidHeader(format!("invalid header key: {key}")))?,
                HeaderValue::from_str(&value).map_err(|_| {
                    ChatApiError::InvalidHeader(format!("invalid header value for {key}"))
                })?,
            );
        }
        Ok(out)
    }

    pub fn build_request(
        &self,
        request: &ChatRequest,
    ) -> Result<reqwest::RequestBuilder, ChatApiError> {
        validate_request(request)?;

        let headers = self.build_headers()?;
        Ok(self
            .http
            .post(self.normalized_endpoint())
            .headers(headers)
            .json(request))
    }

    /// Send exactly one request and return the response once its status is a success.
    pub async fn send(
        &self,
        request: &ChatRequest,
        cancellation: Option<&CancelSignal>,
    ) -> Result<Response, ChatApiError> {
        if is_cancelled(cancellation) {
            return Err(ChatApiError::Cancelled);
        }

        let pending = self.build_request(request)?.send();
        let response = await_or_cancel(pending, cancellation).await??;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = await_or_cancel(response.text(), cancellation)
            .await?
            .unwrap_or_default();
        let message = parse_error_message(status, &body);
        tracing::debug!(status = status.as_u16(), %message, "agent-chat request rejected");
        Err(ChatApiError::Status(status, message))
    }

    /// Stream the response body, handing each decoded record payload to `on_payload`
    /// in arrival order.
    pub async fn stream_with_handler<F>(
        &self,
        request: &ChatRequest,
        cancellation: Option<&CancelSignal>,
        mut on_payload: F,
    ) -> Result<(), ChatApiError>
    where
        F: FnMut(String),
    {
        let response = self.send(request, cancellation).await?;
        let mut bytes = response.bytes_stream();
        let mut decoder = SseDecoder::default();

        loop {
            let Some(chunk) = await_or_cancel(bytes.next(), cancellation).await? else {
                break;
            };
            let chunk = chunk.map_err(ChatApiError::from)?;
            for payload in decoder.feed(&chunk) {
                if is_cancelled(cancellation) {
                    return Err(ChatApiError::Cancelled);
                }
                on_payload(payload);
            }
        }

        if is_cancelled(cancellation) {
            return Err(ChatApiError::Cancelled);
        }
        if let Some(payload) = decoder.finish() {
            on_payload(payload);
        }

        Ok(())
    }

    /// Collect every payload of one streamed response.
    pub async fn stream(
        &self,
        request: &ChatRequest,
        cancellation: Option<&CancelSignal>,
    ) -> Result<Vec<String>, ChatApiError> {
        let mut payloads = Vec::new();
        self.stream_with_handler(request, cancellation, |payload| payloads.push(payload))
            .await?;
        Ok(payloads)
    }
}

fn validate_request(request: &ChatRequest) -> Result<(), ChatApiError> {
    if request.prompt.trim().is_empty() {
        return Err(ChatApiError::InvalidRequest(
            "'prompt' must not be empty".to_owned(),
        ));
    }
    if request.backend.trim().is_empty() {
        return Err(ChatApiError::InvalidRequest(
            "'backend' must not be empty".to_owned(),
        ));
    }
    Ok(())
}

pub fn is_cancelled(cancel: Option<&CancelSignal>) -> bool {
    cancel.is_some_and(|token| token.load(Ordering::Acquire))
}

async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancelSignal>,
) -> Result<F::Output, ChatApiError>
where
    F: Future,
{
    if cancellation.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancellation) {
            return Err(ChatApiError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancellation) {
                return Err(ChatApiError::Cancelled);
            }
            return Ok(output);
        }
    }
}
