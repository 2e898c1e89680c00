//! Outbound HTTP to downstream services.
//!
//! # Responsibilities
//! - Send one buffered request to a downstream service
//! - Bound each attempt by the endpoint's timeout
//! - Classify transport failures for the retry policy
//!
//! # Design Decisions
//! - Bodies are fully buffered so an attempt can be replayed on retry
//! - `Transport` is a trait so the pipeline can run against in-process fakes
//! - Status codes are returned as-is; the caller decides what counts as failure

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use futures_util::future::BoxFuture;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use std::time::Duration;

use crate::resilience::error::DownstreamError;

/// A fully buffered request ready to be sent downstream.
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// A fully buffered downstream response.
#[derive(Debug, Clone)]
pub struct ForwardResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ForwardResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }
}

/// Failure to obtain a response from a downstream service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("no response within {0:?}")]
    Timeout(Duration),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("failed to read response body: {0}")]
    Body(String),
    #[error("response body exceeds {limit} bytes")]
    ResponseTooLarge { limit: usize },
}

impl From<TransportError> for DownstreamError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout(d) => DownstreamError::Timeout(d),
            TransportError::Connect(msg) | TransportError::Body(msg) => DownstreamError::Connect(msg),
            TransportError::InvalidRequest(msg) => DownstreamError::Other(msg),
            err @ TransportError::ResponseTooLarge { .. } => DownstreamError::Other(err.to_string()),
        }
    }
}

/// Sends buffered requests to downstream services.
pub trait Transport: Send + Sync + 'static {
    fn send(
        &self,
        request: ForwardRequest,
        timeout: Duration,
    ) -> BoxFuture<'_, Result<ForwardResponse, TransportError>>;
}

/// [`Transport`] backed by the hyper-util pooled client.
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, Body>,
    max_response_size: usize,
}

impl HyperTransport {
    /// Responses larger than `max_response_size` bytes fail without retry.
    pub fn new(max_response_size: usize) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            max_response_size,
        }
    }

    async fn send_once(&self, request: ForwardRequest) -> Result<ForwardResponse, TransportError> {
        let uri: hyper::Uri = request
            .url
            .parse()
            .map_err(|e: axum::http::uri::InvalidUri| TransportError::InvalidRequest(e.to_string()))?;
        let mut builder = Request::builder().method(request.method).uri(uri);
        if let Some(headers) = builder.headers_mut() {
            *headers = request.headers;
        }
        let req = builder
            .body(Body::from(request.body))
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        let response = self.client.request(req).await.map_err(|e| {
            if e.is_connect() {
                TransportError::Connect(e.to_string())
            } else {
                TransportError::Connect(format!("request failed: {}", e))
            }
        })?;

        let (parts, body) = response.into_parts();
        let body = Limited::new(body, self.max_response_size)
            .collect()
            .await
            .map_err(|e| {
                if e.downcast_ref::<LengthLimitError>().is_some() {
                    TransportError::ResponseTooLarge {
                        limit: self.max_response_size,
                    }
                } else {
                    TransportError::Body(e.to_string())
                }
            })?
            .to_bytes();

        Ok(ForwardResponse {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }
}

impl Transport for HyperTransport {
    fn send(
        &self,
        request: ForwardRequest,
        timeout: Duration,
    ) -> BoxFuture<'_, Result<ForwardResponse, TransportError>> {
        Box::pin(async move {
            tracing::debug!(method = %request.method, url = %request.url, "Forwarding request");
            match tokio::time::timeout(timeout, self.send_once(request)).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout(timeout)),
            }
        })
    }
}
