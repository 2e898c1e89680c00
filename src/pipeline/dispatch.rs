//! Dispatch stage: forward the request through the service's resilience stack.
//!
//! # Design Decisions
//! - Transient statuses (5xx, 408, 429) are failures for retry and breaker bookkeeping
//! - Every other status, 4xx included, is a successful call and passes through verbatim
//! - A resolver miss is a 404, never a breaker event

use axum::body::Bytes;
use axum::http::HeaderMap;
use std::sync::Arc;

use crate::http::client::{ForwardRequest, ForwardResponse, Transport};
use crate::http::request::forward_headers;
use crate::pipeline::context::RequestContext;
use crate::pipeline::rejection::Rejection;
use crate::resilience::error::{is_retryable_status, DownstreamError};
use crate::resilience::invoker::InvokerRegistry;
use crate::routing::Router;

/// Resolves the target service and issues the downstream call.
pub struct Dispatcher {
    router: Arc<Router>,
    invokers: Arc<InvokerRegistry>,
    transport: Arc<dyn Transport>,
}

impl Dispatcher {
    pub fn new(router: Arc<Router>, invokers: Arc<InvokerRegistry>, transport: Arc<dyn Transport>) -> Self {
        Self {
            router,
            invokers,
            transport,
        }
    }

    pub async fn dispatch(
        &self,
        ctx: &RequestContext,
        query: Option<&str>,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<ForwardResponse, Rejection> {
        let not_found = || Rejection::RouteNotFound {
            path: ctx.path.clone(),
        };

        let resolved = self.router.resolve(&ctx.path).map_err(|e| {
            tracing::debug!(correlation_id = %ctx.correlation_id, error = %e, "Route resolution failed");
            not_found()
        })?;
        let invoker = self.invokers.get(&resolved.endpoint.key).ok_or_else(not_found)?;

        let path_and_query = match query {
            Some(q) => format!("{}?{}", resolved.forward_path, q),
            None => resolved.forward_path.clone(),
        };
        let request = ForwardRequest {
            method: ctx.method.clone(),
            url: resolved.endpoint.url_for(&path_and_query),
            headers: forward_headers(headers, &ctx.correlation_id, ctx.remote_addr.ip()),
            body,
        };
        let timeout = resolved.endpoint.timeout;
        let transport = &self.transport;
        let request = &request;

        let result = invoker
            .invoke(|| async move {
                let response = transport.send(request.clone(), timeout).await?;
                if is_retryable_status(response.status) {
                    return Err(DownstreamError::Status(response.status));
                }
                Ok(response)
            })
            .await;

        result.map_err(|e| {
            tracing::warn!(
                correlation_id = %ctx.correlation_id,
                service = %resolved.endpoint.key,
                protective = e.is_protective(),
                error = %e,
                "Downstream call failed"
            );
            Rejection::from(e)
        })
    }
}
