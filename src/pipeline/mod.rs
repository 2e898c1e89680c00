//! Request pipeline.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → correlation (reuse or generate X-Correlation-ID)
//!     → logging (entry event; exit event wraps everything below)
//!     → authentication (security/auth.rs)
//!     → authorization (security/access_control.rs)
//!     → rate limiting (security/rate_limit.rs)
//!     → dispatch.rs (route resolution + ResilientInvoker)
//!     → response, X-Correlation-ID stamped on every path
//! ```
//!
//! # Design Decisions
//! - Stages return `Result<_, Rejection>`; `?` is the short-circuit
//! - Panics are caught at the pipeline boundary and become a 500
//! - All shared state (limiter, breakers, bulkheads) is built once and owned here

pub mod context;
pub mod dispatch;
pub mod rejection;

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use futures_util::FutureExt;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use crate::config::{ConfigError, GatewayConfig, ValidationError};
use crate::http::client::{HyperTransport, Transport};
use crate::http::{request, response};
use crate::observability::metrics;
use crate::resilience::invoker::InvokerRegistry;
use crate::routing::Router;
use crate::security::access_control::authorize;
use crate::security::auth::{authenticate, HttpTokenValidator, TokenValidator};
use crate::security::rate_limit::AdmissionControl;

pub use context::{CallerIdentity, RequestContext};
pub use dispatch::Dispatcher;
pub use rejection::Rejection;

/// The ordered stage chain, shared by every request.
pub struct Pipeline {
    router: Arc<Router>,
    invokers: Arc<InvokerRegistry>,
    validator: Arc<dyn TokenValidator>,
    admission: AdmissionControl,
    dispatcher: Dispatcher,
    max_body_size: usize,
}

impl Pipeline {
    /// Build the pipeline with the HTTP transport and the auth service validator.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, ConfigError> {
        let router = Arc::new(Router::from_config(config));
        let invokers = Arc::new(InvokerRegistry::from_config(config));

        let auth_key = &config.auth.service;
        let (Some(endpoint), Some(invoker)) = (router.registry().get(auth_key), invokers.get(auth_key))
        else {
            return Err(ConfigError::Validation(vec![ValidationError::UnknownAuthService(
                auth_key.clone(),
            )]));
        };
        let validator = Arc::new(HttpTokenValidator::new(&endpoint, &config.auth.validate_path, invoker));
        let transport = Arc::new(HyperTransport::new(config.security.max_response_body_size));

        Ok(Self::assemble(config, router, invokers, transport, validator))
    }

    /// Build the pipeline around caller-supplied collaborators.
    pub fn with_collaborators(
        config: &GatewayConfig,
        transport: Arc<dyn Transport>,
        validator: Arc<dyn TokenValidator>,
    ) -> Self {
        let router = Arc::new(Router::from_config(config));
        let invokers = Arc::new(InvokerRegistry::from_config(config));
        Self::assemble(config, router, invokers, transport, validator)
    }

    fn assemble(
        config: &GatewayConfig,
        router: Arc<Router>,
        invokers: Arc<InvokerRegistry>,
        transport: Arc<dyn Transport>,
        validator: Arc<dyn TokenValidator>,
    ) -> Self {
        Self {
            dispatcher: Dispatcher::new(router.clone(), invokers.clone(), transport),
            router,
            invokers,
            validator,
            admission: AdmissionControl::from_config(&config.rate_limit),
            max_body_size: config.security.max_body_size,
        }
    }

    pub fn invokers(&self) -> &InvokerRegistry {
        &self.invokers
    }

    pub fn admission(&self) -> &AdmissionControl {
        &self.admission
    }

    /// Run one request through every stage. Never fails; every outcome is a response.
    pub async fn handle(&self, request: Request<Body>, remote_addr: SocketAddr) -> Response {
        let start = Instant::now();

        // Correlation
        let correlation_id = request::correlation_id(request.headers());
        let mut ctx = RequestContext::new(
            correlation_id,
            request.method().clone(),
            request.uri().path().to_string(),
            remote_addr,
        );
        let service = self.service_label(&ctx.path);

        // Logging (entry)
        tracing::info!(
            correlation_id = %ctx.correlation_id,
            method = %ctx.method,
            path = %ctx.path,
            "Request received"
        );

        let outcome = AssertUnwindSafe(self.run_stages(&mut ctx, request))
            .catch_unwind()
            .await;

        let mut response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(rejection)) => {
                tracing::debug!(correlation_id = %ctx.correlation_id, rejection = %rejection, "Request rejected");
                rejection.into_response()
            }
            Err(_) => {
                tracing::error!(correlation_id = %ctx.correlation_id, "Pipeline panicked");
                Rejection::Internal.into_response()
            }
        };
        response::stamp_correlation_id(&mut response, &ctx.correlation_id);

        // Logging (exit)
        let status = response.status();
        tracing::info!(
            correlation_id = %ctx.correlation_id,
            status = status.as_u16(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Request completed"
        );
        metrics::record_request(ctx.method.as_str(), status.as_u16(), &service, start);

        response
    }

    async fn run_stages(&self, ctx: &mut RequestContext, request: Request<Body>) -> Result<Response, Rejection> {
        let (parts, body) = request.into_parts();
        ctx.route = self.router.match_route(&ctx.path);

        // Authentication
        ctx.caller = authenticate(self.validator.as_ref(), ctx.route.as_deref(), &parts.headers).await?;

        // Authorization
        authorize(ctx.route.as_deref(), ctx.caller.as_ref())?;

        // Rate limiting
        self.admission
            .admit(&ctx.admission_key())
            .map_err(|retry_after| Rejection::RateLimited { retry_after })?;

        // Dispatch
        let body = axum::body::to_bytes(body, self.max_body_size)
            .await
            .map_err(|_| Rejection::PayloadTooLarge {
                limit: self.max_body_size,
            })?;
        let forwarded = self
            .dispatcher
            .dispatch(ctx, parts.uri.query(), &parts.headers, body)
            .await?;

        Ok(response::from_downstream(forwarded))
    }

    /// Registered service key for metrics, `none` otherwise.
    fn service_label(&self, path: &str) -> String {
        self.router
            .split_path(path)
            .and_then(|(key, _)| self.router.registry().get(key))
            .map(|endpoint| endpoint.key.clone())
            .unwrap_or_else(|| "none".to_string())
    }
}
