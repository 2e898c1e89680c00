//! Terminal outcomes of the request pipeline.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::time::Duration;

use crate::resilience::error::InvokeError;

/// Every way a request can be answered without a downstream response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("no route for {path}")]
    RouteNotFound { path: String },

    #[error("authentication required")]
    AuthenticationRequired,

    #[error("invalid credentials")]
    AuthenticationInvalid,

    /// The token validator could not be reached on a route that needs it.
    #[error("authentication service unavailable")]
    AuthenticationUnavailable,

    #[error("caller roles do not permit this route")]
    Forbidden,

    #[error("rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("circuit open for {service}")]
    CircuitOpen { service: String },

    #[error("bulkhead full for {service}")]
    BulkheadFull { service: String },

    #[error("{service} failed: {reason}")]
    DownstreamFailure { service: String, reason: String },

    #[error("internal error")]
    Internal,
}

impl Rejection {
    pub fn status(&self) -> StatusCode {
        match self {
            Rejection::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            Rejection::AuthenticationRequired | Rejection::AuthenticationInvalid => {
                StatusCode::UNAUTHORIZED
            }
            Rejection::Forbidden => StatusCode::FORBIDDEN,
            Rejection::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Rejection::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Rejection::AuthenticationUnavailable
            | Rejection::CircuitOpen { .. }
            | Rejection::BulkheadFull { .. }
            | Rejection::DownstreamFailure { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Rejection::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message; internal detail stays in the logs.
    pub fn message(&self) -> &'static str {
        match self {
            Rejection::RouteNotFound { .. } => "Not Found",
            Rejection::AuthenticationRequired | Rejection::AuthenticationInvalid => "Unauthorized",
            Rejection::Forbidden => "Forbidden",
            Rejection::RateLimited { .. } => "Too many requests",
            Rejection::PayloadTooLarge { .. } => "Payload Too Large",
            Rejection::AuthenticationUnavailable
            | Rejection::CircuitOpen { .. }
            | Rejection::BulkheadFull { .. }
            | Rejection::DownstreamFailure { .. } => "Service Unavailable",
            Rejection::Internal => "Internal Server Error",
        }
    }
}

/// `Retry-After` value: whole seconds, rounded up, at least 1.
pub fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    secs.max(1)
}

impl From<InvokeError> for Rejection {
    fn from(err: InvokeError) -> Self {
        match err {
            InvokeError::CircuitOpen { service } => Rejection::CircuitOpen { service },
            InvokeError::BulkheadFull { service, .. } => Rejection::BulkheadFull { service },
            InvokeError::Downstream { service, source } => Rejection::DownstreamFailure {
                service,
                reason: source.to_string(),
            },
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message() }));
        let mut response = (self.status(), body).into_response();

        if let Rejection::RateLimited { retry_after } = self {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(retry_after_secs(retry_after)),
            );
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::error::DownstreamError;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_rate_limited_response() {
        let response = Rejection::RateLimited {
            retry_after: Duration::from_millis(41_200),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "42");
        assert_eq!(body_json(response).await, serde_json::json!({ "error": "Too many requests" }));
    }

    #[test]
    fn test_retry_after_rounding() {
        assert_eq!(retry_after_secs(Duration::ZERO), 1);
        assert_eq!(retry_after_secs(Duration::from_millis(1)), 1);
        assert_eq!(retry_after_secs(Duration::from_secs(60)), 60);
    }

    #[tokio::test]
    async fn test_protective_and_downstream_failures_are_unavailable() {
        let open: Rejection = InvokeError::CircuitOpen { service: "orders".into() }.into();
        let full: Rejection = InvokeError::BulkheadFull {
            service: "orders".into(),
            max_concurrent_calls: 10,
        }
        .into();
        let failed: Rejection = InvokeError::Downstream {
            service: "orders".into(),
            source: DownstreamError::Connect("refused".into()),
        }
        .into();

        for rejection in [open, full, failed] {
            let response = rejection.into_response();
            assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
            assert_eq!(body_json(response).await["error"], "Service Unavailable");
        }
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(Rejection::AuthenticationRequired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(Rejection::AuthenticationInvalid.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(Rejection::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            Rejection::RouteNotFound { path: "/x".into() }.status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(Rejection::Internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
