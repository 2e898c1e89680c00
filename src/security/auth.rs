//! Bearer-token authentication.
//!
//! # Responsibilities
//! - Extract the bearer token from `Authorization`
//! - Validate it against the token-validation service
//! - Decide the authentication outcome for the governing route
//!
//! # Design Decisions
//! - The validation call runs through the auth service's own resilience stack
//! - A token on an open route is validated opportunistically; failure is not an error
//! - An unreachable validator on a protected route fails closed (503, not 401)

use axum::http::{header, HeaderMap};
use futures_util::future::BoxFuture;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::pipeline::context::CallerIdentity;
use crate::pipeline::rejection::Rejection;
use crate::resilience::error::{is_retryable_status, DownstreamError, InvokeError};
use crate::resilience::invoker::ResilientInvoker;
use crate::routing::{RouteEntry, ServiceEndpoint};

const BEARER_PREFIX: &str = "Bearer ";

/// Claims returned by the token validator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenValidation {
    pub valid: bool,
    pub user_id: Option<String>,
    pub roles: Vec<String>,
}

impl TokenValidation {
    pub fn invalid() -> Self {
        Self::default()
    }

    /// Caller identity for a valid token.
    pub fn into_identity(self) -> Option<CallerIdentity> {
        if !self.valid {
            return None;
        }
        Some(CallerIdentity {
            user_id: self.user_id.unwrap_or_default(),
            roles: self.roles,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenValidationError {
    #[error("token validation unavailable: {0}")]
    Unavailable(#[from] InvokeError),
}

/// External "validate token → claims" capability.
pub trait TokenValidator: Send + Sync + 'static {
    fn validate<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<TokenValidation, TokenValidationError>>;
}

/// `{ success, message, data: { isValid, userId, roles, message } }`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidationEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<ValidationData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidationData {
    #[serde(default)]
    is_valid: bool,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
}

impl From<ValidationEnvelope> for TokenValidation {
    fn from(envelope: ValidationEnvelope) -> Self {
        match envelope.data {
            Some(data) if envelope.success && data.is_valid => TokenValidation {
                valid: true,
                user_id: data.user_id,
                roles: data.roles,
            },
            _ => TokenValidation::invalid(),
        }
    }
}

/// Validator calling the auth service over HTTP.
pub struct HttpTokenValidator {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
    invoker: Arc<ResilientInvoker>,
}

impl HttpTokenValidator {
    pub fn new(endpoint: &ServiceEndpoint, validate_path: &str, invoker: Arc<ResilientInvoker>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: endpoint.url_for(validate_path),
            timeout: endpoint.timeout,
            invoker,
        }
    }

    async fn attempt(&self, token: &str) -> Result<TokenValidation, DownstreamError> {
        let response = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&serde_json::json!({ "token": token }))
            .send()
            .await
            .map_err(|e| classify_reqwest(e, self.timeout))?;

        let status = response.status();
        if is_retryable_status(status) {
            return Err(DownstreamError::Status(status));
        }
        if !status.is_success() {
            tracing::debug!(status = %status, "Token rejected by validator");
            return Ok(TokenValidation::invalid());
        }

        let envelope: ValidationEnvelope = response
            .json()
            .await
            .map_err(|e| DownstreamError::Other(format!("malformed validation response: {}", e)))?;
        Ok(envelope.into())
    }
}

impl TokenValidator for HttpTokenValidator {
    fn validate<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<TokenValidation, TokenValidationError>> {
        Box::pin(async move {
            let validation = self.invoker.invoke(|| self.attempt(token)).await?;
            Ok(validation)
        })
    }
}

fn classify_reqwest(err: reqwest::Error, timeout: Duration) -> DownstreamError {
    if err.is_timeout() {
        DownstreamError::Timeout(timeout)
    } else if err.is_builder() {
        DownstreamError::Other(err.to_string())
    } else {
        DownstreamError::Connect(err.to_string())
    }
}

/// Bearer token from `Authorization`, if present and non-empty.
pub fn parse_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix(BEARER_PREFIX)?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Authentication stage.
///
/// Returns the caller identity to attach, `None` for an anonymous caller,
/// or the rejection ending the request.
pub async fn authenticate(
    validator: &dyn TokenValidator,
    route: Option<&RouteEntry>,
    headers: &HeaderMap,
) -> Result<Option<CallerIdentity>, Rejection> {
    let required = route.is_some_and(|r| r.requires_authentication());

    let Some(token) = parse_bearer(headers) else {
        if required {
            return Err(Rejection::AuthenticationRequired);
        }
        return Ok(None);
    };

    match validator.validate(token).await {
        Ok(validation) => match validation.into_identity() {
            Some(identity) => Ok(Some(identity)),
            None if required => Err(Rejection::AuthenticationInvalid),
            None => Ok(None),
        },
        Err(e) if required => {
            tracing::warn!(error = %e, "Token validation failed on protected route");
            Err(Rejection::AuthenticationUnavailable)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring token validation failure on open route");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    struct StaticValidator(Result<TokenValidation, TokenValidationError>);

    impl TokenValidator for StaticValidator {
        fn validate<'a>(&'a self, _token: &'a str) -> BoxFuture<'a, Result<TokenValidation, TokenValidationError>> {
            let result = self.0.clone();
            Box::pin(async move { result })
        }
    }

    fn bearer(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    fn valid(roles: &[&str]) -> StaticValidator {
        StaticValidator(Ok(TokenValidation {
            valid: true,
            user_id: Some("u-1".into()),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }))
    }

    fn unavailable() -> StaticValidator {
        StaticValidator(Err(TokenValidationError::Unavailable(InvokeError::CircuitOpen {
            service: "auth".into(),
        })))
    }

    fn protected() -> RouteEntry {
        RouteEntry::new("/api/v1/orders/*", "orders", true, vec!["customer"])
    }

    fn open() -> RouteEntry {
        RouteEntry::new("/api/v1/auth/login", "auth", false, Vec::<String>::new())
    }

    #[test]
    fn test_parse_bearer() {
        assert_eq!(parse_bearer(&bearer("Bearer abc.def")), Some("abc.def"));
        assert_eq!(parse_bearer(&bearer("Bearer   padded  ")), Some("padded"));
        assert_eq!(parse_bearer(&bearer("Bearer ")), None);
        assert_eq!(parse_bearer(&bearer("Basic dXNlcjpwYXNz")), None);
        assert_eq!(parse_bearer(&bearer("bearer abc")), None);
        assert_eq!(parse_bearer(&HeaderMap::new()), None);
    }

    #[test]
    fn test_envelope_decoding() {
        let envelope: ValidationEnvelope = serde_json::from_str(
            r#"{"success":true,"message":"ok","data":{"isValid":true,"userId":"42","roles":["staff"],"message":null}}"#,
        )
        .unwrap();
        let validation = TokenValidation::from(envelope);
        assert!(validation.valid);
        assert_eq!(validation.user_id.as_deref(), Some("42"));
        assert_eq!(validation.roles, vec!["staff".to_string()]);

        let rejected: ValidationEnvelope = serde_json::from_str(
            r#"{"success":false,"message":"expired","data":{"isValid":false,"userId":null,"roles":[]}}"#,
        )
        .unwrap();
        assert!(!TokenValidation::from(rejected).valid);
    }

    #[tokio::test]
    async fn test_missing_token_on_protected_route() {
        let result = authenticate(&valid(&[]), Some(&protected()), &HeaderMap::new()).await;
        assert_eq!(result, Err(Rejection::AuthenticationRequired));
    }

    #[tokio::test]
    async fn test_invalid_token_on_protected_route() {
        let validator = StaticValidator(Ok(TokenValidation::invalid()));
        let result = authenticate(&validator, Some(&protected()), &bearer("Bearer nope")).await;
        assert_eq!(result, Err(Rejection::AuthenticationInvalid));
    }

    #[tokio::test]
    async fn test_valid_token_attaches_identity() {
        let result = authenticate(&valid(&["customer"]), Some(&protected()), &bearer("Bearer ok"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.user_id, "u-1");
        assert_eq!(result.roles, vec!["customer".to_string()]);
    }

    #[tokio::test]
    async fn test_open_route_is_opportunistic() {
        assert_eq!(authenticate(&valid(&[]), Some(&open()), &HeaderMap::new()).await, Ok(None));

        let invalid = StaticValidator(Ok(TokenValidation::invalid()));
        assert_eq!(authenticate(&invalid, Some(&open()), &bearer("Bearer x")).await, Ok(None));

        let attached = authenticate(&valid(&["admin"]), Some(&open()), &bearer("Bearer x")).await;
        assert!(matches!(attached, Ok(Some(_))));

        // Unmatched paths carry no policy
        assert_eq!(authenticate(&valid(&[]), None, &HeaderMap::new()).await, Ok(None));
    }

    #[tokio::test]
    async fn test_unavailable_validator() {
        let result = authenticate(&unavailable(), Some(&protected()), &bearer("Bearer x")).await;
        assert_eq!(result, Err(Rejection::AuthenticationUnavailable));

        let result = authenticate(&unavailable(), Some(&open()), &bearer("Bearer x")).await;
        assert_eq!(result, Ok(None));
    }

    #[test]
    fn test_default_validator_targets_auth_controller() {
        let config = crate::config::GatewayConfig::default();
        let router = crate::routing::Router::from_config(&config);
        let endpoint = router.registry().get("auth").unwrap();
        let invoker = Arc::new(ResilientInvoker::from_config("auth", &config));

        let validator = HttpTokenValidator::new(&endpoint, &config.auth.validate_path, invoker);

        assert_eq!(validator.url, "http://localhost:5001/api/v1/auth/validate-token");
    }
}
