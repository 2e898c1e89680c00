//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes reference existing services)
//! - Validate value ranges (timeouts > 0, thresholds > 0)
//! - Detect conflicting routes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use url::Url;

use crate::config::schema::GatewayConfig;
use crate::routing::matcher::normalize_prefix;

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("no services configured")]
    NoServices,
    #[error("duplicate service key `{0}`")]
    DuplicateService(String),
    #[error("service key `{0}` must be a lowercase path segment")]
    InvalidServiceKey(String),
    #[error("service `{key}` has invalid base_url `{url}`")]
    InvalidBaseUrl { key: String, url: String },
    #[error("route `{prefix}` references unknown service `{service}`")]
    UnknownService { prefix: String, service: String },
    #[error("duplicate route prefix `{0}`")]
    DuplicateRoute(String),
    #[error("route `{prefix}` is outside api_prefix `{api_prefix}`")]
    RouteOutsidePrefix { prefix: String, api_prefix: String },
    #[error("`{0}` must be greater than zero")]
    NotPositive(&'static str),
    #[error("retries.backoff_multiplier must be a finite value >= 1.0")]
    InvalidMultiplier,
    #[error("retries.initial_delay_ms must not exceed retries.max_delay_ms")]
    DelayBounds,
    #[error("auth.service `{0}` is not a registered service")]
    UnknownAuthService(String),
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.services.is_empty() {
        errors.push(ValidationError::NoServices);
    }

    let mut keys = HashSet::new();
    for service in &config.services {
        let valid_key = !service.key.is_empty()
            && !service.key.contains('/')
            && service.key == service.key.to_lowercase();
        if !valid_key {
            errors.push(ValidationError::InvalidServiceKey(service.key.clone()));
        }
        if !keys.insert(service.key.as_str()) {
            errors.push(ValidationError::DuplicateService(service.key.clone()));
        }
        let url_ok = Url::parse(&service.base_url)
            .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
            .unwrap_or(false);
        if !url_ok {
            errors.push(ValidationError::InvalidBaseUrl {
                key: service.key.clone(),
                url: service.base_url.clone(),
            });
        }
        if service.timeout_ms == 0 {
            errors.push(ValidationError::NotPositive("services.timeout_ms"));
        }
    }

    let mut prefixes = HashSet::new();
    for route in &config.routes {
        if !keys.contains(route.service.as_str()) {
            errors.push(ValidationError::UnknownService {
                prefix: route.path_prefix.clone(),
                service: route.service.clone(),
            });
        }
        let prefix = normalize_prefix(&route.path_prefix);
        if !prefixes.insert(prefix.to_string()) {
            errors.push(ValidationError::DuplicateRoute(route.path_prefix.clone()));
        }
        if !prefix.starts_with(config.api_prefix.trim_end_matches('/')) {
            errors.push(ValidationError::RouteOutsidePrefix {
                prefix: route.path_prefix.clone(),
                api_prefix: config.api_prefix.clone(),
            });
        }
    }

    if config.rate_limit.capacity == 0 {
        errors.push(ValidationError::NotPositive("rate_limit.capacity"));
    }
    if config.rate_limit.window_secs == 0 {
        errors.push(ValidationError::NotPositive("rate_limit.window_secs"));
    }
    if config.circuit_breaker.failure_threshold == 0 {
        errors.push(ValidationError::NotPositive("circuit_breaker.failure_threshold"));
    }
    if config.circuit_breaker.success_threshold == 0 {
        errors.push(ValidationError::NotPositive("circuit_breaker.success_threshold"));
    }
    if config.circuit_breaker.cooldown_secs == 0 {
        errors.push(ValidationError::NotPositive("circuit_breaker.cooldown_secs"));
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::NotPositive("security.max_body_size"));
    }
    if config.security.max_response_body_size == 0 {
        errors.push(ValidationError::NotPositive("security.max_response_body_size"));
    }
    if config.bulkhead.max_concurrent_calls == 0 {
        errors.push(ValidationError::NotPositive("bulkhead.max_concurrent_calls"));
    }
    let multiplier = config.retries.backoff_multiplier;
    if !multiplier.is_finite() || multiplier < 1.0 {
        errors.push(ValidationError::InvalidMultiplier);
    }
    if config.retries.initial_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError::DelayBounds);
    }
    if !keys.contains(config.auth.service.as_str()) {
        errors.push(ValidationError::UnknownAuthService(config.auth.service.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
