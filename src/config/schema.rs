//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Fixed API-version prefix; the next path segment is the service key.
    pub api_prefix: String,

    /// Downstream service definitions.
    pub services: Vec<ServiceConfig>,

    /// Route definitions carrying the access policy per path prefix.
    pub routes: Vec<RouteConfig>,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Circuit breaker settings, applied per downstream service.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Bulkhead settings, applied per downstream service.
    pub bulkhead: BulkheadConfig,

    /// Token validation collaborator.
    pub auth: AuthConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub admin: AdminConfig,

    pub security: SecurityConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            api_prefix: "/api/v1".to_string(),
            services: default_services(),
            routes: default_routes(),
            rate_limit: RateLimitConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            retries: RetryConfig::default(),
            bulkhead: BulkheadConfig::default(),
            auth: AuthConfig::default(),
            observability: ObservabilityConfig::default(),
            admin: AdminConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// A downstream service reachable through the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Path segment identifying the service (e.g. "orders").
    pub key: String,

    /// Human readable name for logs.
    pub name: String,

    /// Base URL requests are forwarded to.
    pub base_url: String,

    /// Per-attempt timeout in milliseconds.
    #[serde(default = "default_service_timeout_ms")]
    pub timeout_ms: u64,
}

impl ServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_service_timeout_ms() -> u64 {
    10_000
}

/// Route configuration mapping a path prefix to a service and access policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Path prefix to match. A trailing `*` is trimmed.
    pub path_prefix: String,

    /// Key of the service handling this route.
    pub service: String,

    /// Whether a valid bearer token is required.
    #[serde(default = "default_requires_authentication")]
    pub requires_authentication: bool,

    /// Roles allowed on this route. Empty means any authenticated caller.
    #[serde(default)]
    pub allowed_roles: Vec<String>,
}

fn default_requires_authentication() -> bool {
    true
}

/// Fixed-window rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Requests admitted per key per window.
    pub capacity: u32,

    /// Window length in seconds.
    pub window_secs: u64,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 100,
            window_secs: 60,
        }
    }
}

/// Circuit breaker thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,

    /// Consecutive half-open successes that close the circuit.
    pub success_threshold: u32,

    /// Time the circuit stays open before admitting a trial call.
    pub cooldown_secs: u64,
}

impl CircuitBreakerConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            cooldown_secs: 30,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Additional attempts after the first one.
    pub max_retries: u32,

    /// Delay before the first retry in milliseconds.
    pub initial_delay_ms: u64,

    /// Upper bound for any single delay in milliseconds.
    pub max_delay_ms: u64,

    /// Geometric growth factor applied after every attempt.
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 8000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Concurrency cap per downstream service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BulkheadConfig {
    pub max_concurrent_calls: usize,
}

impl Default for BulkheadConfig {
    fn default() -> Self {
        Self {
            max_concurrent_calls: 10,
        }
    }
}

/// Token validation collaborator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Key of the registered service that validates tokens.
    pub service: String,

    /// Path on that service accepting `{"token": ...}`.
    pub validate_path: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            service: "auth".to_string(),
            validate_path: "/api/v1/auth/validate-token".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum inbound request body size in bytes.
    pub max_body_size: usize,

    /// Maximum downstream response body size in bytes.
    pub max_response_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
            max_response_body_size: 16 * 1024 * 1024, // 16MB
        }
    }
}

fn service(key: &str, name: &str, port: u16, timeout_ms: u64) -> ServiceConfig {
    ServiceConfig {
        key: key.to_string(),
        name: name.to_string(),
        base_url: format!("http://localhost:{}", port),
        timeout_ms,
    }
}

fn default_services() -> Vec<ServiceConfig> {
    vec![
        service("auth", "Auth Service", 5001, 10_000),
        service("menu", "Menu Service", 5002, 10_000),
        service("inventory", "Inventory Service", 5003, 10_000),
        service("orders", "Order Service", 5004, 10_000),
        service("payments", "Payment Service", 5005, 30_000),
        service("kds", "Kitchen Display Service", 5006, 10_000),
        service("loyalty", "Loyalty Service", 5007, 10_000),
        service("notifications", "Notification Service", 5008, 10_000),
    ]
}

fn open_route(prefix: &str, service: &str) -> RouteConfig {
    RouteConfig {
        path_prefix: prefix.to_string(),
        service: service.to_string(),
        requires_authentication: false,
        allowed_roles: Vec::new(),
    }
}

fn role_route(prefix: &str, service: &str, roles: &[&str]) -> RouteConfig {
    RouteConfig {
        path_prefix: prefix.to_string(),
        service: service.to_string(),
        requires_authentication: true,
        allowed_roles: roles.iter().map(|r| r.to_string()).collect(),
    }
}

fn default_routes() -> Vec<RouteConfig> {
    vec![
        // Auth endpoints (no auth required)
        open_route("/api/v1/auth/login", "auth"),
        open_route("/api/v1/auth/register", "auth"),
        open_route("/api/v1/auth/validate-token", "auth"),
        open_route("/api/v1/auth/refresh-token", "auth"),
        role_route("/api/v1/auth/*", "auth", &[]),
        role_route("/api/v1/menu/*", "menu", &["customer", "staff", "admin"]),
        role_route("/api/v1/orders/*", "orders", &["customer", "staff", "admin"]),
        role_route("/api/v1/inventory/*", "inventory", &["staff", "admin"]),
        role_route("/api/v1/payments/*", "payments", &["customer", "staff", "admin"]),
        role_route("/api/v1/kds/*", "kds", &["staff", "admin"]),
        role_route("/api/v1/loyalty/*", "loyalty", &["customer", "admin"]),
        role_route("/api/v1/notifications/*", "notifications", &["admin"]),
    ]
}
