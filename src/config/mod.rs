//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is loaded once at startup; there is no reload path
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, AuthConfig, BulkheadConfig, CircuitBreakerConfig, GatewayConfig, ListenerConfig,
    ObservabilityConfig, RateLimitConfig, RetryConfig, RouteConfig, SecurityConfig, ServiceConfig,
};
pub use validation::{validate_config, ValidationError};
