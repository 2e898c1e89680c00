//! Point-of-sale API gateway library.
//!
//! Ingress routing, request admission (authentication, authorization, rate
//! limiting) and the resilience toolkit (circuit breaker, retry, bulkhead)
//! protecting every downstream call.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pipeline;
pub mod resilience;
pub mod routing;
pub mod security;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use pipeline::Pipeline;
