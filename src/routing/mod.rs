//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → router.rs (route lookup, service key extraction)
//!     → matcher.rs (evaluate prefix conditions)
//!     → registry.rs (service key → endpoint)
//!     → Return: ResolvedRoute or NotFound
//!
//! Route Compilation (at startup):
//!     RouteConfig[] + ServiceConfig[]
//!     → Sort by prefix length
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod registry;
pub mod router;

pub use registry::{ServiceEndpoint, ServiceRegistry};
pub use router::{ResolvedRoute, RouteEntry, RouteError, RouteTable, Router};
