//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → auth.rs (bearer token → caller identity)
//!     → access_control.rs (caller roles vs. route policy)
//!     → rate_limit.rs (per-caller fixed window)
//!     → Pass to dispatch
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - No trust in client input
//! - Each stage returns a `Rejection` instead of writing a response itself

pub mod access_control;
pub mod auth;
pub mod rate_limit;
