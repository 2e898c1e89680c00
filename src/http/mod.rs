//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, /health, catch-all into the pipeline)
//!     → request.rs (correlation ID, forwardable headers)
//!     → client.rs (buffered downstream call)
//!     → response.rs (strip hop-by-hop, stamp correlation ID)
//!     → Send to client
//! ```

pub mod client;
pub mod request;
pub mod response;
pub mod server;

pub use client::{ForwardRequest, ForwardResponse, HyperTransport, Transport, TransportError};
pub use request::X_CORRELATION_ID;
pub use server::{build_router, AppState, HttpServer};
