//! Request preparation for forwarding.
//!
//! # Responsibilities
//! - Reuse or generate the correlation ID
//! - Copy forwardable headers, dropping hop-by-hop ones
//! - Record the caller address in `X-Forwarded-For`
//!
//! # Design Decisions
//! - Correlation ID is taken as early as possible for tracing
//! - `Authorization` and `X-Correlation-ID` always travel downstream
//! - Original request headers are left untouched; a filtered copy is forwarded

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use std::net::IpAddr;
use uuid::Uuid;

/// Header carrying the correlation ID in both directions.
pub const X_CORRELATION_ID: &str = "x-correlation-id";

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Connection-scoped headers that must not be forwarded.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Generate a fresh correlation ID (UUID v4).
pub fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Inbound correlation ID if present and usable, else a new one.
pub fn correlation_id(headers: &HeaderMap) -> String {
    headers
        .get(X_CORRELATION_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(new_correlation_id)
}

pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

/// Remove hop-by-hop headers, including any named by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in named {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
}

/// Build the header set forwarded to a downstream service.
pub fn forward_headers(inbound: &HeaderMap, correlation_id: &str, client_ip: IpAddr) -> HeaderMap {
    let mut headers = inbound.clone();
    strip_hop_by_hop(&mut headers);
    headers.remove(header::HOST);
    headers.remove(header::CONTENT_LENGTH);

    if let Ok(value) = HeaderValue::from_str(correlation_id) {
        headers.insert(X_CORRELATION_ID, value);
    }

    let forwarded_for = match inbound.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(existing) => format!("{}, {}", existing, client_ip),
        None => client_ip.to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&forwarded_for) {
        headers.insert(X_FORWARDED_FOR, value);
    }

    headers
}
