//! Response handling for the client side.
//!
//! # Responsibilities
//! - Turn a buffered downstream response into a client response
//! - Strip hop-by-hop headers
//! - Stamp the correlation ID on every response
//!
//! # Design Decisions
//! - Downstream status and body are passed through verbatim
//! - Content-Length is recomputed from the buffered body

use axum::body::Body;
use axum::http::{header, HeaderValue, Response};

use crate::http::client::ForwardResponse;
use crate::http::request::{strip_hop_by_hop, X_CORRELATION_ID};

/// Client response for a downstream reply.
pub fn from_downstream(forwarded: ForwardResponse) -> Response<Body> {
    let mut headers = forwarded.headers;
    strip_hop_by_hop(&mut headers);
    headers.remove(header::CONTENT_LENGTH);

    let mut response = Response::new(Body::from(forwarded.body));
    *response.status_mut() = forwarded.status;
    *response.headers_mut() = headers;
    response
}

/// Set `X-Correlation-ID` on a response, replacing any downstream value.
pub fn stamp_correlation_id(response: &mut Response<Body>, correlation_id: &str) {
    if let Ok(value) = HeaderValue::from_str(correlation_id) {
        response.headers_mut().insert(X_CORRELATION_ID, value);
    }
}
