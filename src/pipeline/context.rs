//! Per-request state carried through the pipeline stages.

use axum::http::Method;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::routing::RouteEntry;

/// Authenticated caller, populated by the authentication stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub user_id: String,
    pub roles: Vec<String>,
}

/// Scoped to one request; dropped once the response is sent.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub correlation_id: String,
    pub method: Method,
    pub path: String,
    pub remote_addr: SocketAddr,
    pub caller: Option<CallerIdentity>,
    /// Governing route entry, if any prefix matched.
    pub route: Option<Arc<RouteEntry>>,
}

impl RequestContext {
    pub fn new(correlation_id: String, method: Method, path: String, remote_addr: SocketAddr) -> Self {
        Self {
            correlation_id,
            method,
            path,
            remote_addr,
            caller: None,
            route: None,
        }
    }

    /// Rate-limit partition: user id when authenticated, else the caller IP.
    pub fn admission_key(&self) -> String {
        match &self.caller {
            Some(caller) => format!("user:{}", caller.user_id),
            None => format!("ip:{}", self.remote_addr.ip()),
        }
    }

    pub fn roles(&self) -> &[String] {
        self.caller.as_ref().map(|c| c.roles.as_slice()).unwrap_or(&[])
    }
}
