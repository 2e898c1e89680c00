//! Route lookup and dispatch target resolution.
//!
//! # Responsibilities
//! - Store compiled route entries
//! - Look up the access policy for a request path
//! - Resolve the downstream service and forwarded path
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) service lookup via HashMap
//! - O(n) path prefix scan (acceptable for typical route counts)
//! - Longest prefix wins; declaration order breaks ties
//! - Explicit NotFound rather than silent default

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::{GatewayConfig, RouteConfig};
use crate::routing::matcher::PathPrefixMatcher;
use crate::routing::registry::{ServiceEndpoint, ServiceRegistry};

/// Static rule mapping a path prefix to a service and its access policy.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    matcher: PathPrefixMatcher,
    service_key: String,
    requires_authentication: bool,
    allowed_roles: HashSet<String>,
}

impl RouteEntry {
    pub fn new(
        pattern: &str,
        service_key: &str,
        requires_authentication: bool,
        allowed_roles: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            matcher: PathPrefixMatcher::new(pattern),
            service_key: service_key.to_lowercase(),
            requires_authentication,
            allowed_roles: allowed_roles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &RouteConfig) -> Self {
        Self::new(
            &config.path_prefix,
            &config.service,
            config.requires_authentication,
            config.allowed_roles.iter().cloned(),
        )
    }

    pub fn path_prefix(&self) -> &str {
        self.matcher.prefix()
    }

    pub fn service_key(&self) -> &str {
        &self.service_key
    }

    pub fn requires_authentication(&self) -> bool {
        self.requires_authentication
    }

    pub fn allowed_roles(&self) -> &HashSet<String> {
        &self.allowed_roles
    }

    /// True when the route restricts access to specific roles.
    pub fn is_role_restricted(&self) -> bool {
        !self.allowed_roles.is_empty()
    }

    /// True if any of the caller's roles is allowed (or the route is unrestricted).
    pub fn permits<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        !self.is_role_restricted()
            || roles.iter().any(|r| self.allowed_roles.contains(r.as_ref()))
    }

    fn matches(&self, path: &str) -> bool {
        self.matcher.matches(path)
    }
}

/// Ordered set of route entries.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Arc<RouteEntry>>,
}

impl RouteTable {
    pub fn new(entries: Vec<RouteEntry>) -> Self {
        let mut routes: Vec<Arc<RouteEntry>> = entries.into_iter().map(Arc::new).collect();
        // Stable sort keeps declaration order among equal-length prefixes
        routes.sort_by(|a, b| b.path_prefix().len().cmp(&a.path_prefix().len()));
        Self { routes }
    }

    pub fn from_config(configs: &[RouteConfig]) -> Self {
        Self::new(configs.iter().map(RouteEntry::from_config).collect())
    }

    /// Find the governing route for a path.
    pub fn find(&self, path: &str) -> Option<Arc<RouteEntry>> {
        self.routes.iter().find(|r| r.matches(path)).cloned()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Error returned when a path cannot be routed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("no route matches path {0}")]
    NotFound(String),
}

/// Target of a successfully resolved request.
#[derive(Debug, Clone)]
pub struct ResolvedRoute {
    pub endpoint: Arc<ServiceEndpoint>,
    pub entry: Arc<RouteEntry>,
    /// Path forwarded to the service, with the service key segment stripped.
    pub forward_path: String,
}

/// Combined route table and service registry.
#[derive(Debug)]
pub struct Router {
    api_prefix: String,
    table: RouteTable,
    registry: ServiceRegistry,
}

impl Router {
    pub fn new(api_prefix: impl Into<String>, table: RouteTable, registry: ServiceRegistry) -> Self {
        let api_prefix = api_prefix.into().trim_end_matches('/').to_string();
        Self {
            api_prefix,
            table,
            registry,
        }
    }

    /// Build the router from the gateway configuration.
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(
            config.api_prefix.clone(),
            RouteTable::from_config(&config.routes),
            ServiceRegistry::from_config(&config.services),
        )
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Access policy governing a path, if any.
    pub fn match_route(&self, path: &str) -> Option<Arc<RouteEntry>> {
        self.table.find(path)
    }

    /// Split `/api/v1/<key>/<rest>` into the service key and `/<rest>`.
    pub fn split_path<'a>(&self, path: &'a str) -> Option<(&'a str, &'a str)> {
        let rest = path.strip_prefix(self.api_prefix.as_str())?;
        let rest = rest.strip_prefix('/')?.trim_start_matches('/');
        let (key, forward) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, "/"),
        };
        if key.is_empty() {
            return None;
        }
        Some((key, forward))
    }

    /// Resolve a request path to its downstream endpoint and route entry.
    pub fn resolve(&self, path: &str) -> Result<ResolvedRoute, RouteError> {
        let not_found = || RouteError::NotFound(path.to_string());

        let (key, forward_path) = self.split_path(path).ok_or_else(not_found)?;
        let endpoint = self.registry.get(key).ok_or_else(not_found)?;
        let entry = self.table.find(path).ok_or_else(not_found)?;

        // A route only governs the service it was declared for
        if entry.service_key() != endpoint.key {
            return Err(not_found());
        }

        Ok(ResolvedRoute {
            endpoint,
            entry,
            forward_path: forward_path.to_string(),
        })
    }
}
