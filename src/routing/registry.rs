//! Static service registry.
//!
//! # Responsibilities
//! - Map service keys to downstream endpoints
//! - Build forwarding URLs
//!
//! # Design Decisions
//! - Built once from config at startup, read-only afterwards
//! - Keys are matched case-insensitively (normalized to lowercase)

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::config::ServiceConfig;

/// Location and timeout of a downstream service.
#[derive(Debug, Clone)]
pub struct ServiceEndpoint {
    pub key: String,
    pub name: String,
    pub base_url: Url,
    /// Bound on each individual downstream attempt.
    pub timeout: Duration,
}

impl ServiceEndpoint {
    /// Build the absolute URL for a forwarded path (and optional query).
    pub fn url_for(&self, path_and_query: &str) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        if path_and_query.starts_with('/') {
            format!("{}{}", base, path_and_query)
        } else {
            format!("{}/{}", base, path_and_query)
        }
    }
}

/// Read-only table of downstream services keyed by service key.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: HashMap<String, Arc<ServiceEndpoint>>,
}

impl ServiceRegistry {
    /// Create a registry from configuration.
    pub fn from_config(configs: &[ServiceConfig]) -> Self {
        let mut services = HashMap::new();

        for config in configs {
            match Url::parse(&config.base_url) {
                Ok(base_url) => {
                    let key = config.key.to_lowercase();
                    let endpoint = ServiceEndpoint {
                        key: key.clone(),
                        name: config.name.clone(),
                        base_url,
                        timeout: config.timeout(),
                    };
                    services.insert(key, Arc::new(endpoint));
                }
                Err(e) => {
                    tracing::warn!(service = %config.key, url = %config.base_url, error = %e, "Invalid service base_url, skipping");
                }
            }
        }

        Self { services }
    }

    /// Look up a service by key.
    pub fn get(&self, key: &str) -> Option<Arc<ServiceEndpoint>> {
        self.services.get(&key.to_lowercase()).cloned()
    }

    /// All registered endpoints.
    pub fn endpoints(&self) -> impl Iterator<Item = &Arc<ServiceEndpoint>> {
        self.services.values()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(key: &str, url: &str) -> ServiceConfig {
        ServiceConfig {
            key: key.into(),
            name: format!("{key} service"),
            base_url: url.into(),
            timeout_ms: 2500,
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = ServiceRegistry::from_config(&[config("orders", "http://127.0.0.1:5004")]);

        let endpoint = registry.get("Orders").unwrap();
        assert_eq!(endpoint.key, "orders");
        assert_eq!(endpoint.timeout, Duration::from_millis(2500));
        assert!(registry.get("payments").is_none());
    }

    #[test]
    fn test_invalid_url_is_skipped() {
        let registry = ServiceRegistry::from_config(&[
            config("orders", "http://127.0.0.1:5004"),
            config("broken", "::nope::"),
        ]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_url_for() {
        let registry = ServiceRegistry::from_config(&[config("menu", "http://menu.local:5002/")]);
        let endpoint = registry.get("menu").unwrap();

        assert_eq!(endpoint.url_for("/items?page=2"), "http://menu.local:5002/items?page=2");
        assert_eq!(endpoint.url_for("items"), "http://menu.local:5002/items");
    }
}
