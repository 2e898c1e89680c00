//! Role-based authorization stage.
//!
//! Enforces the route's allowed-role set against the authenticated caller.
//! Routes with an empty set accept any caller that got past authentication.

use crate::pipeline::context::CallerIdentity;
use crate::pipeline::rejection::Rejection;
use crate::routing::RouteEntry;

/// Check the caller's roles against the governing route.
pub fn authorize(route: Option<&RouteEntry>, caller: Option<&CallerIdentity>) -> Result<(), Rejection> {
    let Some(route) = route else {
        return Ok(());
    };
    if !route.is_role_restricted() {
        return Ok(());
    }

    let roles = caller.map(|c| c.roles.as_slice()).unwrap_or(&[]);
    if route.permits(roles) {
        Ok(())
    } else {
        tracing::warn!(
            route = %route.path_prefix(),
            user_id = caller.map(|c| c.user_id.as_str()).unwrap_or("anonymous"),
            roles = ?roles,
            "Caller roles not permitted"
        );
        Err(Rejection::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(roles: &[&str]) -> CallerIdentity {
        CallerIdentity {
            user_id: "u-1".into(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn test_disjoint_roles_forbidden() {
        let route = RouteEntry::new("/api/v1/inventory/*", "inventory", true, vec!["staff", "admin"]);

        assert_eq!(
            authorize(Some(&route), Some(&caller(&["customer"]))),
            Err(Rejection::Forbidden)
        );
        assert_eq!(authorize(Some(&route), Some(&caller(&[]))), Err(Rejection::Forbidden));
        assert_eq!(authorize(Some(&route), None), Err(Rejection::Forbidden));
    }

    #[test]
    fn test_intersecting_roles_pass() {
        let route = RouteEntry::new("/api/v1/inventory/*", "inventory", true, vec!["staff", "admin"]);
        assert!(authorize(Some(&route), Some(&caller(&["customer", "staff"]))).is_ok());
    }

    #[test]
    fn test_unrestricted_routes_skip_check() {
        let route = RouteEntry::new("/api/v1/auth/*", "auth", true, Vec::<String>::new());
        assert!(authorize(Some(&route), Some(&caller(&[]))).is_ok());
        assert!(authorize(None, None).is_ok());
    }
}
