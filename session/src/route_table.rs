//! Path prefix to allowed roles, validated once at startup.
//!
//! Matching is by path segment: `/admin` guards `/admin` and
//! `/admin/users` but not `/administrator`. The longest matching prefix
//! wins.

use crate::{
    error::{SessionError, SessionResult},
    guard::AccessGuard,
    role::Role,
};

pub const DEFAULT_FALLBACK: &str = "/signin";

/// A guarded path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardedRoute {
    pub prefix: String,
    pub allowed_roles: Vec<Role>,
    /// Where denied visitors are sent
    pub fallback: String,
}

impl GuardedRoute {
    pub fn matches(&self, path: &str) -> bool {
        path_has_prefix(path, &self.prefix)
    }
}

/// Outcome of checking a path for a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision<'a> {
    /// Not guarded
    Open,
    Granted(&'a GuardedRoute),
    /// Send the visitor to `fallback`
    Redirect { route: &'a GuardedRoute, fallback: &'a str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<GuardedRoute>,
    public: Vec<String>,
}

impl RouteTable {
    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder::default()
    }

    /// The site's routes: `/admin` for admins, `/editor` for admins and
    /// editors, `/dashboard` for every role; `/`, `/signin`, `/signup` and
    /// `/reset-password` are public.
    pub fn site() -> SessionResult<Self> {
        Self::site_with_fallback(DEFAULT_FALLBACK)
    }

    pub fn site_with_fallback(fallback: &str) -> SessionResult<Self> {
        Self::builder()
            .fallback(fallback)
            .guard("/admin", &[Role::Admin])
            .guard("/editor", &[Role::Admin, Role::Editor])
            .guard("/dashboard", &Role::ALL)
            .public("/")
            .public("/signin")
            .public("/signup")
            .public("/reset-password")
            .build()
    }

    pub fn routes(&self) -> &[GuardedRoute] {
        &self.routes
    }

    pub fn public_paths(&self) -> &[String] {
        &self.public
    }

    /// Guarded route covering `path`, if any.
    pub fn lookup(&self, path: &str) -> Option<&GuardedRoute> {
        self.routes
            .iter()
            .filter(|r| r.matches(path))
            .max_by_key(|r| r.prefix.len())
    }

    pub fn decide(&self, path: &str, role: Option<Role>) -> RouteDecision<'_> {
        match self.lookup(path) {
            None => RouteDecision::Open,
            Some(route) if AccessGuard::new(role).has_any_role(&route.allowed_roles) => {
                RouteDecision::Granted(route)
            },
            Some(route) => RouteDecision::Redirect {
                route,
                fallback: &route.fallback,
            },
        }
    }

    /// Guarded routes `role` may open.
    pub fn accessible(&self, role: Option<Role>) -> Vec<&GuardedRoute> {
        let guard = AccessGuard::new(role);
        self.routes
            .iter()
            .filter(|r| guard.has_any_role(&r.allowed_roles))
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RouteTableBuilder {
    fallback: Option<String>,
    routes: Vec<(String, Vec<Role>, Option<String>)>,
    public: Vec<String>,
}

impl RouteTableBuilder {
    /// Fallback for routes without their own (default `/signin`).
    pub fn fallback(mut self, path: &str) -> Self {
        self.fallback = Some(path.to_string());
        self
    }

    pub fn guard(mut self, prefix: &str, roles: &[Role]) -> Self {
        self.routes.push((prefix.to_string(), roles.to_vec(), None));
        self
    }

    pub fn guard_with_fallback(mut self, prefix: &str, roles: &[Role], fallback: &str) -> Self {
        self.routes
            .push((prefix.to_string(), roles.to_vec(), Some(fallback.to_string())));
        self
    }

    pub fn public(mut self, path: &str) -> Self {
        self.public.push(path.to_string());
        self
    }

    /// Validate and build.
    ///
    /// Rejected: prefixes or fallbacks not starting with `/`, duplicate
    /// prefixes, routes nobody may open, public paths inside a guarded
    /// prefix, and fallbacks that are themselves guarded.
    pub fn build(self) -> SessionResult<RouteTable> {
        let default_fallback = self.fallback.unwrap_or_else(|| DEFAULT_FALLBACK.to_string());
        let invalid = |msg: String| Err(SessionError::InvalidRouteTable(msg));

        let mut routes: Vec<GuardedRoute> = Vec::with_capacity(self.routes.len());
        for (prefix, mut allowed_roles, fallback) in self.routes {
            let prefix = normalize(&prefix);
            if !prefix.starts_with('/') {
                return invalid(format!("route '{}' must start with '/'", prefix));
            }
            if allowed_roles.is_empty() {
                return invalid(format!("route '{}' allows no roles", prefix));
            }
            if routes.iter().any(|r| r.prefix == prefix) {
                return invalid(format!("route '{}' is declared twice", prefix));
            }
            allowed_roles.sort();
            allowed_roles.dedup();
            routes.push(GuardedRoute {
                prefix,
                allowed_roles,
                fallback: normalize(fallback.as_deref().unwrap_or(&default_fallback)),
            });
        }

        for route in &routes {
            if !route.fallback.starts_with('/') {
                return invalid(format!(
                    "fallback '{}' of '{}' must start with '/'",
                    route.fallback, route.prefix
                ));
            }
            if let Some(guarding) = routes.iter().find(|r| r.matches(&route.fallback)) {
                return invalid(format!(
                    "fallback '{}' of '{}' is guarded by '{}'",
                    route.fallback, route.prefix, guarding.prefix
                ));
            }
        }

        let mut public = Vec::with_capacity(self.public.len());
        for path in self.public {
            let path = normalize(&path);
            if !path.starts_with('/') {
                return invalid(format!("public path '{}' must start with '/'", path));
            }
            if let Some(guarding) = routes.iter().find(|r| r.matches(&path)) {
                return invalid(format!("public path '{}' is guarded by '{}'", path, guarding.prefix));
            }
            if !public.contains(&path) {
                public.push(path);
            }
        }

        log::debug!("[ROUTES] Built route table with {} guarded route(s)", routes.len());
        Ok(RouteTable { routes, public })
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.len() > 1 {
        trimmed.trim_end_matches('/').to_string()
    } else {
        trimmed.to_string()
    }
}

fn path_has_prefix(path: &str, prefix: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path == prefix || path.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_table() {
        let table = RouteTable::site().unwrap();
        assert_eq!(table.lookup("/admin/users").unwrap().allowed_roles, vec![Role::Admin]);
        assert_eq!(
            table.lookup("/editor").unwrap().allowed_roles,
            vec![Role::Admin, Role::Editor]
        );
        assert!(table.lookup("/administrator").is_none());
        assert!(table.lookup("/").is_none());
        assert_eq!(table.lookup("/dashboard?tab=1").unwrap().prefix, "/dashboard");
    }

    #[test]
    fn test_decisions() {
        let table = RouteTable::site().unwrap();
        assert!(matches!(table.decide("/admin", Some(Role::Admin)), RouteDecision::Granted(_)));
        assert!(matches!(
            table.decide("/admin", Some(Role::Editor)),
            RouteDecision::Redirect { fallback: "/signin", .. }
        ));
        assert!(matches!(table.decide("/dashboard", None), RouteDecision::Redirect { .. }));
        assert_eq!(table.decide("/pricing", None), RouteDecision::Open);
    }

    #[test]
    fn test_accessible_routes() {
        let table = RouteTable::site().unwrap();
        let prefixes = |role| {
            table
                .accessible(role)
                .into_iter()
                .map(|r| r.prefix.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(prefixes(Some(Role::User)), vec!["/dashboard"]);
        assert_eq!(prefixes(Some(Role::Admin)).len(), 3);
        assert!(prefixes(None).is_empty());
    }

    #[test]
    fn test_longest_prefix_wins() {
        let table = RouteTable::builder()
            .guard("/dashboard", &Role::ALL)
            .guard("/dashboard/billing", &[Role::Admin])
            .build()
            .unwrap();
        assert_eq!(table.lookup("/dashboard/billing/invoices").unwrap().prefix, "/dashboard/billing");
        assert_eq!(table.lookup("/dashboard/profile").unwrap().prefix, "/dashboard");
    }

    #[test]
    fn test_guarded_fallback_is_rejected() {
        let err = RouteTable::builder()
            .guard("/admin", &[Role::Admin])
            .guard_with_fallback("/editor", &[Role::Editor], "/admin/login")
            .build()
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidRouteTable(ref m) if m.contains("/admin/login")));

        assert!(RouteTable::site_with_fallback("/dashboard").is_err());
        assert!(RouteTable::site_with_fallback("/").is_ok());
    }

    #[test]
    fn test_other_invalid_tables() {
        assert!(RouteTable::builder().guard("admin", &[Role::Admin]).build().is_err());
        assert!(RouteTable::builder().guard("/admin", &[]).build().is_err());
        assert!(RouteTable::builder()
            .guard("/admin", &[Role::Admin])
            .guard("/admin/", &[Role::Editor])
            .build()
            .is_err());
        assert!(RouteTable::builder()
            .guard("/admin", &[Role::Admin])
            .public("/admin/help")
            .build()
            .is_err());
        assert!(RouteTable::builder().fallback("signin").guard("/a", &[Role::User]).build().is_err());
    }
}
