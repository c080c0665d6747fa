//! Route guard state machine.
//!
//! ```text
//!            update(inputs changed)
//!   ┌──────────────────────────────────────┐
//!   ▼                                      │
//! Loading ──settle(role ∈ allowed)──▶ Granted
//!    │
//!    └────settle(otherwise)─────────▶ Denied ──▶ one redirect to the fallback
//! ```
//!
//! Every entry into `Loading` issues a new [`Ticket`]. Only the latest
//! ticket may settle the guard; results for older tickets, or arriving after
//! [`RouteGuard::unmount`], are dropped.

use crate::{
    guard::AccessGuard,
    principal::Principal,
    resolver::{ProfileStore, RoleResolver},
    role::Role,
    route_table::{GuardedRoute, DEFAULT_FALLBACK},
};
use log::{debug, info};

/// Performs redirects for the guard.
pub trait Navigator: Send + Sync {
    fn redirect(&self, path: &str);
}

impl<F> Navigator for F
where
    F: Fn(&str) + Send + Sync,
{
    fn redirect(&self, path: &str) {
        self(path)
    }
}

/// Everything the guard's decision depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardInputs {
    pub principal: Option<Principal>,
    pub allowed_roles: Vec<Role>,
    pub path: String,
}

impl GuardInputs {
    pub fn new(principal: Option<Principal>, allowed_roles: &[Role], path: impl Into<String>) -> Self {
        Self {
            principal,
            allowed_roles: allowed_roles.to_vec(),
            path: path.into(),
        }
    }

    pub fn for_route(principal: Option<Principal>, route: &GuardedRoute, path: impl Into<String>) -> Self {
        Self::new(principal, &route.allowed_roles, path)
    }

    /// Same principal id, allowed roles and path.
    fn same_dependencies(&self, other: &GuardInputs) -> bool {
        self.principal.as_ref().map(|p| &p.id) == other.principal.as_ref().map(|p| &p.id)
            && self.allowed_roles == other.allowed_roles
            && self.path == other.path
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Loading,
    Granted(Role),
    Denied,
}

/// Identifies one evaluation of the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

pub struct RouteGuard<N> {
    navigator: N,
    fallback: String,
    inputs: Option<GuardInputs>,
    state: GuardState,
    generation: u64,
    pending: bool,
}

impl<N: Navigator> RouteGuard<N> {
    /// Guard redirecting to `/signin`.
    pub fn new(navigator: N) -> Self {
        Self {
            navigator,
            fallback: DEFAULT_FALLBACK.to_string(),
            inputs: None,
            state: GuardState::Loading,
            generation: 0,
            pending: false,
        }
    }

    /// Guard using a route's fallback.
    pub fn for_route(navigator: N, route: &GuardedRoute) -> Self {
        Self::new(navigator).with_fallback(&route.fallback)
    }

    pub fn with_fallback(mut self, fallback: &str) -> Self {
        self.fallback = fallback.to_string();
        self
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    /// Render children only in `Granted`.
    pub fn should_render(&self) -> bool {
        matches!(self.state, GuardState::Granted(_))
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub fn inputs(&self) -> Option<&GuardInputs> {
        self.inputs.as_ref()
    }

    /// Feed the current dependencies. Returns a ticket when they changed and
    /// the guard re-entered `Loading`; `None` when nothing changed.
    pub fn update(&mut self, inputs: GuardInputs) -> Option<Ticket> {
        if let Some(current) = &self.inputs {
            if current.same_dependencies(&inputs) {
                return None;
            }
        }
        self.generation += 1;
        self.pending = true;
        self.state = GuardState::Loading;
        debug!("[ROUTE_GUARD] Evaluating {} (ticket {})", inputs.path, self.generation);
        self.inputs = Some(inputs);
        Some(Ticket(self.generation))
    }

    /// Settle the evaluation identified by `ticket` with the resolved role.
    ///
    /// Returns `false` and changes nothing for a stale ticket. Entering
    /// `Denied` redirects exactly once.
    pub fn settle(&mut self, ticket: Ticket, role: Option<Role>) -> bool {
        if !self.pending || ticket.0 != self.generation {
            debug!("[ROUTE_GUARD] Dropping stale result for ticket {}", ticket.0);
            return false;
        }
        self.pending = false;

        let allowed: &[Role] = self
            .inputs
            .as_ref()
            .map(|i| i.allowed_roles.as_slice())
            .unwrap_or(&[]);
        if let Some(granted) = role.filter(|_| AccessGuard::new(role).has_any_role(allowed)) {
            self.state = GuardState::Granted(granted);
        } else {
            self.state = GuardState::Denied;
            let path = self.inputs.as_ref().map(|i| i.path.as_str()).unwrap_or_default();
            info!(
                "[ROUTE_GUARD] Denied {} (role: {}), redirecting to {}",
                path,
                role.map(|r| r.as_str()).unwrap_or("none"),
                self.fallback
            );
            self.navigator.redirect(&self.fallback);
        }
        true
    }

    /// The guarded view went away; in-flight results are dropped.
    pub fn unmount(&mut self) {
        self.generation += 1;
        self.pending = false;
    }

    /// Update, resolve and settle in one step.
    pub async fn evaluate<S: ProfileStore>(&mut self, resolver: &RoleResolver<S>, inputs: GuardInputs) -> GuardState {
        if let Some(ticket) = self.update(inputs) {
            let principal = self.inputs.as_ref().and_then(|i| i.principal.clone());
            let role = resolver.resolve(principal.as_ref()).await;
            self.settle(ticket, role);
        }
        self.state
    }
}

impl<N> std::fmt::Debug for RouteGuard<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteGuard")
            .field("fallback", &self.fallback)
            .field("inputs", &self.inputs)
            .field("state", &self.state)
            .field("generation", &self.generation)
            .finish()
    }
}
