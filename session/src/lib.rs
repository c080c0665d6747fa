//! # atrium-session
//!
//! Access control for the Atrium site:
//! - [`Role`] and [`Permission`] with the fixed policy in [`rbac`]
//! - [`RoleResolver`]: one profile lookup per call, failures become "no role"
//! - [`AccessGuard`]: permission and role checks for a resolved role
//! - [`RouteGuard`]: the `Loading → Granted | Denied` state machine
//! - [`RouteTable`]: validated path prefix to allowed roles
//!
//! ## Fail closed
//!
//! A missing principal, a failed lookup and an unknown role name all
//! resolve to no role, and no role passes no check.

pub mod error;
pub mod guard;
pub mod permission;
pub mod principal;
pub mod rbac;
pub mod resolver;
pub mod role;
pub mod route_guard;
pub mod route_table;

pub use error::{SessionError, SessionResult};
pub use guard::AccessGuard;
pub use permission::Permission;
pub use principal::Principal;
pub use rbac::{permissions_for, permissions_for_name, role_grants};
pub use resolver::{ProfileStore, ProfileTable, RoleResolver};
pub use role::Role;
pub use route_guard::{GuardInputs, GuardState, Navigator, RouteGuard, Ticket};
pub use route_table::{GuardedRoute, RouteDecision, RouteTable, RouteTableBuilder, DEFAULT_FALLBACK};
