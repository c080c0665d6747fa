//! Role resolution: one profile lookup per call, failures become "no role".

use crate::{
    error::{SessionError, SessionResult},
    principal::Principal,
    role::Role,
};
use async_trait::async_trait;
use atrium_link::AtriumClient;
use log::{debug, warn};
use serde_json::Value as JsonValue;

pub const PROFILE_TABLE: &str = "profiles";
pub const ROLE_COLUMN: &str = "role";

/// Where role names are stored.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Raw role name for a user id. `Ok(None)` for a missing profile or a
    /// null role.
    async fn role_name(&self, principal_id: &str) -> SessionResult<Option<String>>;
}

/// Profiles kept in a platform table, one row per user keyed by `id`.
#[derive(Debug, Clone)]
pub struct ProfileTable {
    client: AtriumClient,
    table: String,
    column: String,
}

impl ProfileTable {
    /// `profiles.role`
    pub fn new(client: AtriumClient) -> Self {
        Self::with_table(client, PROFILE_TABLE, ROLE_COLUMN)
    }

    pub fn with_table(client: AtriumClient, table: &str, column: &str) -> Self {
        Self {
            client,
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}

#[async_trait]
impl ProfileStore for ProfileTable {
    async fn role_name(&self, principal_id: &str) -> SessionResult<Option<String>> {
        let row = self
            .client
            .from(&self.table)
            .select(&self.column)
            .eq("id", principal_id)
            .maybe_single()
            .await?;

        match row.as_ref().and_then(|r| r.get(&self.column)) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(JsonValue::String(name)) => Ok(Some(name.clone())),
            Some(other) => Err(SessionError::MalformedProfile(format!(
                "{}.{} for {} is {}, expected a string",
                self.table, self.column, principal_id, other
            ))),
        }
    }
}

/// Resolves a principal's [`Role`].
#[derive(Debug, Clone)]
pub struct RoleResolver<S> {
    store: S,
}

impl RoleResolver<ProfileTable> {
    /// Resolver over the platform's `profiles` table.
    pub fn for_client(client: AtriumClient) -> Self {
        Self::new(ProfileTable::new(client))
    }
}

impl<S: ProfileStore> RoleResolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Strict decoding of a stored role name.
    pub fn decode(raw: &str) -> SessionResult<Role> {
        raw.parse()
    }

    /// Role of `principal`, or `None` when there is no principal, the lookup
    /// fails, the profile is missing or the stored name is not a known role.
    /// Never cached; every call performs a fresh lookup.
    pub async fn resolve(&self, principal: Option<&Principal>) -> Option<Role> {
        let principal = principal?;
        match self.try_resolve(principal).await {
            Ok(role) => role,
            Err(e) => {
                warn!("[RBAC] Role lookup for {} failed: {}", principal.id, e);
                None
            },
        }
    }

    /// Like [`resolve`](Self::resolve) but keeps the reason a role is absent.
    pub async fn try_resolve(&self, principal: &Principal) -> SessionResult<Option<Role>> {
        let Some(raw) = self.store.role_name(&principal.id).await? else {
            debug!("[RBAC] No role recorded for {}", principal.id);
            return Ok(None);
        };
        Self::decode(&raw).map(Some)
    }
}
