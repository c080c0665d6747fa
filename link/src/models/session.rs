use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};

use super::user::User;

/// Authenticated session returned by sign-in.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub access_token: String,

    #[serde(default)]
    pub refresh_token: Option<String>,

    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Lifetime in seconds at issue time
    #[serde(default)]
    pub expires_in: Option<i64>,

    /// Expiry as unix seconds, when the platform reports it
    #[serde(default)]
    pub expires_at: Option<i64>,

    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl Session {
    /// Expiry in unix seconds: the reported `expires_at`, else the JWT `exp` claim.
    pub fn expiry(&self) -> Option<i64> {
        self.expires_at.or_else(|| jwt_expiry(&self.access_token))
    }

    /// True when the access token is past its expiry at `now` (unix seconds).
    ///
    /// Tokens with no readable expiry are treated as live; the platform will
    /// reject them with a 401 if they are not.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expiry().map(|exp| exp <= now).unwrap_or(false)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(chrono::Utc::now().timestamp())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expiry())
            .field("user", &self.user.id)
            .finish()
    }
}

/// Read the `exp` claim of a JWT without verifying its signature.
pub fn jwt_expiry(token: &str) -> Option<i64> {
    let payload = token.split('.').nth(1)?;
    let decoded = general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&decoded).ok()?;
    claims.get("exp").and_then(serde_json::Value::as_i64)
}
