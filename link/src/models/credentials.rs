use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Email/password pair for sign-in.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for SignInRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignInRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Sign-up payload; `data` lands in the new user's `user_metadata`.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
}

impl std::fmt::Debug for SignUpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignUpRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("data", &self.data)
            .finish()
    }
}

/// Password-reset email request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecoverRequest {
    pub email: String,
}

/// Attribute update for the signed-in user
#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
}

impl std::fmt::Debug for UpdateUserRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateUserRequest")
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("data", &self.data)
            .finish()
    }
}
