//! Authentication for platform requests.
//!
//! Every platform request carries the project API key in an `apikey` header
//! and a bearer token in `Authorization`. The bearer is the signed-in user's
//! access token when there is a session, otherwise the key itself.

pub mod api;

pub use api::AuthApi;

use crate::error::{AtriumLinkError, Result};
use tokio_tungstenite::tungstenite::http::header::HeaderValue;

/// Credentials attached to outgoing requests.
///
/// # Examples
///
/// ```rust
/// use atrium_link::AuthProvider;
///
/// // Anonymous visitor (row-level security applies as `anon`)
/// let auth = AuthProvider::anon("public-anon-key");
///
/// // Signed-in user
/// let auth = AuthProvider::bearer("public-anon-key", "eyJhbGc...");
///
/// // Provisioning tasks only; bypasses row-level security
/// let auth = AuthProvider::service("service-key");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub enum AuthProvider {
    /// Public key only
    Anon { api_key: String },

    /// Public key plus the user's access token
    Bearer { api_key: String, access_token: String },

    /// Privileged service key
    Service { service_key: String },
}

impl AuthProvider {
    pub fn anon(api_key: impl Into<String>) -> Self {
        Self::Anon {
            api_key: api_key.into(),
        }
    }

    pub fn bearer(api_key: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self::Bearer {
            api_key: api_key.into(),
            access_token: access_token.into(),
        }
    }

    pub fn service(service_key: impl Into<String>) -> Self {
        Self::Service {
            service_key: service_key.into(),
        }
    }

    /// Value of the `apikey` header
    pub fn api_key(&self) -> &str {
        match self {
            Self::Anon { api_key } | Self::Bearer { api_key, .. } => api_key,
            Self::Service { service_key } => service_key,
        }
    }

    /// Token sent as `Authorization: Bearer <token>`
    pub fn bearer_token(&self) -> &str {
        match self {
            Self::Anon { api_key } => api_key,
            Self::Bearer { access_token, .. } => access_token,
            Self::Service { service_key } => service_key,
        }
    }

    /// Access token of a signed-in user, if any
    pub fn user_token(&self) -> Option<&str> {
        match self {
            Self::Bearer { access_token, .. } => Some(access_token),
            _ => None,
        }
    }

    /// True when requests run as a signed-in user.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Bearer { .. })
    }

    /// Attach `apikey` and `Authorization` headers to an HTTP request.
    pub fn apply_to_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", self.api_key())
            .bearer_auth(self.bearer_token())
    }

    /// `apikey` header value for the realtime handshake request.
    pub(crate) fn ws_api_key_header(&self) -> Result<HeaderValue> {
        HeaderValue::from_str(self.api_key()).map_err(|e| {
            AtriumLinkError::ConfigurationError(format!("Invalid API key for header: {}", e))
        })
    }
}

impl std::fmt::Debug for AuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Self::Anon { .. } => "Anon",
            Self::Bearer { .. } => "Bearer",
            Self::Service { .. } => "Service",
        };
        f.debug_struct("AuthProvider").field("kind", &kind).finish()
    }
}
