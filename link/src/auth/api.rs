//! Account flows: sign-in, sign-up, sign-out, current user and password reset.
//!
//! Sign-in stores the returned [`Session`] on the client; every handle cloned
//! from the same client then sends the user's access token.

use crate::{
    error::{AtriumLinkError, Result},
    models::{
        HealthCheckResponse, RecoverRequest, Session, SignInRequest, SignUpRequest,
        UpdateUserRequest, User,
    },
    transport::Transport,
};
use log::{debug, info};
use serde_json::Value as JsonValue;

/// Minimum password length enforced by the platform's default policy
pub const MIN_PASSWORD_LEN: usize = 6;

/// Result of a sign-up.
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    /// Auto-confirmed account; the session is now active.
    SignedIn(Session),
    /// A confirmation email was sent; no session yet.
    ConfirmationRequired(User),
}

/// Account API handle, obtained from [`AtriumClient::auth`](crate::AtriumClient::auth).
#[derive(Clone)]
pub struct AuthApi {
    transport: Transport,
}

impl AuthApi {
    pub(crate) fn new(transport: Transport) -> Self {
        Self { transport }
    }

    /// Sign in with email and password; the session is kept on the client.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let request = SignInRequest {
            email: validate_email(email)?,
            password: validate_password(password)?,
        };
        let url = self.transport.url("/auth/v1/token?grant_type=password");
        let auth = self.transport.auth()?;
        debug!("[AUTH] Signing in '{}'", request.email);

        let session: Session = self
            .transport
            .send_json("POST sign-in", false, || {
                auth.apply_to_request(self.transport.http().post(&url)).json(&request)
            })
            .await
            .map_err(into_auth_error)?;

        self.transport.set_session(Some(session.clone()))?;
        info!("[AUTH] Signed in user {}", session.user.id);
        Ok(session)
    }

    /// Create an account. `metadata` is stored as the user's `user_metadata`.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Option<JsonValue>,
    ) -> Result<SignUpOutcome> {
        let request = SignUpRequest {
            email: validate_email(email)?,
            password: validate_password(password)?,
            data: metadata,
        };
        let url = self.transport.url("/auth/v1/signup");
        let auth = self.transport.auth()?;
        debug!("[AUTH] Signing up '{}'", request.email);

        let body: JsonValue = self
            .transport
            .send_json("POST sign-up", false, || {
                auth.apply_to_request(self.transport.http().post(&url)).json(&request)
            })
            .await
            .map_err(into_auth_error)?;

        if body.get("access_token").is_some() {
            let session: Session = serde_json::from_value(body)?;
            self.transport.set_session(Some(session.clone()))?;
            Ok(SignUpOutcome::SignedIn(session))
        } else {
            let user: User = match body.get("user") {
                Some(user) => serde_json::from_value(user.clone())?,
                None => serde_json::from_value(body)?,
            };
            Ok(SignUpOutcome::ConfirmationRequired(user))
        }
    }

    /// End the session. The local session is cleared even when the platform
    /// call fails.
    pub async fn sign_out(&self) -> Result<()> {
        let Some(session) = self.transport.session()? else {
            return Ok(());
        };
        self.transport.set_session(None)?;

        let url = self.transport.url("/auth/v1/logout");
        let auth = crate::auth::AuthProvider::bearer(
            self.transport.auth()?.api_key(),
            session.access_token,
        );
        self.transport
            .send("POST sign-out", false, || {
                auth.apply_to_request(self.transport.http().post(&url))
            })
            .await?;
        info!("[AUTH] Signed out user {}", session.user.id);
        Ok(())
    }

    /// Fetch the signed-in user from the platform. `None` without a session.
    pub async fn get_user(&self) -> Result<Option<User>> {
        if self.transport.session()?.is_none() {
            return Ok(None);
        }
        let (auth, session) = self.transport.user_auth()?;
        if session.is_expired() {
            return Err(AtriumLinkError::AuthenticationError(
                "Session expired; sign in again".to_string(),
            ));
        }

        let url = self.transport.url("/auth/v1/user");
        let user: User = self
            .transport
            .send_json("GET user", true, || auth.apply_to_request(self.transport.http().get(&url)))
            .await
            .map_err(into_auth_error)?;
        Ok(Some(user))
    }

    /// Send a password-reset email. `redirect_to` is the page the emailed
    /// link opens (the site's reset form).
    pub async fn reset_password_for_email(&self, email: &str, redirect_to: Option<&str>) -> Result<()> {
        let request = RecoverRequest {
            email: validate_email(email)?,
        };
        let url = self.transport.url("/auth/v1/recover");
        let auth = self.transport.auth()?;

        self.transport
            .send("POST recover", false, || {
                let mut req = auth.apply_to_request(self.transport.http().post(&url));
                if let Some(target) = redirect_to {
                    req = req.query(&[("redirect_to", target)]);
                }
                req.json(&request)
            })
            .await?;
        debug!("[AUTH] Password reset requested for '{}'", request.email);
        Ok(())
    }

    /// Change the signed-in user's password.
    pub async fn update_password(&self, new_password: &str) -> Result<User> {
        let request = UpdateUserRequest {
            password: Some(validate_password(new_password)?),
            data: None,
        };
        let (auth, _) = self.transport.user_auth()?;
        let url = self.transport.url("/auth/v1/user");

        self.transport
            .send_json("PUT user", false, || {
                auth.apply_to_request(self.transport.http().put(&url)).json(&request)
            })
            .await
            .map_err(into_auth_error)
    }

    /// Current session held by the client, if any.
    pub fn session(&self) -> Result<Option<Session>> {
        self.transport.session()
    }

    /// Install a previously obtained session (e.g. restored from storage).
    pub fn set_session(&self, session: Session) -> Result<()> {
        self.transport.set_session(Some(session))
    }

    /// Auth service health endpoint.
    pub async fn health(&self) -> Result<HealthCheckResponse> {
        let url = self.transport.url("/auth/v1/health");
        let auth = self.transport.auth()?;
        self.transport
            .send_json("GET auth health", true, || {
                auth.apply_to_request(self.transport.http().get(&url))
            })
            .await
    }
}

fn validate_email(email: &str) -> Result<String> {
    let email = email.trim();
    let valid = email
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.ends_with('.'))
        .unwrap_or(false);
    if !valid {
        return Err(AtriumLinkError::ValidationError(format!(
            "'{}' is not a valid email address",
            email
        )));
    }
    Ok(email.to_string())
}

fn validate_password(password: &str) -> Result<String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AtriumLinkError::ValidationError(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(password.to_string())
}

/// Rejected credentials come back as 400/401/422; surface them as auth errors.
fn into_auth_error(err: AtriumLinkError) -> AtriumLinkError {
    match err {
        AtriumLinkError::ServerError {
            status_code: 400 | 401 | 403 | 422,
            message,
        } => AtriumLinkError::AuthenticationError(message),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert_eq!(validate_email("  ada@example.com ").unwrap(), "ada@example.com");
        assert!(validate_email("ada").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("ada@localhost").is_err());
        assert!(validate_email("ada@example.").is_err());
    }

    #[test]
    fn test_password_validation() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }

    #[test]
    fn test_rejected_credentials_become_auth_errors() {
        let err = into_auth_error(AtriumLinkError::ServerError {
            status_code: 400,
            message: "Invalid login credentials".into(),
        });
        assert_eq!(err, AtriumLinkError::AuthenticationError("Invalid login credentials".into()));

        let err = into_auth_error(AtriumLinkError::ServerError {
            status_code: 503,
            message: "unavailable".into(),
        });
        assert!(matches!(err, AtriumLinkError::ServerError { status_code: 503, .. }));
    }

    #[tokio::test]
    async fn test_validation_happens_before_network() {
        let transport = Transport::new(
            "http://invalid.invalid".into(),
            reqwest::Client::new(),
            "anon".into(),
            None,
            0,
        );
        let api = AuthApi::new(transport);
        assert!(matches!(
            api.sign_in("not-an-email", "secret123").await,
            Err(AtriumLinkError::ValidationError(_))
        ));
        assert!(matches!(
            api.sign_up("ada@example.com", "123", None).await,
            Err(AtriumLinkError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_signed_out_client_has_no_user() {
        let transport = Transport::new(
            "http://invalid.invalid".into(),
            reqwest::Client::new(),
            "anon".into(),
            None,
            0,
        );
        let api = AuthApi::new(transport);
        assert!(api.get_user().await.unwrap().is_none());
        assert!(api.sign_out().await.is_ok());
        assert!(matches!(
            api.update_password("new-secret").await,
            Err(AtriumLinkError::AuthenticationError(_))
        ));
    }
}
