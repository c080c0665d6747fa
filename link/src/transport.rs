//! Shared HTTP plumbing for the auth, table and storage APIs.
//!
//! Owns the pooled `reqwest::Client`, the project keys and the current user
//! session, and implements the request/retry loop every API goes through.

use crate::{
    auth::AuthProvider,
    error::{AtriumLinkError, Result},
    models::{ErrorDetail, Session},
};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// Session slot shared by every handle cloned from one client.
pub(crate) type SessionSlot = Arc<RwLock<Option<Session>>>;

#[derive(Clone)]
pub(crate) struct Transport {
    base_url: String,
    http_client: reqwest::Client,
    api_key: String,
    service_key: Option<String>,
    session: SessionSlot,
    max_retries: u32,
}

impl Transport {
    pub(crate) fn new(
        base_url: String,
        http_client: reqwest::Client,
        api_key: String,
        service_key: Option<String>,
        max_retries: u32,
    ) -> Self {
        Self {
            base_url,
            http_client,
            api_key,
            service_key,
            session: Arc::new(RwLock::new(None)),
            max_retries,
        }
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http_client
    }

    pub(crate) fn session(&self) -> Result<Option<Session>> {
        let guard = self
            .session
            .read()
            .map_err(|e| AtriumLinkError::InternalError(e.to_string()))?;
        Ok(guard.clone())
    }

    pub(crate) fn set_session(&self, session: Option<Session>) -> Result<()> {
        let mut guard = self
            .session
            .write()
            .map_err(|e| AtriumLinkError::InternalError(e.to_string()))?;
        *guard = session;
        Ok(())
    }

    /// Credentials for ordinary requests: the user session when present.
    pub(crate) fn auth(&self) -> Result<AuthProvider> {
        Ok(match self.session()? {
            Some(session) => AuthProvider::bearer(&self.api_key, session.access_token),
            None => AuthProvider::anon(&self.api_key),
        })
    }

    /// Credentials for privileged requests; requires the service key.
    pub(crate) fn service_auth(&self) -> Result<AuthProvider> {
        self.service_key
            .as_ref()
            .map(AuthProvider::service)
            .ok_or_else(|| {
                AtriumLinkError::ConfigurationError(format!(
                    "{} is required for this operation",
                    crate::config::ENV_SERVICE_KEY
                ))
            })
    }

    /// Credentials for a request that needs a signed-in user.
    pub(crate) fn user_auth(&self) -> Result<(AuthProvider, Session)> {
        let session = self.session()?.ok_or_else(|| {
            AtriumLinkError::AuthenticationError("No active session; sign in first".to_string())
        })?;
        Ok((
            AuthProvider::bearer(&self.api_key, session.access_token.clone()),
            session,
        ))
    }

    /// Send a request built by `build`, mapping non-2xx responses to errors.
    ///
    /// `build` is called once per attempt since request builders with bodies
    /// cannot be cloned. Only `idempotent` requests are retried, and only on
    /// connect or timeout failures.
    pub(crate) async fn send<F>(
        &self,
        label: &str,
        idempotent: bool,
        build: F,
    ) -> Result<reqwest::Response>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut retries = 0;
        let max_retries = if idempotent { self.max_retries } else { 0 };
        let overall_start = Instant::now();

        loop {
            let attempt_start = Instant::now();
            debug!(
                "[LINK_HTTP] {} (attempt {}/{})",
                label,
                retries + 1,
                max_retries + 1
            );

            match build().send().await {
                Ok(response) => {
                    let status = response.status();
                    debug!(
                        "[LINK_HTTP] {} status={} duration_ms={}",
                        label,
                        status,
                        attempt_start.elapsed().as_millis()
                    );

                    if status.is_success() {
                        return Ok(response);
                    }

                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    let message = ErrorDetail::message_from_body(&body);
                    warn!(
                        "[LINK_HTTP] {} failed: status={} message=\"{}\"",
                        label, status, message
                    );
                    return Err(AtriumLinkError::ServerError {
                        status_code: status.as_u16(),
                        message,
                    });
                },
                Err(e) if retries < max_retries && Self::is_retriable(&e) => {
                    retries += 1;
                    warn!(
                        "[LINK_HTTP] {} retriable error (attempt {}/{}): {}",
                        label,
                        retries,
                        max_retries + 1,
                        e
                    );
                    tokio::time::sleep(tokio::time::Duration::from_millis(100 * retries as u64))
                        .await;
                    continue;
                },
                Err(e) => {
                    warn!(
                        "[LINK_HTTP] {} fatal error: {} total_ms={}",
                        label,
                        e,
                        overall_start.elapsed().as_millis()
                    );
                    return Err(e.into());
                },
            }
        }
    }

    /// [`send`](Self::send) and decode the JSON body.
    pub(crate) async fn send_json<T, F>(&self, label: &str, idempotent: bool, build: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn() -> reqwest::RequestBuilder,
    {
        let response = self.send(label, idempotent, build).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            AtriumLinkError::SerializationError(format!("{}: invalid response body: {}", label, e))
        })
    }

    fn is_retriable(err: &reqwest::Error) -> bool {
        err.is_timeout() || err.is_connect()
    }
}
