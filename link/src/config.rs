//! Platform connection parameters.
//!
//! Two values are required to talk to the hosted platform: the service URL
//! and the public (anon) API key. Both come from the process environment;
//! their absence is fatal at startup.
//!
//! | Variable | Required | Meaning |
//! |----------|----------|---------|
//! | `ATRIUM_URL` | yes | Base URL, e.g. `https://abc.example.co` |
//! | `ATRIUM_ANON_KEY` | yes | Public API key sent with every request |
//! | `ATRIUM_SERVICE_KEY` | no | Privileged key used by provisioning tasks |

use crate::error::{AtriumLinkError, Result};
use reqwest::Url;
use std::fmt;

pub const ENV_URL: &str = "ATRIUM_URL";
pub const ENV_ANON_KEY: &str = "ATRIUM_ANON_KEY";
pub const ENV_SERVICE_KEY: &str = "ATRIUM_SERVICE_KEY";

/// Connection parameters for the hosted platform.
#[derive(Clone, PartialEq, Eq)]
pub struct PlatformConfig {
    url: String,
    anon_key: String,
    service_key: Option<String>,
}

impl PlatformConfig {
    /// Build a config, validating the URL and key.
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Result<Self> {
        let url = normalize_base_url(&url.into())?;
        let anon_key = anon_key.into().trim().to_string();
        if anon_key.is_empty() {
            return Err(AtriumLinkError::ConfigurationError(format!(
                "{} must not be empty",
                ENV_ANON_KEY
            )));
        }
        Ok(Self {
            url,
            anon_key,
            service_key: None,
        })
    }

    /// Attach the privileged service key.
    pub fn with_service_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into().trim().to_string();
        self.service_key = if key.is_empty() { None } else { Some(key) };
        self
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup(ENV_URL).filter(|v| !v.trim().is_empty()).ok_or_else(|| {
            AtriumLinkError::ConfigurationError(format!("{} is not set", ENV_URL))
        })?;
        let anon_key = lookup(ENV_ANON_KEY)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                AtriumLinkError::ConfigurationError(format!("{} is not set", ENV_ANON_KEY))
            })?;

        let mut config = Self::new(url, anon_key)?;
        if let Some(service_key) = lookup(ENV_SERVICE_KEY) {
            config = config.with_service_key(service_key);
        }
        Ok(config)
    }

    /// Base URL without a trailing slash
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn anon_key(&self) -> &str {
        &self.anon_key
    }

    pub fn service_key(&self) -> Option<&str> {
        self.service_key.as_deref()
    }
}

impl fmt::Debug for PlatformConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformConfig")
            .field("url", &self.url)
            .field("anon_key", &"[REDACTED]")
            .field("service_key", &self.service_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let parsed = Url::parse(trimmed).map_err(|e| {
        AtriumLinkError::ConfigurationError(format!("Invalid {} '{}': {}", ENV_URL, trimmed, e))
    })?;

    match parsed.scheme() {
        "http" | "https" => {},
        other => {
            return Err(AtriumLinkError::ConfigurationError(format!(
                "{} must use http:// or https:// (found '{}')",
                ENV_URL, other
            )));
        },
    }

    if parsed.host_str().is_none() {
        return Err(AtriumLinkError::ConfigurationError(format!(
            "{} must include a host",
            ENV_URL
        )));
    }

    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(AtriumLinkError::ConfigurationError(format!(
            "{} must not include query parameters or fragments",
            ENV_URL
        )));
    }

    Ok(trimmed.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_from_lookup_reads_required_values() {
        let config = PlatformConfig::from_lookup(lookup_from(&[
            (ENV_URL, "https://demo.example.co/"),
            (ENV_ANON_KEY, "anon-123"),
        ]))
        .unwrap();

        assert_eq!(config.url(), "https://demo.example.co");
        assert_eq!(config.anon_key(), "anon-123");
        assert!(config.service_key().is_none());
    }

    #[test]
    fn test_missing_url_is_fatal() {
        let err = PlatformConfig::from_lookup(lookup_from(&[(ENV_ANON_KEY, "anon")]))
            .unwrap_err();
        assert!(matches!(err, AtriumLinkError::ConfigurationError(ref m) if m.contains(ENV_URL)));
    }

    #[test]
    fn test_missing_key_is_fatal() {
        let err = PlatformConfig::from_lookup(lookup_from(&[(ENV_URL, "https://x.example.co")]))
            .unwrap_err();
        assert!(
            matches!(err, AtriumLinkError::ConfigurationError(ref m) if m.contains(ENV_ANON_KEY))
        );
    }

    #[test]
    fn test_blank_values_count_as_missing() {
        let result = PlatformConfig::from_lookup(lookup_from(&[
            (ENV_URL, "   "),
            (ENV_ANON_KEY, "anon"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        assert!(PlatformConfig::new("ftp://files.example.co", "anon").is_err());
        assert!(PlatformConfig::new("https://x.example.co?x=1", "anon").is_err());
    }

    #[test]
    fn test_service_key_is_optional_and_redacted() {
        let config = PlatformConfig::from_lookup(lookup_from(&[
            (ENV_URL, "http://localhost:54321"),
            (ENV_ANON_KEY, "anon"),
            (ENV_SERVICE_KEY, "service-secret"),
        ]))
        .unwrap();

        assert_eq!(config.service_key(), Some("service-secret"));
        let debug = format!("{:?}", config);
        assert!(!debug.contains("service-secret"));
        assert!(!debug.contains("anon\""));
    }
}
