use crate::error::{AtriumLinkError, Result};
use reqwest::Url;

/// Phoenix serializer version spoken by the realtime service
pub(crate) const PROTOCOL_VSN: &str = "1.0.0";

const SOCKET_PATH: &str = "/realtime/v1/websocket";

/// Socket URL for a platform base URL: `http` becomes `ws`, `https` becomes
/// `wss`, and the key travels in the `apikey` query parameter.
pub(crate) fn resolve_ws_url(base_url: &str, api_key: &str) -> Result<String> {
    let base = Url::parse(base_url.trim()).map_err(|e| {
        AtriumLinkError::ConfigurationError(format!("Invalid base_url '{}': {}", base_url, e))
    })?;

    if base.host_str().is_none() {
        return Err(AtriumLinkError::ConfigurationError(
            "base_url must include a host".to_string(),
        ));
    }
    if !base.username().is_empty() || base.password().is_some() {
        return Err(AtriumLinkError::ConfigurationError(
            "base_url must not include username/password credentials".to_string(),
        ));
    }
    if base.query().is_some() || base.fragment().is_some() {
        return Err(AtriumLinkError::ConfigurationError(
            "base_url must not include query parameters or fragments".to_string(),
        ));
    }

    let ws_scheme = match base.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(AtriumLinkError::ConfigurationError(format!(
                "Unsupported base_url scheme '{}'; expected http(s) or ws(s)",
                other
            )));
        },
    };

    let mut ws_url = base.clone();
    ws_url.set_scheme(ws_scheme).map_err(|_| {
        AtriumLinkError::ConfigurationError("Failed to set WebSocket URL scheme".to_string())
    })?;
    ws_url.set_path(SOCKET_PATH);
    ws_url
        .query_pairs_mut()
        .clear()
        .append_pair("apikey", api_key)
        .append_pair("vsn", PROTOCOL_VSN);

    Ok(ws_url.to_string())
}
