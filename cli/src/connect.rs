use atrium_cli::{CLIConfiguration, Result};
use atrium_link::{AtriumClient, EventHandlers};

/// Realtime lifecycle events go to the log.
fn event_handlers() -> EventHandlers {
    EventHandlers::new()
        .on_connect(|topic| log::debug!("[REALTIME] Joined {}", topic))
        .on_disconnect(|reason| log::warn!("[REALTIME] Disconnected: {}", reason))
        .on_error(|error| {
            log::error!(
                "[REALTIME] {} (recoverable: {})",
                error.message,
                error.recoverable
            )
        })
}

/// Build the platform client from the environment and the config file.
///
/// Missing `ATRIUM_URL`/`ATRIUM_ANON_KEY` is fatal here.
pub fn create_client(config: &CLIConfiguration) -> Result<AtriumClient> {
    let platform = config.platform_config(|name| std::env::var(name).ok())?;
    let server = config.resolved_server();

    let client = AtriumClient::builder()
        .config(&platform)
        .timeouts(config.to_link_timeouts())
        .max_retries(server.max_retries)
        .event_handlers(event_handlers())
        .build()?;

    log::debug!(
        "Connected to {} (service key: {})",
        client.base_url(),
        client.has_service_key()
    );
    Ok(client)
}
