use atrium_cli::{CLIConfiguration, CLIError, OutputFormatter, Result};
use atrium_link::{config::ENV_SERVICE_KEY, AtriumClient};

pub struct ProvisionRequest {
    pub bucket: Option<String>,
    pub private: bool,
    pub max_bytes: Option<u64>,
    pub mime_types: Vec<String>,
}

/// Create the bucket, or bring an existing one in line with the policy.
pub async fn handle_provision(
    client: &AtriumClient,
    config: &CLIConfiguration,
    formatter: &OutputFormatter,
    request: ProvisionRequest,
) -> Result<()> {
    if !client.has_service_key() {
        return Err(CLIError::ConfigurationError(format!(
            "{} is required to provision buckets",
            ENV_SERVICE_KEY
        )));
    }

    let storage = config.resolved_storage();
    let bucket = request.bucket.unwrap_or(storage.bucket);
    let public = storage.public && !request.private;

    let mut policy = config.upload_policy();
    if let Some(max_bytes) = request.max_bytes {
        policy = policy.with_max_bytes(max_bytes);
    }
    if !request.mime_types.is_empty() {
        policy = policy.with_allowed_mime_types(request.mime_types);
    }

    log::info!("Provisioning bucket {} (public: {})", bucket, public);
    let outcome = client
        .storage_admin()
        .ensure_bucket(&policy.bucket_options(&bucket, public))
        .await?;

    println!("{}", formatter.provision(&outcome));
    Ok(())
}
