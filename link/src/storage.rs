//! Object storage: per-bucket file operations and bucket administration.

use crate::{
    error::{AtriumLinkError, Result},
    models::{Bucket, BucketOptions, ListOptions, ListRequest, StorageObject, UploadResponse},
    transport::Transport,
    upload_policy::{validate_object_path, UploadPolicy},
};
use bytes::Bytes;
use log::{debug, info};
use serde_json::json;

/// Options for a single upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    /// Defaults to a guess from the path's extension
    pub content_type: Option<String>,
    /// Overwrite an existing object at the same path
    pub upsert: bool,
    pub cache_control_secs: u32,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            content_type: None,
            upsert: false,
            cache_control_secs: 3600,
        }
    }
}

/// File operations scoped to one bucket.
#[derive(Clone)]
pub struct StorageBucket {
    transport: Transport,
    name: String,
    policy: UploadPolicy,
}

impl StorageBucket {
    pub(crate) fn new(transport: Transport, name: &str) -> Self {
        Self {
            transport,
            name: name.to_string(),
            policy: UploadPolicy::unrestricted(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Validate uploads against `policy` before sending them.
    pub fn with_policy(mut self, policy: UploadPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    fn check_name(&self) -> Result<()> {
        if self.name.trim().is_empty() || self.name.contains('/') {
            return Err(AtriumLinkError::ValidationError(format!(
                "Invalid bucket name '{}'",
                self.name
            )));
        }
        Ok(())
    }

    /// Upload `data` to `path`. The upload policy is enforced first; a
    /// rejected file never reaches the network.
    pub async fn upload(&self, path: &str, data: impl Into<Bytes>, options: UploadOptions) -> Result<UploadResponse> {
        self.check_name()?;
        let data: Bytes = data.into();
        let content_type = options
            .content_type
            .clone()
            .unwrap_or_else(|| crate::upload_policy::guess_mime_type(path).to_string());
        self.policy.check(path, &content_type, data.len() as u64)?;

        let url = self.transport.url(&format!("/storage/v1/object/{}/{}", self.name, path));
        let auth = self.transport.auth()?;
        debug!(
            "[STORAGE] Uploading {}/{} ({} bytes, {})",
            self.name,
            path,
            data.len(),
            content_type
        );

        let response: UploadResponse = self
            .transport
            .send_json(&format!("POST upload {}", self.name), false, || {
                auth.apply_to_request(self.transport.http().post(&url))
                    .header("Content-Type", content_type.as_str())
                    .header("cache-control", format!("max-age={}", options.cache_control_secs))
                    .header("x-upsert", if options.upsert { "true" } else { "false" })
                    .body(data.clone())
            })
            .await?;
        info!("[STORAGE] Uploaded {}", response.key);
        Ok(response)
    }

    /// List objects under `prefix` (`""` for the bucket root).
    pub async fn list(&self, prefix: &str, options: ListOptions) -> Result<Vec<StorageObject>> {
        self.check_name()?;
        let url = self.transport.url(&format!("/storage/v1/object/list/{}", self.name));
        let auth = self.transport.auth()?;
        let request = ListRequest {
            prefix: prefix.to_string(),
            options,
        };

        self.transport
            .send_json(&format!("POST list {}", self.name), true, || {
                auth.apply_to_request(self.transport.http().post(&url)).json(&request)
            })
            .await
    }

    /// Remove objects by path; returns the objects actually removed.
    pub async fn remove(&self, paths: &[&str]) -> Result<Vec<StorageObject>> {
        self.check_name()?;
        if paths.is_empty() {
            return Ok(Vec::new());
        }
        for path in paths {
            validate_object_path(path)?;
        }
        let url = self.transport.url(&format!("/storage/v1/object/{}", self.name));
        let auth = self.transport.auth()?;
        let body = json!({ "prefixes": paths });

        let removed: Vec<StorageObject> = self
            .transport
            .send_json(&format!("DELETE objects {}", self.name), false, || {
                auth.apply_to_request(self.transport.http().delete(&url)).json(&body)
            })
            .await?;
        debug!("[STORAGE] Removed {} object(s) from {}", removed.len(), self.name);
        Ok(removed)
    }

    /// URL of an object in a public bucket. No request is made and the
    /// bucket's visibility is not checked.
    pub fn public_url(&self, path: &str) -> String {
        self.transport.url(&format!(
            "/storage/v1/object/public/{}/{}",
            self.name,
            path.trim_start_matches('/')
        ))
    }
}

impl std::fmt::Debug for StorageBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageBucket")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .finish()
    }
}

/// What [`StorageAdmin::ensure_bucket`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum BucketProvision {
    Created(Bucket),
    /// Already present with the requested settings
    Unchanged(Bucket),
    /// Present with different settings, now updated
    Updated(Bucket),
}

impl BucketProvision {
    pub fn bucket(&self) -> &Bucket {
        match self {
            Self::Created(b) | Self::Unchanged(b) | Self::Updated(b) => b,
        }
    }
}

/// Bucket administration. Every call uses the service key.
#[derive(Clone)]
pub struct StorageAdmin {
    transport: Transport,
}

impl StorageAdmin {
    pub(crate) fn new(transport: Transport) -> Self {
        Self { transport }
    }

    pub async fn list_buckets(&self) -> Result<Vec<Bucket>> {
        let auth = self.transport.service_auth()?;
        let url = self.transport.url("/storage/v1/bucket");
        self.transport
            .send_json("GET buckets", true, || auth.apply_to_request(self.transport.http().get(&url)))
            .await
    }

    /// `None` when no bucket has this id.
    pub async fn get_bucket(&self, id: &str) -> Result<Option<Bucket>> {
        let auth = self.transport.service_auth()?;
        let url = self.transport.url(&format!("/storage/v1/bucket/{}", id));
        let result: Result<Bucket> = self
            .transport
            .send_json(&format!("GET bucket {}", id), true, || {
                auth.apply_to_request(self.transport.http().get(&url))
            })
            .await;
        match result {
            Ok(bucket) => Ok(Some(bucket)),
            Err(e) if is_missing_bucket(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn create_bucket(&self, options: &BucketOptions) -> Result<Bucket> {
        validate_bucket_id(&options.id)?;
        let auth = self.transport.service_auth()?;
        let url = self.transport.url("/storage/v1/bucket");
        self.transport
            .send("POST bucket", false, || {
                auth.apply_to_request(self.transport.http().post(&url)).json(options)
            })
            .await?;
        info!("[STORAGE] Created bucket '{}' (public={})", options.id, options.public);
        Ok(bucket_from_options(options))
    }

    pub async fn update_bucket(&self, options: &BucketOptions) -> Result<Bucket> {
        validate_bucket_id(&options.id)?;
        let auth = self.transport.service_auth()?;
        let url = self.transport.url(&format!("/storage/v1/bucket/{}", options.id));
        self.transport
            .send("PUT bucket", false, || {
                auth.apply_to_request(self.transport.http().put(&url)).json(options)
            })
            .await?;
        info!("[STORAGE] Updated bucket '{}'", options.id);
        Ok(bucket_from_options(options))
    }

    /// Create the bucket if missing, or bring its settings in line. Running
    /// it twice with the same options changes nothing the second time.
    pub async fn ensure_bucket(&self, options: &BucketOptions) -> Result<BucketProvision> {
        match self.get_bucket(&options.id).await? {
            None => self.create_bucket(options).await.map(BucketProvision::Created),
            Some(existing) if options.matches(&existing) => Ok(BucketProvision::Unchanged(existing)),
            Some(_) => self.update_bucket(options).await.map(BucketProvision::Updated),
        }
    }
}

fn bucket_from_options(options: &BucketOptions) -> Bucket {
    Bucket {
        id: options.id.clone(),
        name: options.name.clone(),
        public: options.public,
        file_size_limit: options.file_size_limit,
        allowed_mime_types: options.allowed_mime_types.clone(),
    }
}

fn validate_bucket_id(id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && id.len() <= 63
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_' || c == '.');
    if !valid {
        return Err(AtriumLinkError::ValidationError(format!(
            "Invalid bucket id '{}' (lowercase letters, digits, '-', '_' and '.')",
            id
        )));
    }
    Ok(())
}

/// The storage service reports a missing bucket as 404, or as 400 with a
/// "not found" body.
fn is_missing_bucket(err: &AtriumLinkError) -> bool {
    match err {
        AtriumLinkError::ServerError { status_code: 404, .. } => true,
        AtriumLinkError::ServerError {
            status_code: 400,
            message,
        } => message.to_ascii_lowercase().contains("not found"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(service_key: Option<&str>) -> Transport {
        Transport::new(
            "http://localhost:54321".into(),
            reqwest::Client::new(),
            "anon".into(),
            service_key.map(str::to_string),
            0,
        )
    }

    #[test]
    fn test_public_url() {
        let bucket = StorageBucket::new(transport(None), "media");
        assert_eq!(
            bucket.public_url("/hero/banner.png"),
            "http://localhost:54321/storage/v1/object/public/media/hero/banner.png"
        );
    }

    #[test]
    fn test_missing_bucket_detection() {
        assert!(is_missing_bucket(&AtriumLinkError::ServerError {
            status_code: 400,
            message: "Bucket not found".into()
        }));
        assert!(is_missing_bucket(&AtriumLinkError::ServerError {
            status_code: 404,
            message: String::new()
        }));
        assert!(!is_missing_bucket(&AtriumLinkError::ServerError {
            status_code: 400,
            message: "invalid".into()
        }));
    }

    #[test]
    fn test_bucket_id_rules() {
        assert!(validate_bucket_id("site-media").is_ok());
        assert!(validate_bucket_id("Media").is_err());
        assert!(validate_bucket_id("").is_err());
        assert!(validate_bucket_id("a/b").is_err());
    }

    #[tokio::test]
    async fn test_rejected_upload_never_reaches_network() {
        let bucket = StorageBucket::new(transport(None), "media").with_policy(UploadPolicy::images());
        let result = bucket
            .upload("docs/report.pdf", vec![1u8; 16], UploadOptions::default())
            .await;
        assert!(matches!(result, Err(AtriumLinkError::ValidationError(_))));

        let oversized = bucket
            .upload("hero.png", vec![0u8; 6 * 1024 * 1024], UploadOptions::default())
            .await;
        assert!(matches!(oversized, Err(AtriumLinkError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_admin_requires_service_key() {
        let admin = StorageAdmin::new(transport(None));
        assert!(matches!(
            admin.ensure_bucket(&BucketOptions::new("media")).await,
            Err(AtriumLinkError::ConfigurationError(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_nothing_is_noop() {
        let bucket = StorageBucket::new(transport(None), "media");
        assert!(bucket.remove(&[]).await.unwrap().is_empty());
        assert!(bucket.remove(&["../x"]).await.is_err());
    }
}
