//! Client-side upload checks, applied before any bytes leave the process.

use crate::{
    error::{AtriumLinkError, Result},
    models::{Bucket, BucketOptions},
};

const MIB: u64 = 1024 * 1024;

/// Size and content-type limits for uploads into a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    /// `None` means unlimited
    pub max_bytes: Option<u64>,
    /// Exact types (`image/png`) or wildcards (`image/*`). Empty allows any type.
    pub allowed_mime_types: Vec<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::images()
    }
}

impl UploadPolicy {
    /// No limits at all.
    pub fn unrestricted() -> Self {
        Self {
            max_bytes: None,
            allowed_mime_types: Vec::new(),
        }
    }

    /// Web images up to 5 MiB.
    pub fn images() -> Self {
        Self {
            max_bytes: Some(5 * MIB),
            allowed_mime_types: ["image/png", "image/jpeg", "image/gif", "image/webp", "image/svg+xml"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    pub fn with_allowed_mime_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_mime_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn allows_mime_type(&self, mime_type: &str) -> bool {
        if self.allowed_mime_types.is_empty() {
            return true;
        }
        let mime_type = essence(mime_type);
        self.allowed_mime_types.iter().any(|allowed| {
            let allowed = allowed.trim().to_ascii_lowercase();
            match allowed.strip_suffix("/*") {
                Some(top) => mime_type.split('/').next() == Some(top),
                None => allowed == mime_type,
            }
        })
    }

    /// Validate an upload of `len` bytes with type `mime_type` to `path`.
    pub fn check(&self, path: &str, mime_type: &str, len: u64) -> Result<()> {
        validate_object_path(path)?;
        if len == 0 {
            return Err(AtriumLinkError::ValidationError(format!("'{}' is empty", path)));
        }
        if let Some(max) = self.max_bytes {
            if len > max {
                return Err(AtriumLinkError::ValidationError(format!(
                    "'{}' is {} bytes; the limit is {} bytes",
                    path, len, max
                )));
            }
        }
        if !self.allows_mime_type(mime_type) {
            return Err(AtriumLinkError::ValidationError(format!(
                "Type '{}' is not allowed (allowed: {})",
                mime_type,
                self.allowed_mime_types.join(", ")
            )));
        }
        Ok(())
    }

    /// Policy enforced server-side by an existing bucket.
    pub fn from_bucket(bucket: &Bucket) -> Self {
        Self {
            max_bytes: bucket.file_size_limit,
            allowed_mime_types: bucket.allowed_mime_types.clone().unwrap_or_default(),
        }
    }

    /// Bucket settings carrying this policy, so the platform enforces it too.
    pub fn bucket_options(&self, id: &str, public: bool) -> BucketOptions {
        let mut options = BucketOptions::new(id)
            .public(public)
            .allowed_mime_types(self.allowed_mime_types.iter().cloned());
        if let Some(max) = self.max_bytes {
            options = options.file_size_limit(max);
        }
        options
    }
}

/// Object keys are relative, non-empty and free of `..` segments.
pub fn validate_object_path(path: &str) -> Result<()> {
    let invalid = path.trim().is_empty()
        || path.starts_with('/')
        || path.ends_with('/')
        || path.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if invalid {
        return Err(AtriumLinkError::ValidationError(format!(
            "Invalid object path '{}'",
            path
        )));
    }
    Ok(())
}

/// MIME type from a file extension; `application/octet-stream` when unknown.
pub fn guess_mime_type(path: &str) -> &'static str {
    let ext = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        "ico" => "image/x-icon",
        "pdf" => "application/pdf",
        "json" => "application/json",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "text/javascript",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        _ => "application/octet-stream",
    }
}

fn essence(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_policy_limits() {
        let policy = UploadPolicy::images();
        assert!(policy.check("avatars/u1.png", "image/png", 1024).is_ok());
        assert!(policy.check("avatars/u1.png", "image/png", 5 * MIB).is_ok());
        assert!(policy.check("avatars/u1.png", "image/png", 5 * MIB + 1).is_err());
        assert!(policy.check("docs/cv.pdf", "application/pdf", 10).is_err());
        assert!(policy.check("avatars/u1.png", "image/png", 0).is_err());
    }

    #[test]
    fn test_mime_matching() {
        let policy = UploadPolicy::unrestricted().with_allowed_mime_types(["image/*", "application/pdf"]);
        assert!(policy.allows_mime_type("image/avif"));
        assert!(policy.allows_mime_type("Application/PDF; charset=binary"));
        assert!(!policy.allows_mime_type("video/mp4"));
        assert!(UploadPolicy::unrestricted().allows_mime_type("anything/else"));
    }

    #[test]
    fn test_object_paths() {
        assert!(validate_object_path("a/b/c.png").is_ok());
        for bad in ["", "/abs.png", "dir/", "a//b", "../escape.png", "a/./b"] {
            assert!(validate_object_path(bad).is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_policy_and_bucket_settings_agree() {
        let options = UploadPolicy::images().bucket_options("media", true);
        assert_eq!(options.file_size_limit, Some(5 * MIB));
        assert!(options.public);

        let bucket = Bucket {
            id: "media".into(),
            name: "media".into(),
            public: true,
            file_size_limit: options.file_size_limit,
            allowed_mime_types: options.allowed_mime_types.clone(),
        };
        assert!(options.matches(&bucket));
        assert_eq!(UploadPolicy::from_bucket(&bucket), UploadPolicy::images());
    }

    #[test]
    fn test_guess_mime_type() {
        assert_eq!(guess_mime_type("hero.JPG"), "image/jpeg");
        assert_eq!(guess_mime_type("archive.tar.gz"), "application/octet-stream");
        assert_eq!(guess_mime_type("README"), "application/octet-stream");
    }
}
