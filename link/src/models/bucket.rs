use serde::{Deserialize, Serialize};

/// Storage bucket as described by the platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bucket {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub file_size_limit: Option<u64>,
    #[serde(default)]
    pub allowed_mime_types: Option<Vec<String>>,
}

/// Settings used when creating a bucket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BucketOptions {
    pub id: String,
    pub name: String,
    pub public: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size_limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_mime_types: Option<Vec<String>>,
}

impl BucketOptions {
    /// Private bucket with no limits; `id` doubles as the name.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            public: false,
            file_size_limit: None,
            allowed_mime_types: None,
        }
    }

    pub fn public(mut self, public: bool) -> Self {
        self.public = public;
        self
    }

    pub fn file_size_limit(mut self, bytes: u64) -> Self {
        self.file_size_limit = Some(bytes);
        self
    }

    pub fn allowed_mime_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let types: Vec<String> = types.into_iter().map(Into::into).collect();
        self.allowed_mime_types = if types.is_empty() { None } else { Some(types) };
        self
    }

    /// True when an existing bucket already carries these settings.
    pub fn matches(&self, bucket: &Bucket) -> bool {
        bucket.public == self.public
            && bucket.file_size_limit == self.file_size_limit
            && normalized(&bucket.allowed_mime_types) == normalized(&self.allowed_mime_types)
    }
}

fn normalized(types: &Option<Vec<String>>) -> Vec<String> {
    let mut v = types.clone().unwrap_or_default();
    v.sort();
    v
}
