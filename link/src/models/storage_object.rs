use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Entry returned by a bucket listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageObject {
    pub name: String,

    /// `None` for folder placeholders
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub created_at: Option<String>,

    #[serde(default)]
    pub updated_at: Option<String>,

    #[serde(default)]
    pub metadata: Option<JsonValue>,
}

impl StorageObject {
    pub fn is_folder(&self) -> bool {
        self.id.is_none()
    }

    pub fn size(&self) -> Option<u64> {
        self.metadata.as_ref()?.get("size")?.as_u64()
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.metadata.as_ref()?.get("mimetype")?.as_str()
    }
}

/// Sort column for bucket listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    Name,
    CreatedAt,
    UpdatedAt,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SortBy {
    pub column: SortColumn,
    /// "asc" or "desc"
    pub order: String,
}

/// Listing options for [`crate::storage::StorageBucket::list`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListOptions {
    pub limit: u32,
    pub offset: u32,
    #[serde(rename = "sortBy")]
    pub sort_by: SortBy,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            limit: 100,
            offset: 0,
            sort_by: SortBy {
                column: SortColumn::Name,
                order: "asc".to_string(),
            },
        }
    }
}

/// Request body of the object listing endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListRequest {
    pub prefix: String,
    #[serde(flatten)]
    pub options: ListOptions,
}

/// Upload result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadResponse {
    /// `<bucket>/<path>`
    #[serde(rename = "Key", alias = "key")]
    pub key: String,
}
