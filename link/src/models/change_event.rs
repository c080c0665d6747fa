use serde::{Deserialize, Serialize};

use super::row::{row_identity, Row};
use serde_json::Value as JsonValue;

/// Kind of row change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// Row change pushed by a realtime channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    Insert {
        schema: String,
        table: String,
        /// The inserted row
        row: Row,
        commit_timestamp: Option<String>,
    },

    Update {
        schema: String,
        table: String,
        /// Current row values
        row: Row,
        /// Previous values; often only the primary key unless the table has
        /// full replica identity
        old_row: Row,
        commit_timestamp: Option<String>,
    },

    Delete {
        schema: String,
        table: String,
        /// Previous values (at least the primary key)
        old_row: Row,
        commit_timestamp: Option<String>,
    },
}

impl ChangeEvent {
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::Insert { .. } => ChangeKind::Insert,
            Self::Update { .. } => ChangeKind::Update,
            Self::Delete { .. } => ChangeKind::Delete,
        }
    }

    pub fn schema(&self) -> &str {
        match self {
            Self::Insert { schema, .. } | Self::Update { schema, .. } | Self::Delete { schema, .. } => {
                schema
            },
        }
    }

    pub fn table(&self) -> &str {
        match self {
            Self::Insert { table, .. } | Self::Update { table, .. } | Self::Delete { table, .. } => table,
        }
    }

    /// Identity of the affected row: new row for insert/update, old row for delete.
    pub fn identity<'a>(&'a self, key: &str) -> Option<&'a JsonValue> {
        match self {
            Self::Insert { row, .. } | Self::Update { row, .. } => row_identity(row, key),
            Self::Delete { old_row, .. } => row_identity(old_row, key),
        }
    }
}
