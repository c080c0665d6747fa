use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::change_event::ChangeKind;
use super::row_filter::RowFilter;
use crate::error::AtriumLinkError;

pub const DEFAULT_SCHEMA: &str = "public";

/// Which row-change events a channel delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EventFilter {
    #[default]
    #[serde(rename = "*")]
    All,
    #[serde(rename = "INSERT")]
    Insert,
    #[serde(rename = "UPDATE")]
    Update,
    #[serde(rename = "DELETE")]
    Delete,
}

impl EventFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventFilter::All => "*",
            EventFilter::Insert => "INSERT",
            EventFilter::Update => "UPDATE",
            EventFilter::Delete => "DELETE",
        }
    }

    pub fn matches(&self, kind: ChangeKind) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Insert => kind == ChangeKind::Insert,
            EventFilter::Update => kind == ChangeKind::Update,
            EventFilter::Delete => kind == ChangeKind::Delete,
        }
    }
}

impl fmt::Display for EventFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventFilter {
    type Err = AtriumLinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "*" | "ALL" => Ok(EventFilter::All),
            "INSERT" => Ok(EventFilter::Insert),
            "UPDATE" => Ok(EventFilter::Update),
            "DELETE" => Ok(EventFilter::Delete),
            other => Err(AtriumLinkError::ValidationError(format!(
                "Unknown event filter '{}' (expected *, insert, update or delete)",
                other
            ))),
        }
    }
}

/// Scope of a realtime channel: `(schema, table, event filter, row filter)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeFilter {
    pub event: EventFilter,
    pub schema: String,
    pub table: String,
    pub filter: Option<RowFilter>,
}

impl ChangeFilter {
    /// All events for `public.<table>`.
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            event: EventFilter::All,
            schema: DEFAULT_SCHEMA.to_string(),
            table: table.into(),
            filter: None,
        }
    }

    pub fn with_event(mut self, event: EventFilter) -> Self {
        self.event = event;
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    pub fn with_filter(mut self, filter: RowFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Whether an event for `(schema, table, kind)` belongs to this scope.
    pub fn accepts(&self, schema: &str, table: &str, kind: ChangeKind) -> bool {
        self.schema == schema && self.table == table && self.event.matches(kind)
    }
}
