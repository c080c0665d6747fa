use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::change_event::ChangeKind;
use super::change_filter::ChangeFilter;
use super::row::Row;

pub const EVENT_JOIN: &str = "phx_join";
pub const EVENT_LEAVE: &str = "phx_leave";
pub const EVENT_REPLY: &str = "phx_reply";
pub const EVENT_ERROR: &str = "phx_error";
pub const EVENT_CLOSE: &str = "phx_close";
pub const EVENT_HEARTBEAT: &str = "heartbeat";
pub const EVENT_POSTGRES_CHANGES: &str = "postgres_changes";
pub const EVENT_SYSTEM: &str = "system";
pub const TOPIC_PHOENIX: &str = "phoenix";

/// Envelope of every frame on the realtime socket (Phoenix v1 JSON serializer).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: JsonValue,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
}

impl PhoenixMessage {
    pub fn new(
        topic: impl Into<String>,
        event: impl Into<String>,
        payload: JsonValue,
        reference: impl Into<String>,
    ) -> Self {
        Self {
            topic: topic.into(),
            event: event.into(),
            payload,
            reference: Some(reference.into()),
        }
    }

    pub fn heartbeat(reference: impl Into<String>) -> Self {
        Self::new(TOPIC_PHOENIX, EVENT_HEARTBEAT, JsonValue::Object(Default::default()), reference)
    }

    pub fn leave(topic: impl Into<String>, reference: impl Into<String>) -> Self {
        Self::new(topic, EVENT_LEAVE, JsonValue::Object(Default::default()), reference)
    }
}

/// Channel topic for a channel name
pub fn channel_topic(name: &str) -> String {
    format!("realtime:{}", name)
}

/// One `postgres_changes` binding inside a join request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostgresChangesBinding {
    pub event: String,
    pub schema: String,
    pub table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JoinConfig {
    pub postgres_changes: Vec<PostgresChangesBinding>,
}

/// Payload of a `phx_join` request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JoinPayload {
    pub config: JoinConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl JoinPayload {
    pub fn for_filter(
        filter: &ChangeFilter,
        access_token: Option<String>,
    ) -> Result<Self, crate::error::AtriumLinkError> {
        let row_filter = match &filter.filter {
            Some(f) => Some(f.to_realtime_filter()?),
            None => None,
        };
        Ok(Self {
            config: JoinConfig {
                postgres_changes: vec![PostgresChangesBinding {
                    event: filter.event.as_str().to_string(),
                    schema: filter.schema.clone(),
                    table: filter.table.clone(),
                    filter: row_filter,
                }],
            },
            access_token,
        })
    }
}

/// Payload of a `phx_reply` frame
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplyPayload {
    pub status: String,
    #[serde(default)]
    pub response: JsonValue,
}

impl ReplyPayload {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    /// Reason text of an error reply
    pub fn reason(&self) -> String {
        self.response
            .get("reason")
            .and_then(JsonValue::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| self.response.to_string())
    }
}

/// Payload of a `postgres_changes` frame
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostgresChangesPayload {
    pub data: PostgresChangeData,
    #[serde(default)]
    pub ids: Vec<JsonValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostgresChangeData {
    pub schema: String,
    pub table: String,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    #[serde(default)]
    pub commit_timestamp: Option<String>,
    #[serde(default)]
    pub record: Option<Row>,
    #[serde(default)]
    pub old_record: Option<Row>,
    #[serde(default)]
    pub errors: Option<JsonValue>,
}
