//! Phoenix channel frames used by the realtime service
//!
//! Every frame is a JSON object `{topic, event, payload, ref, join_ref}`.
//! Row changes arrive as `postgres_changes` events whose `payload.data`
//! carries the changed row under `record` (older servers: `new`).

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::data::Record;

pub const SCHEMA: &str = "public";

pub const EVENT_JOIN: &str = "phx_join";
pub const EVENT_LEAVE: &str = "phx_leave";
pub const EVENT_REPLY: &str = "phx_reply";
pub const EVENT_ERROR: &str = "phx_error";
pub const EVENT_CLOSE: &str = "phx_close";
pub const EVENT_HEARTBEAT: &str = "heartbeat";
pub const EVENT_CHANGES: &str = "postgres_changes";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(rename = "ref", default)]
    pub msg_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_ref: Option<String>,
}

/// Channel topic for a table in the public schema
pub fn topic_for(table: &str) -> String {
    format!("realtime:{}:{}", SCHEMA, table)
}

impl PhoenixMessage {
    /// Join a table's change feed for all event kinds
    pub fn join(table: &str, access_token: &str, msg_ref: &str) -> Self {
        Self {
            topic: topic_for(table),
            event: EVENT_JOIN.to_string(),
            payload: json!({
                "config": {
                    "broadcast": { "ack": false, "self": false },
                    "presence": { "key": "" },
                    "postgres_changes": [
                        { "event": "*", "schema": SCHEMA, "table": table }
                    ]
                },
                "access_token": access_token
            }),
            msg_ref: Some(msg_ref.to_string()),
            join_ref: Some(msg_ref.to_string()),
        }
    }

    pub fn leave(topic: &str, msg_ref: &str, join_ref: &str) -> Self {
        Self {
            topic: topic.to_string(),
            event: EVENT_LEAVE.to_string(),
            payload: json!({}),
            msg_ref: Some(msg_ref.to_string()),
            join_ref: Some(join_ref.to_string()),
        }
    }

    pub fn heartbeat(msg_ref: &str) -> Self {
        Self {
            topic: "phoenix".to_string(),
            event: EVENT_HEARTBEAT.to_string(),
            payload: json!({}),
            msg_ref: Some(msg_ref.to_string()),
            join_ref: None,
        }
    }

    /// `status` of a `phx_reply`
    pub fn reply_status(&self) -> Option<&str> {
        if self.event != EVENT_REPLY {
            return None;
        }
        self.payload.get("status").and_then(|s| s.as_str())
    }

    /// Row change carried by a `postgres_changes` frame
    pub fn change(&self) -> Option<RowChange> {
        if self.event != EVENT_CHANGES {
            return None;
        }
        let data = self.payload.get("data")?;
        let kind = data
            .get("type")
            .or_else(|| data.get("eventType"))
            .and_then(|t| t.as_str())
            .and_then(ChangeKind::parse)?;
        let record = data
            .get("record")
            .or_else(|| data.get("new"))
            .and_then(|r| r.as_object())
            .filter(|r| !r.is_empty())
            .cloned();

        Some(RowChange { kind, record })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "INSERT" => Some(ChangeKind::Insert),
            "UPDATE" => Some(ChangeKind::Update),
            "DELETE" => Some(ChangeKind::Delete),
            _ => None,
        }
    }
}

/// One changed row; `record` is empty for deletes
#[derive(Debug, Clone, PartialEq)]
pub struct RowChange {
    pub kind: ChangeKind,
    pub record: Option<Record>,
}
