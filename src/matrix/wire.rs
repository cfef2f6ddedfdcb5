//! Client-server API request and response bodies.
//!
//! Only the fields the dashboard reads are modelled; everything else in the
//! homeserver's JSON is ignored.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MESSAGE_EVENT: &str = "m.room.message";
pub const ROOM_NAME_EVENT: &str = "m.room.name";
pub const CANONICAL_ALIAS_EVENT: &str = "m.room.canonical_alias";

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub identifier: UserIdentifier<'a>,
    pub password: &'a str,
    pub initial_device_display_name: &'static str,
}

#[derive(Debug, Serialize)]
pub struct UserIdentifier<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub user: &'a str,
}

impl<'a> LoginRequest<'a> {
    pub fn password(user_id: &'a str, password: &'a str) -> Self {
        Self {
            kind: "m.login.password",
            identifier: UserIdentifier {
                kind: "m.id.user",
                user: user_id,
            },
            password,
            initial_device_display_name: "Matrix AI Dashboard",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub user_id: String,
    pub access_token: String,
    #[serde(default)]
    pub device_id: Option<String>,
}

/// Standard error body for non-2xx responses.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub errcode: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Parameters of one `/sync` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncRequest {
    pub since: Option<String>,
    pub timeout_ms: u64,
    /// Timeline limit for the inline filter; set on the initial sync only.
    pub timeline_limit: Option<u32>,
}

impl SyncRequest {
    pub fn filter(&self) -> Option<String> {
        self.timeline_limit.map(|limit| {
            serde_json::json!({ "room": { "timeline": { "limit": limit } } }).to_string()
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncResponse {
    pub next_batch: String,
    #[serde(default)]
    pub rooms: SyncRooms,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncRooms {
    #[serde(default)]
    pub join: HashMap<String, JoinedRoom>,
    #[serde(default)]
    pub leave: HashMap<String, LeftRoom>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JoinedRoom {
    #[serde(default)]
    pub state: EventList,
    #[serde(default)]
    pub timeline: TimelineChunk,
    #[serde(default)]
    pub unread_notifications: UnreadNotifications,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeftRoom {}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventList {
    #[serde(default)]
    pub events: Vec<RoomEvent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimelineChunk {
    #[serde(default)]
    pub events: Vec<RoomEvent>,
    /// More events exist between the previous sync and this chunk.
    #[serde(default)]
    pub limited: bool,
    #[serde(default)]
    pub prev_batch: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnreadNotifications {
    #[serde(default)]
    pub notification_count: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RoomEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub origin_server_ts: i64,
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub state_key: Option<String>,
}

impl RoomEvent {
    pub fn is_message(&self) -> bool {
        self.event_type == MESSAGE_EVENT
    }

    pub fn content_str(&self, key: &str) -> Option<&str> {
        self.content.get(key).and_then(Value::as_str)
    }
}

/// Response of `GET /rooms/{roomId}/messages`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub chunk: Vec<RoomEvent>,
    /// Token to continue paginating; absent when history is exhausted.
    #[serde(default)]
    pub end: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_request_uses_password_flow_with_user_identifier() {
        let body = serde_json::to_value(LoginRequest::password("@alice:example.org", "pw")).unwrap();

        assert_eq!(body["type"], "m.login.password");
        assert_eq!(body["identifier"]["type"], "m.id.user");
        assert_eq!(body["identifier"]["user"], "@alice:example.org");
        assert_eq!(body["password"], "pw");
    }

    #[test]
    fn sync_response_tolerates_missing_sections() {
        let response: SyncResponse = serde_json::from_str(
            r#"{
                "next_batch": "s1",
                "rooms": {
                    "join": {
                        "!a:example.org": {
                            "timeline": { "events": [
                                { "type": "m.room.message", "event_id": "$1", "sender": "@bob:example.org",
                                  "origin_server_ts": 1700000000000, "content": { "msgtype": "m.text", "body": "hi" } }
                            ] }
                        }
                    }
                },
                "presence": { "events": [] }
            }"#,
        )
        .unwrap();

        let room = &response.rooms.join["!a:example.org"];
        assert_eq!(response.next_batch, "s1");
        assert!(!room.timeline.limited);
        assert_eq!(room.timeline.events[0].content_str("body"), Some("hi"));
        assert!(room.state.events.is_empty());
        assert_eq!(room.unread_notifications.notification_count, None);
    }

    #[test]
    fn filter_only_present_with_timeline_limit() {
        let initial = SyncRequest {
            since: None,
            timeout_ms: 0,
            timeline_limit: Some(30),
        };
        let filter: Value = serde_json::from_str(&initial.filter().unwrap()).unwrap();
        assert_eq!(filter["room"]["timeline"]["limit"], 30);

        assert!(SyncRequest::default().filter().is_none());
    }
}
