use std::collections::HashMap;

use chrono::{DateTime, Local};

use crate::common::{Message, Room};

use super::wire::{
    CANONICAL_ALIAS_EVENT, MessagesResponse, ROOM_NAME_EVENT, RoomEvent, SyncResponse,
};

/// Which end of the timeline an event was added to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineDirection {
    /// Appended by sync: newly arrived.
    Forward,
    /// Prepended by backward pagination: historical backfill.
    Backward,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineUpdate {
    pub message: Message,
    pub direction: TimelineDirection,
}

#[derive(Debug, Default)]
struct RoomTimeline {
    name: Option<String>,
    canonical_alias: Option<String>,
    unread: u64,
    events: Vec<RoomEvent>,
    /// Pagination token pointing before the oldest buffered event; `None`
    /// once backward pagination reached the start of the room.
    prev_batch: Option<String>,
}

impl RoomTimeline {
    fn apply_state(&mut self, event: &RoomEvent) {
        match event.event_type.as_str() {
            ROOM_NAME_EVENT => {
                self.name = event
                    .content_str("name")
                    .filter(|name| !name.is_empty())
                    .map(str::to_string);
            }
            CANONICAL_ALIAS_EVENT => {
                self.canonical_alias = event
                    .content_str("alias")
                    .filter(|alias| !alias.is_empty())
                    .map(str::to_string);
            }
            _ => {}
        }
    }

    fn display_name(&self, room_id: &str) -> String {
        self.name
            .clone()
            .or_else(|| self.canonical_alias.clone())
            .unwrap_or_else(|| room_id.to_string())
    }
}

/// Rooms and live timelines accumulated from sync responses.
#[derive(Debug, Default)]
pub struct RoomStore {
    rooms: HashMap<String, RoomTimeline>,
}

impl RoomStore {
    pub fn apply_sync(&mut self, response: &SyncResponse) -> Vec<TimelineUpdate> {
        let mut updates = Vec::new();

        for room_id in response.rooms.leave.keys() {
            if self.rooms.remove(room_id).is_some() {
                log::debug!("Left room {room_id}");
            }
        }

        for (room_id, joined) in &response.rooms.join {
            let is_new = !self.rooms.contains_key(room_id);
            let room = self.rooms.entry(room_id.clone()).or_default();

            for event in &joined.state.events {
                room.apply_state(event);
            }

            if let Some(count) = joined.unread_notifications.notification_count {
                room.unread = count;
            }

            // A non-limited chunk continues the buffer, so its token would point
            // after events already held; only a fresh room or a gap takes it.
            let timeline = &joined.timeline;
            if timeline.limited {
                // Gap since the last sync: the buffered events are no longer contiguous.
                room.events.clear();
                room.prev_batch = timeline.prev_batch.clone();
            } else if is_new {
                room.prev_batch = timeline.prev_batch.clone();
            }

            for event in &timeline.events {
                if event.state_key.is_some() {
                    room.apply_state(event);
                }
                if let Some(message) = to_message(room_id, event) {
                    updates.push(TimelineUpdate {
                        message,
                        direction: TimelineDirection::Forward,
                    });
                }
                room.events.push(event.clone());
            }
        }

        updates
    }

    /// Prepend a `/messages?dir=b` chunk (newest first) to the room's timeline.
    /// A page without `end` marks the history as exhausted.
    pub fn prepend_backfill(&mut self, room_id: &str, page: &MessagesResponse) -> Vec<TimelineUpdate> {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return Vec::new();
        };

        let mut older: Vec<RoomEvent> = page.chunk.iter().rev().cloned().collect();
        let updates = older
            .iter()
            .filter_map(|event| to_message(room_id, event))
            .map(|message| TimelineUpdate {
                message,
                direction: TimelineDirection::Backward,
            })
            .collect();

        older.append(&mut room.events);
        room.events = older;
        room.prev_batch = page.end.clone();

        updates
    }

    pub fn prev_batch(&self, room_id: &str) -> Option<&str> {
        self.rooms
            .get(room_id)
            .and_then(|room| room.prev_batch.as_deref())
    }

    pub fn rooms(&self) -> Vec<Room> {
        let mut rooms: Vec<Room> = self
            .rooms
            .iter()
            .map(|(id, room)| Room {
                id: id.clone(),
                name: room.display_name(id),
                unread_count: room.unread,
            })
            .collect();
        rooms.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        rooms
    }

    pub fn messages(&self, room_id: &str) -> Vec<Message> {
        self.rooms
            .get(room_id)
            .map(|room| {
                room.events
                    .iter()
                    .filter_map(|event| to_message(room_id, event))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.rooms.clear();
    }
}

pub fn to_message(room_id: &str, event: &RoomEvent) -> Option<Message> {
    if !event.is_message() {
        return None;
    }

    Some(Message {
        id: event.event_id.clone().unwrap_or_default(),
        room_id: room_id.to_string(),
        sender: event.sender.clone(),
        text: event.content_str("body").unwrap_or_default().to_string(),
        timestamp: format_timestamp(event.origin_server_ts),
    })
}

fn format_timestamp(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|utc| {
            utc.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sync(value: serde_json::Value) -> SyncResponse {
        serde_json::from_value(value).unwrap()
    }

    fn message_event(id: &str, body: &str) -> serde_json::Value {
        json!({
            "type": "m.room.message",
            "event_id": id,
            "sender": "@bob:example.org",
            "origin_server_ts": 1_700_000_000_000_i64,
            "content": { "msgtype": "m.text", "body": body }
        })
    }

    #[test]
    fn rooms_resolve_name_alias_then_id() {
        let mut store = RoomStore::default();
        store.apply_sync(&sync(json!({
            "next_batch": "s1",
            "rooms": { "join": {
                "!named:example.org": {
                    "state": { "events": [
                        { "type": "m.room.name", "state_key": "", "content": { "name": "General" } }
                    ] },
                    "unread_notifications": { "notification_count": 3 }
                },
                "!alias:example.org": {
                    "state": { "events": [
                        { "type": "m.room.canonical_alias", "state_key": "", "content": { "alias": "#dev:example.org" } }
                    ] }
                },
                "!bare:example.org": {}
            } }
        })));

        let rooms = store.rooms();
        let names: Vec<&str> = rooms.iter().map(|room| room.name.as_str()).collect();
        assert_eq!(names, vec!["!bare:example.org", "#dev:example.org", "General"]);
        assert_eq!(rooms[2].unread_count, 3);
        assert_eq!(rooms[0].unread_count, 0);
    }

    #[test]
    fn messages_keep_only_message_events_and_default_text() {
        let mut store = RoomStore::default();
        store.apply_sync(&sync(json!({
            "next_batch": "s1",
            "rooms": { "join": { "!r:example.org": { "timeline": { "events": [
                message_event("$1", "hello"),
                { "type": "m.room.member", "event_id": "$2", "sender": "@bob:example.org",
                  "state_key": "@bob:example.org", "content": { "membership": "join" } },
                { "type": "m.room.message", "event_id": "$3", "sender": "@carol:example.org",
                  "content": { "msgtype": "m.image" } }
            ] } } } }
        })));

        let messages = store.messages("!r:example.org");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "hello");
        assert_eq!(messages[0].room_id, "!r:example.org");
        assert_eq!(messages[1].id, "$3");
        assert_eq!(messages[1].text, "");
        assert!(!messages[0].timestamp.is_empty());
    }

    #[test]
    fn unknown_room_has_no_messages() {
        let store = RoomStore::default();
        assert!(store.messages("!missing:example.org").is_empty());
    }

    #[test]
    fn limited_timeline_resets_buffer() {
        let mut store = RoomStore::default();
        store.apply_sync(&sync(json!({
            "next_batch": "s1",
            "rooms": { "join": { "!r:example.org": { "timeline": {
                "events": [message_event("$1", "old")], "prev_batch": "p1"
            } } } }
        })));
        store.apply_sync(&sync(json!({
            "next_batch": "s2",
            "rooms": { "join": { "!r:example.org": { "timeline": {
                "events": [message_event("$9", "new")], "limited": true, "prev_batch": "p9"
            } } } }
        })));

        let ids: Vec<String> = store
            .messages("!r:example.org")
            .into_iter()
            .map(|message| message.id)
            .collect();
        assert_eq!(ids, vec!["$9"]);
        assert_eq!(store.prev_batch("!r:example.org"), Some("p9"));
    }

    #[test]
    fn left_rooms_are_dropped() {
        let mut store = RoomStore::default();
        store.apply_sync(&sync(json!({
            "next_batch": "s1",
            "rooms": { "join": { "!r:example.org": {} } }
        })));
        store.apply_sync(&sync(json!({
            "next_batch": "s2",
            "rooms": { "leave": { "!r:example.org": { "timeline": { "events": [] } } } }
        })));

        assert!(store.rooms().is_empty());
    }

    #[test]
    fn backfill_is_prepended_oldest_first_and_tagged_backward() {
        let mut store = RoomStore::default();
        store.apply_sync(&sync(json!({
            "next_batch": "s1",
            "rooms": { "join": { "!r:example.org": { "timeline": {
                "events": [message_event("$3", "three")], "prev_batch": "p3"
            } } } }
        })));

        let page: MessagesResponse = serde_json::from_value(json!({
            "chunk": [message_event("$2", "two"), message_event("$1", "one")],
            "start": "p3",
            "end": "p1"
        }))
        .unwrap();
        let updates = store.prepend_backfill("!r:example.org", &page);

        assert_eq!(updates.len(), 2);
        assert!(updates
            .iter()
            .all(|update| update.direction == TimelineDirection::Backward));

        let texts: Vec<String> = store
            .messages("!r:example.org")
            .into_iter()
            .map(|message| message.text)
            .collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
        assert_eq!(store.prev_batch("!r:example.org"), Some("p1"));
    }

    #[test]
    fn exhausted_history_stays_exhausted_across_syncs() {
        let mut store = RoomStore::default();
        store.apply_sync(&sync(json!({
            "next_batch": "s1",
            "rooms": { "join": { "!r:example.org": { "timeline": {
                "events": [message_event("$2", "two")], "prev_batch": "p2"
            } } } }
        })));

        let last_page: MessagesResponse = serde_json::from_value(json!({
            "chunk": [message_event("$1", "one")]
        }))
        .unwrap();
        store.prepend_backfill("!r:example.org", &last_page);
        assert_eq!(store.prev_batch("!r:example.org"), None);

        store.apply_sync(&sync(json!({
            "next_batch": "s2",
            "rooms": { "join": { "!r:example.org": { "timeline": {
                "events": [message_event("$3", "three")], "prev_batch": "p-after-2"
            } } } }
        })));

        assert_eq!(store.prev_batch("!r:example.org"), None);
        assert_eq!(store.messages("!r:example.org").len(), 3);
    }

    #[test]
    fn non_limited_sync_keeps_existing_token() {
        let mut store = RoomStore::default();
        store.apply_sync(&sync(json!({
            "next_batch": "s1",
            "rooms": { "join": { "!r:example.org": { "timeline": {
                "events": [message_event("$1", "one")], "prev_batch": "p1"
            } } } }
        })));
        store.apply_sync(&sync(json!({
            "next_batch": "s2",
            "rooms": { "join": { "!r:example.org": { "timeline": {
                "events": [message_event("$2", "two")], "prev_batch": "p-after-1"
            } } } }
        })));

        assert_eq!(store.prev_batch("!r:example.org"), Some("p1"));
    }
}
