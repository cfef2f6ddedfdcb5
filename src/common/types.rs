use serde::{Deserialize, Serialize};

/// A joined room as shown in the sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub name: String,
    pub unread_count: u64,
}

/// Domain model for one chat message. Belongs to exactly one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub room_id: String,
    pub sender: String,
    pub text: String,
    /// Local display time, already formatted.
    pub timestamp: String,
}

/// Merged result of the summarize / sentiment / emotion calls for a room.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiAnalysis {
    pub room_id: String,
    pub summary: Option<String>,
    pub sentiment: Option<String>,
    pub emotion: Option<String>,
    pub message_count: usize,
    pub errors: Vec<String>,
}

/// Lifecycle of the background sync loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SyncState {
    #[default]
    Stopped,
    /// Initial sync applied; rooms and timelines are usable.
    Prepared,
    Syncing,
    Error(String),
}

impl SyncState {
    pub fn label(&self) -> &str {
        match self {
            SyncState::Stopped => "stopped",
            SyncState::Prepared => "prepared",
            SyncState::Syncing => "syncing",
            SyncState::Error(_) => "error",
        }
    }
}
