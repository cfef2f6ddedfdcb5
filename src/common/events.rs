use super::types::{AiAnalysis, Message, Room, SyncState};

/// Events sent from the dashboard worker up to the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardEvent {
    LoggedIn { user_id: String },
    LoginFailed(String),
    RoomsLoaded(Vec<Room>),
    MessagesLoaded {
        room_id: String,
        messages: Vec<Message>,
    },
    /// Timeline after a "Load older" page; does not trigger an analysis.
    OlderMessagesLoaded {
        room_id: String,
        messages: Vec<Message>,
    },
    LoadOlderFailed(String),
    MessageReceived(Message),
    AnalysisReady(AiAnalysis),
    SyncStateChanged(SyncState),
    /// `None` when the health probe failed.
    AiHealth(Option<String>),
    LoggedOut,
}

impl DashboardEvent {
    /// Events that only make sense while a session is signed in.
    pub fn is_session_scoped(&self) -> bool {
        matches!(
            self,
            DashboardEvent::RoomsLoaded(_)
                | DashboardEvent::MessagesLoaded { .. }
                | DashboardEvent::OlderMessagesLoaded { .. }
                | DashboardEvent::LoadOlderFailed(_)
                | DashboardEvent::MessageReceived(_)
                | DashboardEvent::AnalysisReady(_)
        )
    }
}
