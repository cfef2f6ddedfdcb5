use std::collections::HashMap;

use crate::common::{AiAnalysis, DashboardCommand, DashboardEvent, Message, Room, SyncState};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tab {
    #[default]
    Messages,
    Ai,
}

/// View state of the dashboard. Every mutation goes through these methods.
#[derive(Debug, Default)]
pub struct AppState {
    pub connected: bool,
    pub user_id: Option<String>,
    pub rooms: Vec<Room>,
    pub messages_by_room: HashMap<String, Vec<Message>>,
    pub selected_room: Option<String>,
    pub active_tab: Tab,
    pub ai_analysis: Option<AiAnalysis>,
    pub loading: bool,
    pub analyzing: bool,
    pub sync_state: SyncState,
    /// `Some(status)` after a successful health probe.
    pub ai_health: Option<String>,

    pub username_input: String,
    pub password_input: String,
    pub error: Option<String>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the login form and build the command for the worker.
    pub fn submit_login(&mut self) -> Option<DashboardCommand> {
        self.error = None;

        if self.username_input.is_empty() || self.password_input.is_empty() {
            self.error = Some("Username and password required".to_string());
            return None;
        }

        self.loading = true;
        Some(DashboardCommand::Login {
            username: self.username_input.clone(),
            password: self.password_input.clone(),
        })
    }

    pub fn select_room(&mut self, room_id: String) -> DashboardCommand {
        self.error = None;
        self.selected_room = Some(room_id.clone());
        self.loading = true;
        DashboardCommand::SelectRoom(room_id)
    }

    /// Apply a worker event. Returns a follow-up command when the event
    /// implies one (the first room is selected once rooms arrive).
    pub fn apply(&mut self, event: DashboardEvent) -> Option<DashboardCommand> {
        if !self.connected && event.is_session_scoped() {
            log::debug!("Ignoring session event while logged out");
            return None;
        }

        match event {
            DashboardEvent::LoggedIn { user_id } => {
                self.loading = false;
                self.connected = true;
                self.user_id = Some(user_id);
                self.password_input.clear();
                None
            }
            DashboardEvent::LoginFailed(message) => {
                self.loading = false;
                self.error = Some(if message.is_empty() {
                    "Login failed".to_string()
                } else {
                    message
                });
                None
            }
            DashboardEvent::RoomsLoaded(rooms) => {
                self.rooms = rooms;
                let first = match self.selected_room {
                    None => self.rooms.first().map(|room| room.id.clone()),
                    Some(_) => None,
                };
                first.map(|room_id| self.select_room(room_id))
            }
            DashboardEvent::MessagesLoaded { room_id, messages } => {
                if self.selected_room.as_deref() == Some(room_id.as_str()) {
                    self.loading = false;
                    self.analyzing = !messages.is_empty();
                }
                self.messages_by_room.insert(room_id, messages);
                None
            }
            DashboardEvent::OlderMessagesLoaded { room_id, messages } => {
                self.error = None;
                self.messages_by_room.insert(room_id, messages);
                None
            }
            DashboardEvent::LoadOlderFailed(message) => {
                self.error = Some(message);
                None
            }
            DashboardEvent::MessageReceived(message) => {
                self.push_message(message);
                None
            }
            DashboardEvent::AnalysisReady(analysis) => {
                if self.selected_room.as_deref() == Some(analysis.room_id.as_str()) {
                    self.analyzing = false;
                }
                self.ai_analysis = Some(analysis);
                None
            }
            DashboardEvent::SyncStateChanged(state) => {
                self.sync_state = state;
                None
            }
            DashboardEvent::AiHealth(status) => {
                self.ai_health = status;
                None
            }
            DashboardEvent::LoggedOut => {
                self.reset_session();
                None
            }
        }
    }

    pub fn push_message(&mut self, message: Message) {
        self.messages_by_room
            .entry(message.room_id.clone())
            .or_default()
            .push(message);
    }

    pub fn active_messages(&self) -> &[Message] {
        self.selected_room
            .as_ref()
            .and_then(|room_id| self.messages_by_room.get(room_id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The cached analysis, but only if it belongs to the selected room.
    pub fn visible_analysis(&self) -> Option<&AiAnalysis> {
        self.ai_analysis
            .as_ref()
            .filter(|analysis| self.selected_room.as_deref() == Some(analysis.room_id.as_str()))
    }

    /// Drop everything tied to the signed-in session; keep the username.
    pub fn reset_session(&mut self) {
        self.connected = false;
        self.user_id = None;
        self.rooms.clear();
        self.messages_by_room.clear();
        self.selected_room = None;
        self.ai_analysis = None;
        self.loading = false;
        self.analyzing = false;
        self.active_tab = Tab::Messages;
        self.sync_state = SyncState::Stopped;
        self.error = None;
    }
}
