use tokio::sync::{mpsc, watch};

use crate::ai::AiClient;
use crate::common::{DashboardCommand, DashboardEvent, Message, SyncState};
use crate::matrix::{Homeserver, MatrixSession};

/// Background worker owning the Matrix session and the AI client. The UI
/// talks to it only through commands and events.
pub struct DashboardClient<H> {
    event_sender: mpsc::Sender<DashboardEvent>,
    command_receiver: mpsc::Receiver<DashboardCommand>,
    session: MatrixSession<H>,
    ai: AiClient,
    backfill_limit: u32,
    live_sender: mpsc::UnboundedSender<Message>,
    live_receiver: mpsc::UnboundedReceiver<Message>,
}

impl<H: Homeserver + 'static> DashboardClient<H> {
    pub fn new(
        event_sender: mpsc::Sender<DashboardEvent>,
        command_receiver: mpsc::Receiver<DashboardCommand>,
        session: MatrixSession<H>,
        ai: AiClient,
        backfill_limit: u32,
    ) -> Self {
        let (live_sender, live_receiver) = mpsc::unbounded_channel();
        Self {
            event_sender,
            command_receiver,
            session,
            ai,
            backfill_limit,
            live_sender,
            live_receiver,
        }
    }

    /// Runs until the UI drops its command sender.
    pub async fn run(mut self) {
        let mut sync_state: watch::Receiver<SyncState> = self.session.subscribe_sync_state();
        log::info!("Dashboard worker started");

        self.check_health();

        loop {
            tokio::select! {
                command = self.command_receiver.recv() => {
                    match command {
                        Some(command) => self.handle_command(command).await,
                        None => break,
                    }
                }
                Some(message) = self.live_receiver.recv() => {
                    self.emit(DashboardEvent::MessageReceived(message)).await;
                }
                Ok(()) = sync_state.changed() => {
                    let state = sync_state.borrow_and_update().clone();
                    self.emit(DashboardEvent::SyncStateChanged(state)).await;
                }
            }
        }

        self.session.logout();
        log::info!("Dashboard worker stopped");
    }

    async fn handle_command(&mut self, command: DashboardCommand) {
        match command {
            DashboardCommand::Login { username, password } => {
                self.handle_login(&username, &password).await;
            }
            DashboardCommand::SelectRoom(room_id) => {
                self.handle_select_room(room_id).await;
            }
            DashboardCommand::LoadOlder(room_id) => {
                match self.session.load_older(&room_id, self.backfill_limit).await {
                    Ok(_) => {
                        let messages = self.session.messages(&room_id);
                        self.emit(DashboardEvent::OlderMessagesLoaded { room_id, messages })
                            .await;
                    }
                    Err(err) => {
                        log::warn!("Failed to load older messages for {room_id}: {err}");
                        self.emit(DashboardEvent::LoadOlderFailed(format!(
                            "Could not load older messages: {err}"
                        )))
                        .await;
                    }
                }
            }
            DashboardCommand::RefreshRooms => {
                let rooms = self.session.rooms();
                self.emit(DashboardEvent::RoomsLoaded(rooms)).await;
            }
            DashboardCommand::CheckHealth => self.check_health(),
            DashboardCommand::Logout => {
                self.session.logout();
                self.reset_live_channel();
                self.emit(DashboardEvent::LoggedOut).await;
            }
        }
    }

    async fn handle_login(&mut self, username: &str, password: &str) {
        match self.session.login(username, password).await {
            Ok(user_id) => {
                self.reset_live_channel();
                let live_sender = self.live_sender.clone();
                self.session.on_new_message(move |message| {
                    if let Err(err) = live_sender.send(message) {
                        log::warn!("Dropping live message for a closed session: {err}");
                    }
                });

                self.emit(DashboardEvent::LoggedIn { user_id }).await;
                let rooms = self.session.rooms();
                self.emit(DashboardEvent::RoomsLoaded(rooms)).await;
            }
            Err(err) => {
                log::warn!("Login failed: {err}");
                self.emit(DashboardEvent::LoginFailed(err.to_string())).await;
            }
        }
    }

    async fn handle_select_room(&mut self, room_id: String) {
        let messages = self.session.messages(&room_id);
        self.emit(DashboardEvent::MessagesLoaded {
            room_id: room_id.clone(),
            messages: messages.clone(),
        })
        .await;

        if messages.is_empty() {
            return;
        }

        let ai = self.ai.clone();
        let event_sender = self.event_sender.clone();
        tokio::spawn(async move {
            let analysis = ai.analyze_room(&room_id, &messages).await;
            if let Err(err) = event_sender
                .send(DashboardEvent::AnalysisReady(analysis))
                .await
            {
                log::warn!("Failed to deliver AI analysis to UI: {err}");
            }
        });
    }

    fn check_health(&self) {
        let ai = self.ai.clone();
        let event_sender = self.event_sender.clone();
        tokio::spawn(async move {
            let health = ai.health().await;
            let status = match health.get("status").and_then(|s| s.as_str()) {
                Some("error") | None => None,
                Some(status) => Some(status.to_string()),
            };
            if let Err(err) = event_sender.send(DashboardEvent::AiHealth(status)).await {
                log::warn!("Failed to deliver AI health to UI: {err}");
            }
        });
    }

    /// Swap in a fresh live channel so messages queued by a previous session
    /// are dropped with the old receiver.
    fn reset_live_channel(&mut self) {
        let (live_sender, live_receiver) = mpsc::unbounded_channel();
        self.live_sender = live_sender;
        self.live_receiver = live_receiver;
    }

    async fn emit(&self, event: DashboardEvent) {
        if let Err(err) = self.event_sender.send(event).await {
            log::warn!("Failed to notify UI: {err}");
        }
    }
}

pub fn spawn_worker<H: Homeserver + 'static>(
    client: DashboardClient<H>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(client.run())
}
