use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::common::{Message, Room, SyncState};
use crate::error::SessionError;

use super::homeserver::Homeserver;
use super::store::{RoomStore, TimelineDirection, TimelineUpdate};
use super::wire::SyncRequest;

type MessageListener = Arc<dyn Fn(Message) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Domain appended to bare usernames.
    pub server_name: String,
    pub initial_sync_limit: u32,
    pub sync_timeout: Duration,
    pub sync_retry_delay: Duration,
}

#[derive(Debug, Clone)]
struct Credentials {
    access_token: String,
}

#[derive(Default)]
struct SessionInner {
    credentials: Option<Credentials>,
    store: RoomStore,
    next_batch: Option<String>,
    listener: Option<MessageListener>,
    sync_task: Option<JoinHandle<()>>,
    /// Bumped on every login/logout so a stale sync loop can tell it was superseded.
    generation: u64,
}

/// Façade over a homeserver connection: login, room/timeline access, one
/// live-message listener, logout.
pub struct MatrixSession<H> {
    homeserver: Arc<H>,
    settings: SessionSettings,
    inner: Arc<Mutex<SessionInner>>,
    sync_state: Arc<watch::Sender<SyncState>>,
}

impl<H: Homeserver + 'static> MatrixSession<H> {
    pub fn new(homeserver: Arc<H>, settings: SessionSettings) -> Self {
        let (sync_state, _) = watch::channel(SyncState::Stopped);
        Self {
            homeserver,
            settings,
            inner: Arc::new(Mutex::new(SessionInner::default())),
            sync_state: Arc::new(sync_state),
        }
    }

    /// `alice` becomes `@alice:<server_name>`; `@alice:other.org` is kept as is.
    pub fn qualify_user_id(&self, username: &str) -> String {
        if username.starts_with('@') {
            username.to_string()
        } else {
            format!("@{username}:{}", self.settings.server_name)
        }
    }

    /// Password login followed by the initial sync. Resolves once the sync
    /// state is `Prepared`, then keeps syncing in the background.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, SessionError> {
        if username.is_empty() || password.is_empty() {
            return Err(SessionError::MissingCredentials);
        }

        if self.is_logged_in() {
            self.logout();
        }

        let user_id = self.qualify_user_id(username);
        log::info!("Logging in as {user_id}");

        let login = self
            .homeserver
            .login(&user_id, password)
            .await
            .map_err(|err| SessionError::LoginFailed(err.to_string()))?;

        let initial = SyncRequest {
            since: None,
            timeout_ms: 0,
            timeline_limit: Some(self.settings.initial_sync_limit),
        };
        let response = self
            .homeserver
            .sync(&login.access_token, &initial)
            .await
            .map_err(|err| SessionError::LoginFailed(err.to_string()))?;

        let generation = {
            let mut inner = self.inner.lock();
            inner.store.clear();
            // Initial timeline is history, not newly arrived messages.
            inner.store.apply_sync(&response);
            inner.next_batch = Some(response.next_batch.clone());
            inner.credentials = Some(Credentials {
                access_token: login.access_token.clone(),
            });
            inner.generation += 1;
            inner.generation
        };

        self.sync_state.send_replace(SyncState::Prepared);
        log::info!(
            "Initial sync prepared for {} on device {} ({} rooms)",
            login.user_id,
            login.device_id.as_deref().unwrap_or("-"),
            self.rooms().len()
        );

        let task = tokio::spawn(run_sync_loop(
            self.homeserver.clone(),
            self.inner.clone(),
            self.sync_state.clone(),
            self.settings.clone(),
            login.access_token,
            generation,
        ));
        {
            let mut inner = self.inner.lock();
            if inner.generation == generation {
                inner.sync_task = Some(task);
            } else {
                task.abort();
            }
        }

        Ok(login.user_id)
    }

    pub fn is_logged_in(&self) -> bool {
        self.inner.lock().credentials.is_some()
    }

    /// Joined rooms; empty when not logged in.
    pub fn rooms(&self) -> Vec<Room> {
        let inner = self.inner.lock();
        if inner.credentials.is_none() {
            return Vec::new();
        }
        inner.store.rooms()
    }

    /// Message events of the room's live timeline; empty for unknown rooms.
    pub fn messages(&self, room_id: &str) -> Vec<Message> {
        self.inner.lock().store.messages(room_id)
    }

    /// Register the newest-message listener. Only one listener may be
    /// attached per login; returns `false` if the callback was ignored.
    pub fn on_new_message<F>(&self, callback: F) -> bool
    where
        F: Fn(Message) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock();
        if inner.credentials.is_none() || inner.listener.is_some() {
            return false;
        }
        inner.listener = Some(Arc::new(callback));
        true
    }

    /// Page older history into the room's timeline. Returns the number of
    /// message events added; `0` without a request once the start of the
    /// room was reached. Backfilled events never reach the listener.
    pub async fn load_older(&self, room_id: &str, limit: u32) -> Result<usize, SessionError> {
        let (access_token, from, generation) = {
            let inner = self.inner.lock();
            let credentials = inner.credentials.as_ref().ok_or(SessionError::NotLoggedIn)?;
            let Some(from) = inner.store.prev_batch(room_id) else {
                return Ok(0);
            };
            (
                credentials.access_token.clone(),
                from.to_string(),
                inner.generation,
            )
        };

        let page = self
            .homeserver
            .messages(&access_token, room_id, Some(&from), limit)
            .await?;

        let updates = {
            let mut inner = self.inner.lock();
            if inner.generation != generation {
                return Err(SessionError::NotLoggedIn);
            }
            inner.store.prepend_backfill(room_id, &page)
        };

        let added = updates.len();
        dispatch(&self.inner, updates);
        log::debug!("Backfilled {added} messages into {room_id}");
        Ok(added)
    }

    pub fn subscribe_sync_state(&self) -> watch::Receiver<SyncState> {
        self.sync_state.subscribe()
    }

    /// Stop syncing and forget everything about the session. Safe to call
    /// repeatedly.
    pub fn logout(&self) {
        let was_logged_in = {
            let mut inner = self.inner.lock();
            if let Some(task) = inner.sync_task.take() {
                task.abort();
            }
            let was_logged_in = inner.credentials.take().is_some();
            inner.listener = None;
            inner.next_batch = None;
            inner.store.clear();
            inner.generation += 1;
            was_logged_in
        };

        self.sync_state.send_replace(SyncState::Stopped);
        if was_logged_in {
            log::info!("Logged out");
        }
    }
}

impl<H> Drop for MatrixSession<H> {
    fn drop(&mut self) {
        if let Some(task) = self.inner.lock().sync_task.take() {
            task.abort();
        }
    }
}

/// Hand live (forward) message updates to the listener, outside the lock.
fn dispatch(inner: &Mutex<SessionInner>, updates: Vec<TimelineUpdate>) {
    let Some(listener) = inner.lock().listener.clone() else {
        return;
    };

    for update in updates {
        if update.direction == TimelineDirection::Backward {
            continue;
        }
        listener(update.message);
    }
}

async fn run_sync_loop<H: Homeserver>(
    homeserver: Arc<H>,
    inner: Arc<Mutex<SessionInner>>,
    sync_state: Arc<watch::Sender<SyncState>>,
    settings: SessionSettings,
    access_token: String,
    generation: u64,
) {
    let timeout_ms = u64::try_from(settings.sync_timeout.as_millis()).unwrap_or(u64::MAX);

    loop {
        let since = {
            let inner = inner.lock();
            if inner.generation != generation {
                return;
            }
            inner.next_batch.clone()
        };

        let request = SyncRequest {
            since,
            timeout_ms,
            timeline_limit: None,
        };

        match homeserver.sync(&access_token, &request).await {
            Ok(response) => {
                let updates = {
                    let mut inner = inner.lock();
                    if inner.generation != generation {
                        return;
                    }
                    inner.next_batch = Some(response.next_batch.clone());
                    inner.store.apply_sync(&response)
                };
                sync_state.send_if_modified(|state| {
                    if *state == SyncState::Syncing {
                        false
                    } else {
                        *state = SyncState::Syncing;
                        true
                    }
                });
                dispatch(&inner, updates);
            }
            Err(err) if err.is_unauthorized() => {
                log::warn!("Sync stopped, access token rejected: {err}");
                sync_state.send_replace(SyncState::Error(err.to_string()));
                return;
            }
            Err(err) => {
                log::warn!(
                    "Sync failed: {err}; retrying in {:?}",
                    settings.sync_retry_delay
                );
                sync_state.send_replace(SyncState::Error(err.to_string()));
                tokio::time::sleep(settings.sync_retry_delay).await;
            }
        }
    }
}
