/// Commands sent from the UI down to the dashboard worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardCommand {
    Login {
        username: String,
        password: String,
    },
    /// Fetch the room's timeline and run the AI fan-out over it.
    SelectRoom(String),
    /// Page older history for a room (backward pagination).
    LoadOlder(String),
    RefreshRooms,
    CheckHealth,
    Logout,
}
