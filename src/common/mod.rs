pub mod commands;
pub mod events;
pub mod types;

pub use commands::DashboardCommand;
pub use events::DashboardEvent;
pub use types::{AiAnalysis, Message, Room, SyncState};
