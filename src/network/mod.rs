pub mod client;

pub use client::{DashboardClient, spawn_worker};
