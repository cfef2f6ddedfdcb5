pub mod client;

pub use client::{AiClient, AiMessage};
