mod ai;
mod common;
mod config;
mod error;
mod matrix;
mod network;
mod ui;

use std::error::Error;
use std::sync::Arc;

use chrono::Local;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use tokio::sync::mpsc;

use ai::{AiClient, AiMessage};
use config::AppConfig;
use matrix::{HttpHomeserver, MatrixSession, SessionSettings};
use network::DashboardClient;
use ui::DashboardApp;

#[derive(Parser)]
#[command(
    name = "matrix_ai_dashboard",
    version,
    about = "Matrix room dashboard with AI summaries"
)]
struct Cli {
    /// Path to JSON config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH, value_name = "FILE")]
    config: String,
    #[command(subcommand)]
    mode: Option<Mode>,
}

/// One-shot AI backend calls; each prints the JSON reply and exits (no UI).
#[derive(Subcommand, Clone, Debug)]
enum Mode {
    /// Probe the AI backend's health route
    Health,
    /// Classify the intent of one message
    Intent { text: String },
    /// Rank messages by priority
    Prioritize {
        #[arg(required = true)]
        texts: Vec<String>,
    },
    /// Store a document in the knowledge base
    KbAdd { text: String },
    /// Semantic search over the knowledge base
    KbSearch {
        query: String,
        #[arg(long, default_value_t = 5)]
        top_k: usize,
    },
    /// Build a report over the given conversation lines
    DailyReport {
        /// Report date, defaults to today
        #[arg(long)]
        date: Option<String>,
        #[arg(required = true)]
        texts: Vec<String>,
    },
}

impl Mode {
    async fn run(self, ai: &AiClient) -> serde_json::Value {
        let batch = |texts: Vec<String>| -> Vec<AiMessage> {
            texts
                .into_iter()
                .map(|text| AiMessage {
                    text,
                    ..AiMessage::default()
                })
                .collect()
        };

        match self {
            Mode::Health => ai.health().await,
            Mode::Intent { text } => {
                ai.analyze_intent(&AiMessage {
                    text,
                    ..AiMessage::default()
                })
                .await
            }
            Mode::Prioritize { texts } => ai.prioritize(&batch(texts)).await,
            Mode::KbAdd { text } => ai.add_to_knowledge_base(&text, serde_json::json!({})).await,
            Mode::KbSearch { query, top_k } => ai.search_knowledge_base(&query, top_k).await,
            Mode::DailyReport { date, texts } => {
                let date = date.unwrap_or_else(|| Local::now().format("%Y-%m-%d").to_string());
                ai.daily_report(&batch(texts), &date).await
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let app_config = config::load_config(&cli.config).with_env_overrides();
    let ai = AiClient::new(&app_config.ai_base_url, app_config.ai_timeout())?;

    if let Some(mode) = cli.mode {
        let reply = mode.run(&ai).await;
        println!("{}", serde_json::to_string_pretty(&reply)?);
        return Ok(());
    }

    run_dashboard(app_config, ai).await
}

async fn run_dashboard(app_config: AppConfig, ai: AiClient) -> Result<(), Box<dyn Error>> {
    // UI -> worker
    let (cmd_tx, cmd_rx) = mpsc::channel(100);
    // Worker -> UI
    let (event_tx, event_rx) = mpsc::channel(100);

    let homeserver = Arc::new(HttpHomeserver::new(&app_config.homeserver_url)?);
    let session = MatrixSession::new(
        homeserver,
        SessionSettings {
            server_name: app_config.server_name.clone(),
            initial_sync_limit: app_config.initial_sync_limit,
            sync_timeout: app_config.sync_timeout(),
            sync_retry_delay: app_config.sync_retry_delay(),
        },
    );
    let worker = DashboardClient::new(event_tx, cmd_rx, session, ai, app_config.backfill_limit);
    network::spawn_worker(worker);

    log::info!(
        "Dashboard started against {} (AI at {})",
        app_config.homeserver_url,
        app_config.ai_base_url
    );

    let options = eframe::NativeOptions::default();
    let mut event_rx = Some(event_rx);

    eframe::run_native(
        "Matrix AI Dashboard",
        options,
        Box::new(move |cc| {
            let event_receiver = event_rx
                .take()
                .ok_or("DashboardApp should only be initialized once")?;
            Ok(Box::new(DashboardApp::new(cc, cmd_tx.clone(), event_receiver)))
        }),
    )
    .map_err(|err| err.to_string())?;

    Ok(())
}
