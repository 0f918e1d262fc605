use anyhow::Result;
use dotenvy::dotenv;
use lesson_sync_rs::config::Settings;
use lesson_sync_rs::reconcile::{Candidate, Reconciler};
use lesson_sync_rs::storage::R2Storage;
use lesson_sync_rs::stream::{MessageStream, TelegramStream};
use lesson_sync_rs::{ledger, parser};
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenv().ok();

    init_logging();

    info!("Starting lesson sync run...");

    let settings = init_settings();
    let store = init_storage(&settings).await;
    let stream = TelegramStream::new(&settings.telegram_token, &settings.channel);

    let ledger_path = Path::new(&settings.lessons_file);
    let known = ledger::load(ledger_path)?;
    info!(
        "Loaded ledger with {} lessons from {}",
        known.len(),
        settings.lessons_file
    );

    let window = stream.scan(settings.scan_limit).await?;
    let candidates: Vec<Candidate> = window
        .into_iter()
        .map(|message| Candidate {
            caption: parser::parse(&message.caption),
            message,
        })
        .collect();

    let reconciler = Reconciler::new(&store, &stream);
    let outcome = reconciler.reconcile(known, candidates).await?;

    ledger::save(ledger_path, &outcome.ledger)?;
    info!(
        "Sync complete: {} new lessons, {} total",
        outcome.added,
        outcome.ledger.len()
    );

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_settings() -> Settings {
    match Settings::new() {
        Ok(s) => {
            info!("Configuration loaded successfully.");
            s
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    }
}

async fn init_storage(settings: &Settings) -> R2Storage {
    match R2Storage::new(settings).await {
        Ok(s) => {
            info!("R2 Storage initialized.");
            s
        }
        Err(e) => {
            error!("Failed to initialize R2 Storage: {}", e);
            std::process::exit(1);
        }
    }
}
