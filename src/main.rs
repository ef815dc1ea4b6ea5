mod config;
mod controller;
mod error;
mod external;
mod logging;
mod model;
mod transport;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use tokio::time::Instant;

use config::AppConfig;
use controller::AppController;
use external::JsonFileSync;
use model::{AppModel, LibraryStore, Notice, NoticeLevel};
use transport::{event_channel, HeadlessTransport};

const NOTICE_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;

    if let Err(e) = logging::init_logging(&config.log_dir) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    tracing::info!("=== SpotyTube-RS Starting ===");
    tracing::debug!(?config, "Configuration loaded");

    let db_path = config.database_path();
    let store = LibraryStore::open(&db_path, config.history_limit)
        .with_context(|| format!("opening library at {}", db_path.display()))?;

    let (events_tx, events_rx) = event_channel();
    let transport = Arc::new(HeadlessTransport::new(config.default_track_seconds, events_tx));

    let model = Arc::new(Mutex::new(AppModel::new()));
    let mut controller = AppController::new(model.clone(), store, transport)
        .with_progress_interval(config.progress_interval());
    if let Some(path) = &config.sync_export_path {
        tracing::info!(path = %path.display(), "Library sync enabled");
        controller = controller.with_remote_sync(Arc::new(JsonFileSync::new(path)));
    }

    controller.load_favorites_cache().await;
    let listener = controller.start_player_event_listener(events_rx);

    let res = run_shell(model, controller.clone()).await;

    controller.close().await;
    listener.abort();

    if let Err(err) = &res {
        tracing::error!(error = ?err, "Application error");
    }

    tracing::info!("SpotyTube-RS shutting down");
    res
}

async fn run_shell(model: Arc<Mutex<AppModel>>, controller: AppController) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(NOTICE_POLL_INTERVAL);
    let mut last_shown: Option<Instant> = None;

    println!("SpotyTube-RS. Type 'help' for commands.");
    prompt()?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if line.trim().is_empty() {
                    prompt()?;
                    continue;
                }

                let output = controller.handle_command(&line).await;
                if !output.is_empty() {
                    println!("{}", output);
                }

                let model = model.lock().await;
                if let Some(notice) = fresh_notice(model.notice(), &mut last_shown) {
                    print_notice(notice);
                }
                if model.should_quit() {
                    break;
                }
                drop(model);
                prompt()?;
            }
            _ = ticker.tick() => {
                // Notices raised by transport events or background sync
                let mut model = model.lock().await;
                model.auto_clear_old_notice();
                if let Some(notice) = fresh_notice(model.notice(), &mut last_shown) {
                    println!();
                    print_notice(notice);
                    drop(model);
                    prompt()?;
                }
            }
        }
    }

    Ok(())
}

/// The latest notice, unless it was already printed.
fn fresh_notice<'a>(notice: Option<&'a Notice>, last_shown: &mut Option<Instant>) -> Option<&'a Notice> {
    let notice = notice?;
    if *last_shown == Some(notice.at) {
        return None;
    }
    *last_shown = Some(notice.at);
    Some(notice)
}

fn print_notice(notice: &Notice) {
    let tag = match notice.level {
        NoticeLevel::Info => "info",
        NoticeLevel::Success => "ok",
        NoticeLevel::Warning => "warn",
        NoticeLevel::Error => "error",
    };
    println!("[{}] {}", tag, notice.message);
}

fn prompt() -> Result<()> {
    print!("> ");
    std::io::stdout().flush()?;
    Ok(())
}
