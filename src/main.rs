//! Telegram suit prediction bot
//!
//! Watches a results channel and a per-suit counter channel, queues
//! throttled suit predictions from counter imbalances, and settles them
//! against finalized results through a bounded catch-up ladder. All state
//! is in-memory and cleared by the daily reset.

mod commands;
mod config;
mod evaluator;
mod gate;
mod health;
mod ledger;
mod parser;
mod predictor;
mod publish;
mod state;
mod suits;
mod telegram;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, Timelike, Utc};
use clap::Parser;
use config::BotConfig;
use state::AppState;
use std::path::PathBuf;
use std::time::Duration;
use telegram::TelegramClient;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Telegram suit prediction bot
#[derive(Parser, Debug)]
#[command(name = "suit-bot")]
#[command(about = "Watches card-game channels and publishes suit predictions")]
struct Args {
    /// Path to the YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let log_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,suit_bot=debug".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&log_filter))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    info!("╔══════════════════════════════════════════════════════════════╗");
    info!("║                  SUIT PREDICTION BOT                         ║");
    info!("╚══════════════════════════════════════════════════════════════╝");

    let config_path = args.config.unwrap_or_else(|| {
        PathBuf::from(
            std::env::var("BOT_CONFIG_PATH")
                .unwrap_or_else(|_| "config/bot_config.yaml".to_string()),
        )
    });

    let mut config = if config_path.exists() {
        info!("Loading config from: {}", config_path.display());
        BotConfig::load(&config_path).context("Failed to load configuration")?
    } else {
        warn!("Config file not found, using defaults: {}", config_path.display());
        BotConfig::default()
    };
    config.apply_env();

    if config.telegram.bot_token.is_empty() {
        anyhow::bail!("No bot token configured (set TELEGRAM_BOT_TOKEN or telegram.bot_token)");
    }

    info!("Configuration loaded:");
    info!("  Results channel:    {}", config.channels.results_channel_id);
    info!("  Stats channel:      {}", config.channels.stats_channel_id);
    match config.channels.prediction_channel_id {
        Some(id) => info!("  Prediction channel: {}", id),
        None => warn!("  Prediction channel unset - predictions tracked internally only"),
    }
    info!("  Game offset:        +{}", config.predictor.game_offset);
    info!(
        "  Mirror thresholds:  ♠️♦️={} ❤️♣️={}",
        config.predictor.spade_diamond_threshold, config.predictor.heart_club_threshold
    );
    info!(
        "  Daily reset:        {:02}:00 UTC{:+}",
        config.reset.hour, config.reset.utc_offset_hours
    );

    let reset_tz = FixedOffset::east_opt(config.reset.utc_offset_hours * 3600)
        .context("Invalid reset UTC offset")?;

    let tg = TelegramClient::new(&config.telegram.bot_token, config.telegram.request_timeout_ms)?;
    let bot_id = tg
        .get_me()
        .await
        .context("getMe failed - check the bot token")?;
    info!("Telegram bot ready, bot_id={}", bot_id);

    let port = config.server.port;
    tokio::spawn(async move {
        if let Err(e) = health::serve(port).await {
            error!("Health endpoint stopped: {}", e);
        }
    });

    let mut app = AppState::new(&config);
    let mut update_offset: i64 = 0;
    let mut last_report_at = Utc::now();
    let mut last_reset_day: Option<NaiveDate> = None;
    let mut report_ticker = tokio::time::interval(Duration::from_secs(60));
    let mut reset_ticker = tokio::time::interval(Duration::from_secs(60));

    info!("Bot running. Press Ctrl+C to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received, stopping bot");
                break;
            }
            result = tg.get_updates(update_offset, config.telegram.poll_timeout_secs) => {
                match result {
                    Ok(updates) => {
                        for update in updates {
                            update_offset = update.update_id + 1;
                            for msg in update.into_messages() {
                                dispatch_message(&mut app, &tg, &config, msg).await;
                            }
                        }
                    }
                    Err(e) => {
                        warn!("getUpdates failed: {}", e);
                        tokio::time::sleep(Duration::from_secs(2)).await;
                    }
                }
            }
            _ = report_ticker.tick() => {
                maybe_send_report(&app, &tg, &config, &mut last_report_at).await;
            }
            _ = reset_ticker.tick() => {
                let local = Utc::now().with_timezone(&reset_tz);
                if local.hour() == config.reset.hour && last_reset_day != Some(local.date_naive()) {
                    info!(
                        "Daily reset at {} (UTC{:+})",
                        local.format("%H:%M"),
                        config.reset.utc_offset_hours
                    );
                    app.daily_reset();
                    last_reset_day = Some(local.date_naive());
                }
            }
        }
    }

    Ok(())
}

async fn dispatch_message(
    app: &mut AppState,
    tg: &TelegramClient,
    config: &BotConfig,
    msg: telegram::Message,
) {
    let Some(text) = msg.text.clone() else {
        return;
    };
    let now = Utc::now();
    if msg.chat.id == config.channels.results_channel_id {
        evaluator::handle_source_message(app, tg, config, &text, now).await;
    } else if msg.chat.id == config.channels.stats_channel_id {
        predictor::handle_stats_message(app, &text, now);
    } else if text.starts_with('/') {
        commands::handle_command(app, tg, config, &msg, &text).await;
    }
}

async fn maybe_send_report(
    app: &AppState,
    tg: &TelegramClient,
    config: &BotConfig,
    last_report_at: &mut DateTime<Utc>,
) {
    if app.report_interval_min == 0 {
        return;
    }
    let now = Utc::now();
    if (now - *last_report_at).num_minutes() < app.report_interval_min as i64 {
        return;
    }
    *last_report_at = now;
    let Some(report) = app.format_report() else {
        return;
    };
    if let Some(chat) = config.channels.prediction_channel_id {
        if let Err(e) = tg.send_message(chat, &report).await {
            warn!("Report send failed: {}", e);
        }
    }
}
