//! Queue promotion and outbound prediction messages.
//!
//! Promotion happens on every finalized source message: the full queue is
//! drained in ascending target order. Fresh entries get a channel message
//! (best-effort; a transport failure still records the prediction as
//! pending with no message ref), retry entries are internal re-keys of an
//! already-published prediction and stay silent.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::BotConfig;
use crate::evaluator;
use crate::ledger::QueuedPrediction;
use crate::state::AppState;
use crate::suits::{Status, Suit};
use crate::telegram::TelegramClient;

/// Fixed outbound template: header, predicted suit, status line.
pub fn format_prediction(game: u64, suit: Suit, status: Status) -> String {
    format!(
        "🎰 PRÉDICTION #{}\n🎯 Couleur: {}\n📊 Statut: {}",
        game,
        suit.display_name(),
        status.display()
    )
}

/// Promote every queued entry, in ascending target order.
pub async fn flush_queue(
    app: &mut AppState,
    tg: &TelegramClient,
    config: &BotConfig,
    now: DateTime<Utc>,
) {
    for entry in app.ledger.drain_queued() {
        promote(app, tg, config, entry, now).await;
    }
}

async fn promote(
    app: &mut AppState,
    tg: &TelegramClient,
    config: &BotConfig,
    entry: QueuedPrediction,
    now: DateTime<Utc>,
) {
    // A fresh entry may legally land on a slot held by a retry tracker;
    // the tracker's original resolves lost before the slot is reused.
    if let Some(previous) = app.ledger.remove_pending(entry.target_game) {
        warn!(
            "Pending #{} displaced by promoted #{}, resolving as lost",
            previous.original_game, entry.target_game
        );
        evaluator::resolve_terminal(app, tg, config, previous, Status::Lost, now).await;
    }

    let target = entry.target_game;
    let suit = entry.suit;
    let send_new = !entry.is_retry();
    let mut prediction = entry.into_pending();

    if send_new {
        match config.channels.prediction_channel_id {
            Some(chat) => {
                match tg
                    .send_message(chat, &format_prediction(target, suit, Status::Pending))
                    .await
                {
                    Ok(message_id) => {
                        prediction.message_ref = Some(message_id);
                        info!("Prediction sent for #{}: {}", target, suit.glyph());
                    }
                    Err(e) => {
                        warn!("Prediction send failed for #{} (kept pending): {}", target, e);
                    }
                }
            }
            None => debug!("No prediction channel configured, tracking #{} internally", target),
        }
    }

    app.ledger.insert_pending(prediction);
}

/// Rewrite the destination message (best-effort) and retire the entry
/// once the status is terminal.
pub async fn update_status(
    app: &mut AppState,
    tg: &TelegramClient,
    config: &BotConfig,
    target_game: u64,
    status: Status,
    now: DateTime<Utc>,
) {
    let Some(mut prediction) = app.ledger.remove_pending(target_game) else {
        return;
    };
    if status.is_terminal() {
        evaluator::resolve_terminal(app, tg, config, prediction, status, now).await;
    } else {
        prediction.status = status;
        if let (Some(chat), Some(message_id)) =
            (config.channels.prediction_channel_id, prediction.message_ref)
        {
            let text = format_prediction(prediction.original_game, prediction.suit, status);
            if let Err(e) = tg.edit_message(chat, message_id, &text).await {
                warn!("Status edit failed for #{}: {}", prediction.original_game, e);
            }
        }
        app.ledger.insert_pending(prediction);
    }
}
