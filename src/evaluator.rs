//! Outcome evaluation for finalized results: the won-on-first-check path,
//! the bounded catch-up ladder, and the per-suit rolling result history.
//!
//! The pending ledger is keyed by target game and `retry_index`
//! partitions it: a first-chance prediction and a retry tracker can never
//! be the same entry, so exactly one resolution path fires per entry for
//! any given game number.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::BotConfig;
use crate::ledger::{Prediction, QueuedPrediction};
use crate::parser;
use crate::publish::{self, format_prediction};
use crate::state::{AppState, HISTORY_BLOCK_MINUTES, HISTORY_LEN};
use crate::suits::Status;
use crate::telegram::TelegramClient;

/// Catch-up attempts after the first miss.
pub const MAX_RETRIES: u8 = 3;

/// Entry point for a message from the results channel.
pub async fn handle_source_message(
    app: &mut AppState,
    tg: &TelegramClient,
    config: &BotConfig,
    text: &str,
    now: DateTime<Utc>,
) {
    let Some(game) = parser::extract_game_number(text) else {
        return;
    };
    if !app.processed.insert(parser::fingerprint(game, text)) {
        debug!("Already processed #{}, skipping duplicate", game);
        return;
    }
    app.last_source_game = game;

    if !parser::is_finalized(text) {
        return;
    }
    if let Some(group) = parser::extract_result_groups(text).into_iter().next() {
        evaluate_result(app, tg, config, game, &group, now).await;
    }
    publish::flush_queue(app, tg, config, now).await;
}

/// Resolve the pending entry targeting `game` against its result group.
async fn evaluate_result(
    app: &mut AppState,
    tg: &TelegramClient,
    config: &BotConfig,
    game: u64,
    group: &str,
    now: DateTime<Utc>,
) {
    let Some(snapshot) = app.ledger.pending(game).cloned() else {
        return;
    };
    let hit = parser::suit_in_group(group, snapshot.suit);

    if snapshot.retry_index == 0 {
        if hit {
            publish::update_status(app, tg, config, game, Status::Won(0), now).await;
        } else {
            supersede_with_retry(app, tg, config, snapshot, game, now).await;
        }
    } else if hit {
        let level = snapshot.retry_index;
        publish::update_status(app, tg, config, game, Status::Won(level), now).await;
    } else if snapshot.retry_index < MAX_RETRIES {
        supersede_with_retry(app, tg, config, snapshot, game, now).await;
    } else {
        publish::update_status(app, tg, config, game, Status::Lost, now).await;
    }
}

/// Replace the entry at `game` with its next-chance tracker at `game + 1`.
async fn supersede_with_retry(
    app: &mut AppState,
    tg: &TelegramClient,
    config: &BotConfig,
    current: Prediction,
    game: u64,
    now: DateTime<Utc>,
) {
    let Some(removed) = app.ledger.remove_pending(game) else {
        return;
    };
    let retry = QueuedPrediction {
        target_game: game + 1,
        suit: current.suit,
        base_game: current.base_game,
        retry_index: current.retry_index + 1,
        original_game: current.original_game,
        created_at: now,
        carried_ref: current.message_ref,
    };
    if app.ledger.enqueue(retry) {
        debug!(
            "Miss at #{}, retry {} queued for #{} (original #{})",
            game,
            current.retry_index + 1,
            game + 1,
            current.original_game
        );
    } else {
        warn!(
            "Retry slot #{} unavailable, resolving #{} as lost",
            game + 1,
            current.original_game
        );
        resolve_terminal(app, tg, config, removed, Status::Lost, now).await;
    }
}

/// Terminal bookkeeping shared by every resolution path: edit the channel
/// message, bump the tally and feed the per-suit result history.
pub(crate) async fn resolve_terminal(
    app: &mut AppState,
    tg: &TelegramClient,
    config: &BotConfig,
    mut prediction: Prediction,
    status: Status,
    now: DateTime<Utc>,
) {
    prediction.status = status;
    if let (Some(chat), Some(message_id)) =
        (config.channels.prediction_channel_id, prediction.message_ref)
    {
        let text = format_prediction(prediction.original_game, prediction.suit, status);
        if let Err(e) = tg.edit_message(chat, message_id, &text).await {
            warn!("Status edit failed for #{}: {}", prediction.original_game, e);
        }
    }
    info!(
        "Prediction #{} resolved: {}",
        prediction.original_game,
        status.glyph()
    );
    app.tally.record(status);
    record_history(app, &prediction, status, now);
}

/// Rolling 3-result history per suit: a loss among the last three queues
/// an immediate catch-up prediction; either way the suit cools down for
/// five minutes and the history restarts.
fn record_history(app: &mut AppState, prediction: &Prediction, status: Status, now: DateTime<Utc>) {
    let suit = prediction.suit;
    let history = app.suit_history.entry(suit).or_default();
    history.push(status);
    if history.len() < HISTORY_LEN {
        return;
    }
    let any_lost = history.iter().any(|s| matches!(s, Status::Lost));
    history.clear();
    app.gate.block_for(suit, HISTORY_BLOCK_MINUTES, now);

    if any_lost {
        let target = app.last_source_game + 1;
        let entry = QueuedPrediction::fresh(target, suit, app.last_source_game, now);
        if app.ledger.enqueue(entry) {
            info!(
                "Loss among last {} results for {}, catch-up queued for #{}",
                HISTORY_LEN,
                suit.glyph(),
                target
            );
        } else {
            debug!("Catch-up target #{} already covered", target);
        }
    } else {
        info!(
            "{} won {} straight, cooling down {} min",
            suit.glyph(),
            HISTORY_LEN,
            HISTORY_BLOCK_MINUTES
        );
    }
}
