//! Stats-triggered predictor: turns per-suit counter snapshots into
//! queued predictions.
//!
//! The two mirror pairings are checked in fixed order and only the first
//! qualifying one triggers, so a stats message produces at most one
//! prediction. A deny from either gate drops the trigger silently; the
//! next stats message re-evaluates from scratch.

use chrono::{DateTime, Timelike, Utc};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::gate::{self, Verdict};
use crate::ledger::QueuedPrediction;
use crate::parser;
use crate::state::AppState;
use crate::suits::Suit;

/// Mirror pairings, in trigger-priority order.
const PAIRS: [(Suit, Suit); 2] = [
    (Suit::Spades, Suit::Diamonds),
    (Suit::Hearts, Suit::Clubs),
];

/// Weaker suit of the first pair whose counter gap meets its threshold,
/// together with the gap.
pub fn pick_signal(
    counts: &HashMap<Suit, u32>,
    spade_diamond_threshold: u32,
    heart_club_threshold: u32,
) -> Option<(Suit, u32)> {
    for (index, &(a, b)) in PAIRS.iter().enumerate() {
        let threshold = if index == 0 {
            spade_diamond_threshold
        } else {
            heart_club_threshold
        };
        let count_a = counts.get(&a).copied().unwrap_or(0);
        let count_b = counts.get(&b).copied().unwrap_or(0);
        let gap = count_a.abs_diff(count_b);
        if gap >= threshold {
            let weaker = if count_a <= count_b { a } else { b };
            return Some((weaker, gap));
        }
    }
    None
}

/// Entry point for a message from the stats channel.
pub fn handle_stats_message(app: &mut AppState, text: &str, now: DateTime<Utc>) {
    if !parser::is_stats_message(text) {
        return;
    }
    let counts = parser::parse_stats(text);
    if counts.is_empty() {
        return;
    }
    let Some((suit, gap)) = pick_signal(
        &counts,
        app.spade_diamond_threshold,
        app.heart_club_threshold,
    ) else {
        return;
    };

    if !gate::window_open(&now) {
        debug!(
            "Issuance window closed (minute {}), dropping {} trigger",
            now.minute(),
            suit.glyph()
        );
        return;
    }
    if let Verdict::Deny(reason) = app.gate.evaluate(suit, now) {
        debug!("Suit gate denied trigger: {}", reason);
        return;
    }
    if app.last_source_game == 0 {
        debug!("No source game seen yet, dropping {} trigger", suit.glyph());
        return;
    }

    let target = app.last_source_game + app.game_offset;
    let entry = QueuedPrediction::fresh(target, suit, app.last_source_game, now);
    if app.ledger.enqueue(entry) {
        app.gate.record_issued(suit, now);
        info!(
            "Mirror gap {} in favor of {}: prediction queued for #{}",
            gap,
            suit.glyph(),
            target
        );
    } else {
        debug!("Target #{} already covered, dropping trigger", target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BotConfig;
    use chrono::TimeZone;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 10, minute, 0).unwrap()
    }

    fn counts(entries: &[(Suit, u32)]) -> HashMap<Suit, u32> {
        entries.iter().copied().collect()
    }

    #[test]
    fn weaker_suit_of_first_qualifying_pair() {
        let c = counts(&[(Suit::Spades, 4), (Suit::Diamonds, 12)]);
        assert_eq!(pick_signal(&c, 6, 6), Some((Suit::Spades, 8)));

        // Below threshold: no signal.
        assert_eq!(pick_signal(&c, 10, 10), None);

        // First pair wins even when both qualify.
        let both = counts(&[
            (Suit::Spades, 20),
            (Suit::Diamonds, 2),
            (Suit::Hearts, 1),
            (Suit::Clubs, 30),
        ]);
        assert_eq!(pick_signal(&both, 6, 6), Some((Suit::Diamonds, 18)));

        // Second pair triggers when the first is quiet.
        let second = counts(&[(Suit::Hearts, 2), (Suit::Clubs, 11)]);
        assert_eq!(pick_signal(&second, 6, 6), Some((Suit::Hearts, 9)));
    }

    #[test]
    fn missing_suits_count_as_zero_for_the_gap() {
        let c = counts(&[(Suit::Diamonds, 9)]);
        assert_eq!(pick_signal(&c, 6, 6), Some((Suit::Spades, 9)));
    }

    #[test]
    fn stats_snapshot_queues_one_prediction() {
        let mut app = AppState::new(&BotConfig::default());
        app.spade_diamond_threshold = 6;
        app.heart_club_threshold = 6;
        app.last_source_game = 101;

        let text = "Compteur instantané\n♠️ : 4\n♦️ : 12";
        handle_stats_message(&mut app, text, at(5));

        assert_eq!(app.ledger.queued_count(), 1);
        let queued = app.ledger.drain_queued();
        assert_eq!(queued[0].target_game, 102);
        assert_eq!(queued[0].suit, Suit::Spades);
    }

    #[test]
    fn closed_window_drops_the_trigger() {
        let mut app = AppState::new(&BotConfig::default());
        app.spade_diamond_threshold = 6;
        app.last_source_game = 101;

        handle_stats_message(&mut app, "Compteur instantané ♠️ : 4 ♦️ : 12", at(45));

        assert_eq!(app.ledger.queued_count(), 0);
    }

    #[test]
    fn blocked_suit_drops_the_trigger() {
        let mut app = AppState::new(&BotConfig::default());
        app.spade_diamond_threshold = 6;
        app.last_source_game = 101;
        app.gate.block_for(Suit::Spades, 5, at(0));

        handle_stats_message(&mut app, "Compteur instantané ♠️ : 4 ♦️ : 12", at(2));

        assert_eq!(app.ledger.queued_count(), 0);
    }

    #[test]
    fn non_stats_text_is_ignored() {
        let mut app = AppState::new(&BotConfig::default());
        app.last_source_game = 101;
        handle_stats_message(&mut app, "♠️ : 4 ♦️ : 99", at(5));
        assert_eq!(app.ledger.queued_count(), 0);
    }

    #[test]
    fn no_source_game_yet_drops_the_trigger() {
        let mut app = AppState::new(&BotConfig::default());
        app.spade_diamond_threshold = 6;

        handle_stats_message(&mut app, "Compteur instantané ♠️ : 4 ♦️ : 12", at(5));

        assert_eq!(app.ledger.queued_count(), 0);
    }
}
