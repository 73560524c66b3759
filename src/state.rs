//! Process-wide mutable state, owned by the event loop and passed
//! explicitly to every handler.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

use crate::config::BotConfig;
use crate::gate::SuitGate;
use crate::ledger::Ledger;
use crate::suits::{Status, Suit};

/// Rolling result-history length per suit.
pub const HISTORY_LEN: usize = 3;
/// Cooldown imposed when a suit's history fills up.
pub const HISTORY_BLOCK_MINUTES: i64 = 5;

/// Aggregate win/loss tally by terminal status.
#[derive(Debug, Default)]
pub struct Tally {
    /// Wins indexed by catch-up level.
    pub won: [u64; 4],
    pub lost: u64,
}

impl Tally {
    pub fn record(&mut self, status: Status) {
        match status {
            Status::Won(level) => self.won[(level as usize).min(3)] += 1,
            Status::Lost => self.lost += 1,
            Status::Pending => {}
        }
    }

    pub fn wins(&self) -> u64 {
        self.won.iter().sum()
    }

    pub fn total(&self) -> u64 {
        self.wins() + self.lost
    }

    pub fn reset(&mut self) {
        *self = Tally::default();
    }
}

pub struct AppState {
    pub ledger: Ledger,
    pub gate: SuitGate,
    pub tally: Tally,
    /// Rolling terminal results per suit, evaluated and cleared at
    /// [`HISTORY_LEN`] entries.
    pub suit_history: HashMap<Suit, Vec<Status>>,
    /// Fingerprints of already-processed source messages.
    pub processed: HashSet<String>,
    /// Last game number seen on the results channel.
    pub last_source_game: u64,

    // Operator-adjustable settings, seeded from config.
    pub game_offset: u64,
    pub spade_diamond_threshold: u32,
    pub heart_club_threshold: u32,
    pub report_interval_min: u64,
}

impl AppState {
    pub fn new(config: &BotConfig) -> Self {
        Self {
            ledger: Ledger::new(),
            gate: SuitGate::new(),
            tally: Tally::default(),
            suit_history: HashMap::new(),
            processed: HashSet::new(),
            last_source_game: 0,
            game_offset: config.predictor.game_offset,
            spade_diamond_threshold: config.predictor.spade_diamond_threshold,
            heart_club_threshold: config.predictor.heart_club_threshold,
            report_interval_min: config.predictor.report_interval_min,
        }
    }

    /// Hard cutover: clear every ledger, throttle and counter. Operator
    /// settings survive.
    pub fn daily_reset(&mut self) {
        self.ledger.clear();
        self.gate.clear();
        self.tally.reset();
        self.suit_history.clear();
        self.processed.clear();
        self.last_source_game = 0;
    }

    /// Win/loss summary for the destination channel; None while no
    /// prediction has resolved yet.
    pub fn format_report(&self) -> Option<String> {
        let total = self.tally.total();
        if total == 0 {
            return None;
        }
        let wins = self.tally.wins();
        let mut report = format!(
            "📊 **BILAN DES PRÉDICTIONS**\n\n\
             ✅ Taux de réussite : {:.1}%\n\
             ❌ Taux de perte : {:.1}%\n\n\
             Détails :\n",
            wins as f64 / total as f64 * 100.0,
            self.tally.lost as f64 / total as f64 * 100.0,
        );
        for level in 0..4u8 {
            report.push_str(&format!(
                "{} : {}\n",
                Status::Won(level).glyph(),
                self.tally.won[level as usize]
            ));
        }
        report.push_str(&format!(
            "❌ : {}\n\nTotal prédictions : {}",
            self.tally.lost, total
        ));
        Some(report)
    }

    /// Operator status overview.
    pub fn format_status(&self, now: DateTime<Utc>) -> String {
        let report_line = if self.report_interval_min > 0 {
            format!("toutes les {} min", self.report_interval_min)
        } else {
            "désactivé".to_string()
        };
        format!(
            "ℹ️ **INFORMATIONS DU BOT**\n\n\
             🔢 Dernier numéro reçu : #{}\n\
             🎯 Décalage de prédiction : +{}\n\
             ⚖️ Seuils miroirs : ♠️↔♦️ = {} | ❤️↔♣️ = {}\n\
             📨 En attente : {} | En file : {}\n\
             🚦 Costumes : {}\n\
             📊 Bilan : {} ✅ / {} ❌\n\
             ⏱ Rapport : {}",
            self.last_source_game,
            self.game_offset,
            self.spade_diamond_threshold,
            self.heart_club_threshold,
            self.ledger.pending_count(),
            self.ledger.queued_count(),
            self.gate.describe(now),
            self.tally.wins(),
            self.tally.lost,
            report_line,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::QueuedPrediction;
    use chrono::TimeZone;

    #[test]
    fn tally_buckets_by_level() {
        let mut tally = Tally::default();
        tally.record(Status::Won(0));
        tally.record(Status::Won(2));
        tally.record(Status::Lost);
        assert_eq!(tally.won[0], 1);
        assert_eq!(tally.won[2], 1);
        assert_eq!(tally.wins(), 2);
        assert_eq!(tally.total(), 3);
    }

    #[test]
    fn report_empty_until_first_resolution() {
        let mut app = AppState::new(&BotConfig::default());
        assert!(app.format_report().is_none());
        app.tally.record(Status::Won(1));
        let report = app.format_report().unwrap_or_default();
        assert!(report.contains("BILAN"));
        assert!(report.contains("Total prédictions : 1"));
    }

    #[test]
    fn daily_reset_clears_state_but_keeps_settings() {
        let mut app = AppState::new(&BotConfig::default());
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        app.game_offset = 4;
        app.last_source_game = 300;
        app.tally.record(Status::Lost);
        app.processed.insert("300:x".to_string());
        app.ledger
            .enqueue(QueuedPrediction::fresh(301, Suit::Spades, 300, now));
        app.daily_reset();
        assert_eq!(app.last_source_game, 0);
        assert_eq!(app.tally.total(), 0);
        assert!(app.processed.is_empty());
        assert_eq!(app.ledger.queued_count(), 0);
        assert_eq!(app.game_offset, 4);
    }
}
