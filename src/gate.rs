//! Issuance gates: the per-suit consecutive-use throttle and the
//! minute-of-hour window.
//!
//! The throttle is a small state machine per suit: issuing the same suit
//! three times in a row starts a 30-minute cooldown from the first of the
//! three; switching suits resets the run. The evaluator's 5-minute result
//! penalty stacks on top via [`SuitGate::block_for`].

use chrono::{DateTime, Duration, Timelike, Utc};
use std::collections::HashMap;

use crate::suits::Suit;

pub const MAX_CONSECUTIVE: u8 = 3;
pub const COOLDOWN_MINUTES: i64 = 30;

/// New predictions are only issued during the first half of every hour.
pub fn window_open(now: &DateTime<Utc>) -> bool {
    now.minute() < 30
}

/// Outcome of a throttle evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny(String),
}

impl Verdict {
    pub fn is_allow(&self) -> bool {
        matches!(self, Verdict::Allow)
    }
}

#[derive(Debug, Clone, Default)]
struct SuitThrottle {
    consecutive_count: u8,
    first_prediction_at: Option<DateTime<Utc>>,
    blocked_until: Option<DateTime<Utc>>,
}

impl SuitThrottle {
    fn reset(&mut self) {
        self.consecutive_count = 0;
        self.first_prediction_at = None;
        self.blocked_until = None;
    }
}

/// Consecutive-use throttle over all four suits.
///
/// `evaluate` decides and performs time-based transitions (unblocking,
/// reset on suit change); only `record_issued` counts an issuance, so
/// evaluating repeatedly without issuing never advances the run.
#[derive(Debug, Default)]
pub struct SuitGate {
    throttles: HashMap<Suit, SuitThrottle>,
    last_issued: Option<Suit>,
}

impl SuitGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn evaluate(&mut self, suit: Suit, now: DateTime<Utc>) -> Verdict {
        if let Some(last) = self.last_issued {
            if last != suit {
                // Suit change ends both runs and lifts any block.
                self.throttles.entry(last).or_default().reset();
                self.throttles.entry(suit).or_default().reset();
                return Verdict::Allow;
            }
        }

        let throttle = self.throttles.entry(suit).or_default();

        if let Some(until) = throttle.blocked_until {
            if until > now {
                return Verdict::Deny(format!(
                    "{} blocked for {:.1} more minutes",
                    suit.glyph(),
                    minutes_until(until, now)
                ));
            }
            // Block expired: the next record_issued starts a fresh run.
            throttle.reset();
            return Verdict::Allow;
        }

        if throttle.consecutive_count < MAX_CONSECUTIVE {
            return Verdict::Allow;
        }

        match throttle.first_prediction_at {
            Some(first) if now - first >= Duration::minutes(COOLDOWN_MINUTES) => {
                throttle.reset();
                Verdict::Allow
            }
            Some(first) => {
                let until = first + Duration::minutes(COOLDOWN_MINUTES);
                throttle.blocked_until = Some(until);
                Verdict::Deny(format!(
                    "{} issued {} times in a row, blocked for {:.1} more minutes",
                    suit.glyph(),
                    MAX_CONSECUTIVE,
                    minutes_until(until, now)
                ))
            }
            None => {
                throttle.reset();
                Verdict::Allow
            }
        }
    }

    /// Count an actual issuance. Must follow an allowing `evaluate`.
    pub fn record_issued(&mut self, suit: Suit, now: DateTime<Utc>) {
        let throttle = self.throttles.entry(suit).or_default();
        throttle.consecutive_count = (throttle.consecutive_count + 1).min(MAX_CONSECUTIVE);
        if throttle.consecutive_count == 1 {
            throttle.first_prediction_at = Some(now);
        }
        self.last_issued = Some(suit);
    }

    /// Impose an absolute block, extending any existing one.
    pub fn block_for(&mut self, suit: Suit, minutes: i64, now: DateTime<Utc>) {
        let throttle = self.throttles.entry(suit).or_default();
        let until = now + Duration::minutes(minutes);
        throttle.blocked_until = Some(match throttle.blocked_until {
            Some(existing) if existing > until => existing,
            _ => until,
        });
    }

    /// One-line summary for the operator status command.
    pub fn describe(&self, now: DateTime<Utc>) -> String {
        Suit::ALL
            .iter()
            .map(|&suit| match self.throttles.get(&suit) {
                Some(t) if t.blocked_until.is_some_and(|until| until > now) => {
                    let until = t.blocked_until.unwrap_or(now);
                    format!("{} ⛔ {:.0} min", suit.glyph(), minutes_until(until, now))
                }
                Some(t) => format!("{} {}/{}", suit.glyph(), t.consecutive_count, MAX_CONSECUTIVE),
                None => format!("{} 0/{}", suit.glyph(), MAX_CONSECUTIVE),
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }

    pub fn clear(&mut self) {
        self.throttles.clear();
        self.last_issued = None;
    }
}

fn minutes_until(until: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (until - now).num_seconds() as f64 / 60.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, minute, 0).unwrap()
    }

    fn issue(gate: &mut SuitGate, suit: Suit, now: DateTime<Utc>) {
        assert!(gate.evaluate(suit, now).is_allow());
        gate.record_issued(suit, now);
    }

    #[test]
    fn window_open_boundaries() {
        assert!(window_open(&at(10, 0)));
        assert!(window_open(&at(10, 29)));
        assert!(!window_open(&at(10, 30)));
        assert!(!window_open(&at(10, 59)));
    }

    #[test]
    fn three_consecutive_issuances_deny_until_cooldown() {
        let mut gate = SuitGate::new();
        for minute in [0, 5, 10] {
            issue(&mut gate, Suit::Spades, at(10, minute));
        }
        // Blocked until 30 minutes after the first of the run.
        assert!(!gate.evaluate(Suit::Spades, at(10, 15)).is_allow());
        assert!(!gate.evaluate(Suit::Spades, at(10, 29)).is_allow());
        assert!(gate.evaluate(Suit::Spades, at(10, 31)).is_allow());
    }

    #[test]
    fn cooldown_elapse_restarts_the_run() {
        let mut gate = SuitGate::new();
        for minute in [0, 1, 2] {
            issue(&mut gate, Suit::Hearts, at(10, minute));
        }
        // 30 minutes after first_prediction_at the run restarts at one.
        issue(&mut gate, Suit::Hearts, at(10, 31));
        issue(&mut gate, Suit::Hearts, at(10, 32));
        issue(&mut gate, Suit::Hearts, at(10, 33));
        assert!(!gate.evaluate(Suit::Hearts, at(10, 34)).is_allow());
    }

    #[test]
    fn suit_change_resets_both_runs() {
        let mut gate = SuitGate::new();
        for minute in [0, 1, 2] {
            issue(&mut gate, Suit::Clubs, at(9, minute));
        }
        assert!(!gate.evaluate(Suit::Clubs, at(9, 3)).is_allow());
        // A different suit is always allowed and ends the clubs run.
        issue(&mut gate, Suit::Diamonds, at(9, 4));
        assert!(gate.evaluate(Suit::Clubs, at(9, 5)).is_allow());
    }

    #[test]
    fn evaluate_alone_never_counts() {
        let mut gate = SuitGate::new();
        for _ in 0..5 {
            assert!(gate.evaluate(Suit::Spades, at(11, 0)).is_allow());
        }
        // Only three recorded issuances should exhaust the run.
        issue(&mut gate, Suit::Spades, at(11, 1));
        issue(&mut gate, Suit::Spades, at(11, 2));
        issue(&mut gate, Suit::Spades, at(11, 3));
        assert!(!gate.evaluate(Suit::Spades, at(11, 4)).is_allow());
    }

    #[test]
    fn absolute_block_stacks_and_expires() {
        let mut gate = SuitGate::new();
        gate.block_for(Suit::Diamonds, 5, at(12, 0));
        assert!(!gate.evaluate(Suit::Diamonds, at(12, 2)).is_allow());
        assert!(gate.evaluate(Suit::Diamonds, at(12, 6)).is_allow());
    }

    #[test]
    fn longer_existing_block_is_kept() {
        let mut gate = SuitGate::new();
        gate.block_for(Suit::Hearts, 30, at(12, 0));
        gate.block_for(Suit::Hearts, 5, at(12, 1));
        assert!(!gate.evaluate(Suit::Hearts, at(12, 10)).is_allow());
        assert!(gate.evaluate(Suit::Hearts, at(12, 31)).is_allow());
    }

    #[test]
    fn expired_block_lands_a_fresh_run() {
        let mut gate = SuitGate::new();
        for minute in [0, 1, 2] {
            issue(&mut gate, Suit::Spades, at(10, minute));
        }
        assert!(!gate.evaluate(Suit::Spades, at(10, 10)).is_allow());
        // After the block expires the next issuance starts a new run of one,
        // so two more are allowed before the throttle bites again.
        issue(&mut gate, Suit::Spades, at(10, 40));
        issue(&mut gate, Suit::Spades, at(10, 41));
        issue(&mut gate, Suit::Spades, at(10, 42));
        assert!(!gate.evaluate(Suit::Spades, at(10, 43)).is_allow());
    }
}
