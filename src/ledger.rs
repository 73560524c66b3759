//! Prediction queue and pending ledger.
//!
//! Queued entries wait for the next finalized source message; pending
//! entries have been promoted (and, for fresh predictions, sent) and are
//! awaiting resolution. Both are keyed by target game number, which is
//! what makes the retry-supersession rule enforceable: at most one entry
//! per target on each side, and a retry tracker is the original
//! prediction re-keyed to its next chance.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

use crate::suits::{Status, Suit};

/// Message id of the prediction message in the destination channel.
pub type MessageRef = i64;

/// A promoted prediction awaiting its outcome.
#[derive(Debug, Clone)]
pub struct Prediction {
    pub target_game: u64,
    pub suit: Suit,
    pub base_game: u64,
    pub status: Status,
    /// 0 for the first check, 1..=3 while on the catch-up ladder.
    pub retry_index: u8,
    /// Game number the prediction was originally published for.
    pub original_game: u64,
    pub created_at: DateTime<Utc>,
    pub message_ref: Option<MessageRef>,
}

/// A prediction waiting to be promoted on the next finalize event.
#[derive(Debug, Clone)]
pub struct QueuedPrediction {
    pub target_game: u64,
    pub suit: Suit,
    pub base_game: u64,
    pub retry_index: u8,
    pub original_game: u64,
    pub created_at: DateTime<Utc>,
    /// Retry entries carry the original's message ref forward so the
    /// terminal edit lands on the message that was actually sent.
    pub carried_ref: Option<MessageRef>,
}

impl QueuedPrediction {
    pub fn fresh(target_game: u64, suit: Suit, base_game: u64, created_at: DateTime<Utc>) -> Self {
        Self {
            target_game,
            suit,
            base_game,
            retry_index: 0,
            original_game: target_game,
            created_at,
            carried_ref: None,
        }
    }

    pub fn is_retry(&self) -> bool {
        self.retry_index > 0
    }

    pub fn into_pending(self) -> Prediction {
        Prediction {
            target_game: self.target_game,
            suit: self.suit,
            base_game: self.base_game,
            status: Status::Pending,
            retry_index: self.retry_index,
            original_game: self.original_game,
            created_at: self.created_at,
            message_ref: self.carried_ref,
        }
    }
}

#[derive(Debug, Default)]
pub struct Ledger {
    queued: BTreeMap<u64, QueuedPrediction>,
    pending: HashMap<u64, Prediction>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a queued entry unless its target is already covered by the
    /// queue or by a pending non-retry prediction. Returns false without
    /// mutating on rejection.
    pub fn enqueue(&mut self, entry: QueuedPrediction) -> bool {
        if self.queued.contains_key(&entry.target_game) {
            return false;
        }
        if let Some(pending) = self.pending.get(&entry.target_game) {
            if pending.retry_index == 0 {
                return false;
            }
        }
        self.queued.insert(entry.target_game, entry);
        true
    }

    /// Take the whole queue, in ascending target order.
    pub fn drain_queued(&mut self) -> Vec<QueuedPrediction> {
        std::mem::take(&mut self.queued).into_values().collect()
    }

    pub fn pending(&self, target_game: u64) -> Option<&Prediction> {
        self.pending.get(&target_game)
    }

    pub fn insert_pending(&mut self, prediction: Prediction) {
        self.pending.insert(prediction.target_game, prediction);
    }

    pub fn remove_pending(&mut self, target_game: u64) -> Option<Prediction> {
        self.pending.remove(&target_game)
    }

    pub fn queued_count(&self) -> usize {
        self.queued.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn clear(&mut self) {
        self.queued.clear();
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn duplicate_target_rejected() {
        let mut ledger = Ledger::new();
        assert!(ledger.enqueue(QueuedPrediction::fresh(102, Suit::Spades, 101, now())));
        assert!(!ledger.enqueue(QueuedPrediction::fresh(102, Suit::Hearts, 101, now())));
        assert_eq!(ledger.queued_count(), 1);
    }

    #[test]
    fn pending_non_retry_blocks_enqueue() {
        let mut ledger = Ledger::new();
        ledger.insert_pending(QueuedPrediction::fresh(102, Suit::Spades, 101, now()).into_pending());
        assert!(!ledger.enqueue(QueuedPrediction::fresh(102, Suit::Hearts, 101, now())));
    }

    #[test]
    fn pending_retry_does_not_block_enqueue() {
        let mut ledger = Ledger::new();
        let mut retry = QueuedPrediction::fresh(102, Suit::Spades, 101, now());
        retry.retry_index = 1;
        retry.original_game = 101;
        ledger.insert_pending(retry.into_pending());
        assert!(ledger.enqueue(QueuedPrediction::fresh(102, Suit::Hearts, 101, now())));
    }

    #[test]
    fn drain_is_ascending() {
        let mut ledger = Ledger::new();
        for target in [105, 102, 109, 103] {
            assert!(ledger.enqueue(QueuedPrediction::fresh(target, Suit::Clubs, 100, now())));
        }
        let targets: Vec<u64> = ledger.drain_queued().iter().map(|q| q.target_game).collect();
        assert_eq!(targets, vec![102, 103, 105, 109]);
        assert_eq!(ledger.queued_count(), 0);
    }

    #[test]
    fn clear_empties_both_sides() {
        let mut ledger = Ledger::new();
        ledger.enqueue(QueuedPrediction::fresh(102, Suit::Spades, 101, now()));
        ledger.insert_pending(QueuedPrediction::fresh(103, Suit::Hearts, 101, now()).into_pending());
        ledger.clear();
        assert_eq!(ledger.queued_count(), 0);
        assert_eq!(ledger.pending_count(), 0);
    }
}
