//! Pure text extraction over channel messages.
//!
//! The source channels publish free-form text: result messages carry a
//! `#N <number>` marker and parenthesized card groups, the stats channel
//! carries per-suit counters like `♠️ : 12`. Everything here is a pure
//! function over the text; callers treat a failed extraction as "ignore
//! this message".

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::suits::{self, Suit};

/// Marker identifying per-suit counter messages on the stats channel.
pub const STATS_MARKER: &str = "Compteur instantané";

const FINGERPRINT_PREFIX_CHARS: usize = 48;

static RE_GAME_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)#N\s*(\d+)\.?").unwrap());
static RE_RESULT_GROUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(([^)]*)\)").unwrap());
static RE_SUIT_COUNTS: LazyLock<Vec<(Suit, Regex)>> = LazyLock::new(|| {
    Suit::ALL
        .iter()
        .map(|&suit| {
            let re = Regex::new(&format!(r"{}\s*:\s*(\d+)", suit.plain())).unwrap();
            (suit, re)
        })
        .collect()
});

/// Game identifier tagged by the `#N` marker, if present.
pub fn extract_game_number(text: &str) -> Option<u64> {
    RE_GAME_NUMBER
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Contents of every parenthesized segment, in textual order.
pub fn extract_result_groups(text: &str) -> Vec<String> {
    RE_RESULT_GROUP
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Per-suit counters from a stats message. Suits without a readable
/// counter are absent from the map, not zero.
pub fn parse_stats(text: &str) -> HashMap<Suit, u32> {
    let normalized = suits::normalize(text);
    let mut counts = HashMap::new();
    for (suit, re) in RE_SUIT_COUNTS.iter() {
        if let Some(value) = re
            .captures(&normalized)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
        {
            counts.insert(*suit, value);
        }
    }
    counts
}

/// Whether a result group contains the suit, under glyph normalization.
pub fn suit_in_group(group: &str, suit: Suit) -> bool {
    suits::normalize(group).contains(suit.plain())
}

/// A round is finalized once the in-progress clock is gone and a
/// completion mark is present.
pub fn is_finalized(text: &str) -> bool {
    !text.contains('⏰') && (text.contains('✅') || text.contains('🔰'))
}

pub fn is_stats_message(text: &str) -> bool {
    text.contains(STATS_MARKER)
}

/// Duplicate-suppression key: the game number plus a fixed-length text
/// prefix, so a trivial edit is suppressed while a content change (e.g.
/// in-progress -> finalized) is processed.
pub fn fingerprint(game: u64, text: &str) -> String {
    let prefix: String = text.chars().take(FINGERPRINT_PREFIX_CHARS).collect();
    format!("{game}:{prefix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_number_variants() {
        assert_eq!(extract_game_number("🎲 #N 952. ✅"), Some(952));
        assert_eq!(extract_game_number("#n104"), Some(104));
        assert_eq!(extract_game_number("#N 7."), Some(7));
        assert_eq!(extract_game_number("numéro 952"), None);
        assert_eq!(extract_game_number(""), None);
    }

    #[test]
    fn result_groups_in_order() {
        let text = "#N 12 ✅ (♠️K ❤️3) contre (♦️A)";
        assert_eq!(extract_result_groups(text), vec!["♠️K ❤️3", "♦️A"]);
        assert!(extract_result_groups("no groups here").is_empty());
        assert_eq!(extract_result_groups("empty ()"), vec![""]);
    }

    #[test]
    fn stats_counts_with_variant_glyphs() {
        let text = "Compteur instantané\n♠️ : 4\n❤️ : 9\n♦ : 12";
        let counts = parse_stats(text);
        assert_eq!(counts.get(&Suit::Spades), Some(&4));
        assert_eq!(counts.get(&Suit::Hearts), Some(&9));
        assert_eq!(counts.get(&Suit::Diamonds), Some(&12));
        assert_eq!(counts.get(&Suit::Clubs), None);
    }

    #[test]
    fn suit_containment_across_encodings() {
        assert!(suit_in_group("♠️K ❤️3", Suit::Spades));
        assert!(suit_in_group("♠️K ❤️3", Suit::Hearts));
        assert!(suit_in_group("♥A", Suit::Hearts));
        assert!(!suit_in_group("♠️K ❤️3", Suit::Clubs));
        assert!(!suit_in_group("", Suit::Diamonds));
    }

    #[test]
    fn finalized_detection() {
        assert!(is_finalized("#N 12 ✅ (♠️K)"));
        assert!(is_finalized("#N 12 🔰 (♠️K)"));
        assert!(!is_finalized("#N 12 ⏰ en cours"));
        assert!(!is_finalized("#N 12 ⏰ ✅ (♠️K)"));
        assert!(!is_finalized("#N 12 (♠️K)"));
    }

    #[test]
    fn fingerprints_track_content_changes() {
        let in_progress = fingerprint(12, "#N 12 ⏰ en cours");
        let finalized = fingerprint(12, "#N 12 ✅ (♠️K)");
        assert_ne!(in_progress, finalized);
        assert_eq!(finalized, fingerprint(12, "#N 12 ✅ (♠️K)"));
    }
}
