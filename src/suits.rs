//! Card suits and prediction statuses as they appear in channel text.

/// One of the four suits used as the unit of prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Suit {
    Spades,
    Hearts,
    Diamonds,
    Clubs,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Spades, Suit::Hearts, Suit::Diamonds, Suit::Clubs];

    /// Canonical single-character form, used after normalization.
    pub fn plain(self) -> char {
        match self {
            Suit::Spades => '♠',
            Suit::Hearts => '♥',
            Suit::Diamonds => '♦',
            Suit::Clubs => '♣',
        }
    }

    /// Emoji form used in channel messages.
    pub fn glyph(self) -> &'static str {
        match self {
            Suit::Spades => "♠️",
            Suit::Hearts => "❤️",
            Suit::Diamonds => "♦️",
            Suit::Clubs => "♣️",
        }
    }

    /// Display name for outbound prediction messages.
    pub fn display_name(self) -> &'static str {
        match self {
            Suit::Spades => "♠️ Pique",
            Suit::Hearts => "❤️ Cœur",
            Suit::Diamonds => "♦️ Carreau",
            Suit::Clubs => "♣️ Trèfle",
        }
    }
}

/// Prediction status, terminal at exactly one of won(0..=3) or lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Pending,
    /// Won after `level` catch-up attempts (0 = first check).
    Won(u8),
    Lost,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Status::Pending)
    }

    /// Fixed status vocabulary used in the destination channel.
    pub fn glyph(self) -> &'static str {
        match self {
            Status::Pending => "⏳",
            Status::Won(0) => "✅0️⃣",
            Status::Won(1) => "✅1️⃣",
            Status::Won(2) => "✅2️⃣",
            Status::Won(_) => "✅3️⃣",
            Status::Lost => "❌",
        }
    }

    pub fn display(self) -> String {
        match self {
            Status::Pending => "⏳".to_string(),
            Status::Won(_) => format!("{} GAGNÉ", self.glyph()),
            Status::Lost => "❌ PERDU".to_string(),
        }
    }
}

/// Fold the variant glyph encodings of the suits into one canonical form:
/// variation selectors are dropped and the heavy black heart becomes the
/// heart suit, so `❤️`, `❤` and `♥` all compare equal.
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|&c| c != '\u{fe0f}')
        .map(|c| if c == '❤' { '♥' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_encodings_normalize_equal() {
        assert_eq!(normalize("❤️"), normalize("♥"));
        assert_eq!(normalize("♠️"), normalize("♠"));
        for suit in Suit::ALL {
            assert_eq!(normalize(suit.glyph()), suit.plain().to_string());
        }
    }

    #[test]
    fn status_vocabulary() {
        assert_eq!(Status::Pending.display(), "⏳");
        assert_eq!(Status::Won(0).display(), "✅0️⃣ GAGNÉ");
        assert_eq!(Status::Won(3).display(), "✅3️⃣ GAGNÉ");
        assert_eq!(Status::Lost.display(), "❌ PERDU");
        assert!(Status::Won(2).is_terminal());
        assert!(Status::Lost.is_terminal());
        assert!(!Status::Pending.is_terminal());
    }
}
