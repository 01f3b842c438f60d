//! Character-count token estimation.
//!
//! A real tokenizer is not reproduced. CJK ideographs pack more meaning per
//! character than Latin text under typical sub-word vocabularies, so they are
//! weighted at ~1.5 characters per token versus 4 for everything else.

use crate::Message;

/// Characters per token for CJK ideographs.
pub const CJK_CHARS_PER_TOKEN: f64 = 1.5;

/// Characters per token for all other characters.
pub const OTHER_CHARS_PER_TOKEN: f64 = 4.0;

/// Whether `c` falls in the common Chinese ideograph block.
pub fn is_cjk(c: char) -> bool {
    ('\u{4E00}'..='\u{9FA5}').contains(&c)
}

/// Running character tally, split by script class.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CharCounts {
    pub cjk: usize,
    pub other: usize,
}

impl CharCounts {
    /// Tally the characters of `text`.
    pub fn of(text: &str) -> Self {
        let mut counts = Self::default();
        counts.add(text);
        counts
    }

    /// Add the characters of `text` to the tally.
    pub fn add(&mut self, text: &str) {
        for c in text.chars() {
            if is_cjk(c) {
                self.cjk += 1;
            } else {
                self.other += 1;
            }
        }
    }

    /// `ceil(cjk / 1.5 + other / 4)`.
    pub fn tokens(&self) -> usize {
        let raw = self.cjk as f64 / CJK_CHARS_PER_TOKEN + self.other as f64 / OTHER_CHARS_PER_TOKEN;
        raw.ceil() as usize
    }
}

/// Estimate the token count of `text`. Empty text costs nothing.
pub fn estimate_tokens(text: &str) -> usize {
    CharCounts::of(text).tokens()
}

/// Estimate the token count of the concatenated contents of `messages`.
///
/// Rounds once over the whole concatenation rather than per message.
pub fn estimate_message_tokens(messages: &[Message]) -> usize {
    messages
        .iter()
        .fold(CharCounts::default(), |mut acc, m| {
            acc.add(&m.content);
            acc
        })
        .tokens()
}
