use std::time::Duration;

use crate::word::WordBreakPolicy;

pub const DEFAULT_HOLD: Duration = Duration::from_millis(3_000);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpellerConfig {
    /// How long a pose must stay put before its letter is confirmed.
    pub hold_duration: Duration,
    pub word_break: WordBreakPolicy,
}

impl SpellerConfig {
    pub fn with_hold_duration(mut self, hold_duration: Duration) -> Self {
        self.hold_duration = hold_duration;
        self
    }

    pub fn with_word_break(mut self, word_break: WordBreakPolicy) -> Self {
        self.word_break = word_break;
        self
    }
}

impl Default for SpellerConfig {
    fn default() -> Self {
        Self {
            hold_duration: DEFAULT_HOLD,
            word_break: WordBreakPolicy::default(),
        }
    }
}
