use crate::types::Symbol;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum WordBreakPolicy {
    /// Append a space and keep spelling into the same buffer.
    #[default]
    #[value(name = "space")]
    AppendSpace,
    /// Move the current word to the completed list and start a new one.
    #[value(name = "finalize")]
    Finalize,
}

/// Letters confirmed so far. Only committed symbols mutate it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WordBuffer {
    current: String,
    completed: Vec<String>,
}

impl WordBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, letter: char) {
        self.current.push(letter);
    }

    pub fn reset(&mut self) {
        self.current.clear();
        self.completed.clear();
    }

    pub fn as_str(&self) -> &str {
        &self.current
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty() && self.completed.is_empty()
    }

    pub fn completed(&self) -> &[String] {
        &self.completed
    }

    pub fn apply(&mut self, symbol: Symbol, policy: WordBreakPolicy) {
        match symbol {
            Symbol::Reset => self.reset(),
            Symbol::WordBreak => match policy {
                WordBreakPolicy::AppendSpace => self.current.push(' '),
                WordBreakPolicy::Finalize => {
                    if !self.current.is_empty() {
                        self.completed.push(std::mem::take(&mut self.current));
                    }
                }
            },
            Symbol::None => {}
            letter => {
                if let Some(ch) = letter.letter() {
                    self.push(ch);
                }
            }
        }
    }
}
