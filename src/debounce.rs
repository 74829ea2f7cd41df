use std::time::{Duration, Instant};

use crate::types::Symbol;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DebouncePhase {
    Idle,
    Holding { candidate: Symbol, started_at: Instant },
    Committed { symbol: Symbol, at: Instant },
}

/// Hold-to-confirm filter over per-frame classifications.
///
/// A symbol is committed once it has been the candidate for `hold_duration`.
/// `None` frames leave a pending hold untouched; only a different symbol
/// restarts it. After a commit the machine waits for the next frame to start
/// a fresh hold, so a pose that is kept up commits once per hold cycle.
///
/// Completion is checked both on frame arrival ([`observe`](Self::observe))
/// and by the owner's timer ([`poll`](Self::poll)); whichever sees the
/// deadline first commits and the other finds nothing left to do. A frame
/// with a new symbol stamped at or after the deadline still commits the old
/// hold before starting its own. Frames stamped before the last commit
/// arrived late and are ignored.
#[derive(Debug)]
pub struct DebounceStateMachine {
    hold_duration: Duration,
    phase: DebouncePhase,
}

impl DebounceStateMachine {
    pub fn new(hold_duration: Duration) -> Self {
        Self {
            hold_duration,
            phase: DebouncePhase::Idle,
        }
    }

    pub fn phase(&self) -> DebouncePhase {
        self.phase
    }

    pub fn candidate(&self) -> Symbol {
        match self.phase {
            DebouncePhase::Holding { candidate, .. } => candidate,
            _ => Symbol::None,
        }
    }

    /// When the pending hold completes, if one is pending.
    pub fn deadline(&self) -> Option<Instant> {
        match self.phase {
            DebouncePhase::Holding { started_at, .. } => Some(started_at + self.hold_duration),
            _ => None,
        }
    }

    pub fn observe(&mut self, symbol: Symbol, now: Instant) -> Option<Symbol> {
        if symbol.is_none() {
            return None;
        }

        match self.phase {
            DebouncePhase::Holding { candidate, .. } if candidate == symbol => self.poll(now),
            DebouncePhase::Committed { at, .. } if now < at => {
                log::debug!("ignoring {} stamped before the last commit", symbol.label());
                None
            }
            _ => {
                // A hold that ran out before this frame was taken still counts.
                let completed = self.poll(now);
                log::debug!("new hold candidate {}", symbol.label());
                self.phase = DebouncePhase::Holding {
                    candidate: symbol,
                    started_at: now,
                };
                completed
            }
        }
    }

    pub fn poll(&mut self, now: Instant) -> Option<Symbol> {
        let DebouncePhase::Holding {
            candidate,
            started_at,
        } = self.phase
        else {
            return None;
        };

        if now.saturating_duration_since(started_at) < self.hold_duration {
            return None;
        }

        self.phase = DebouncePhase::Committed {
            symbol: candidate,
            at: now,
        };
        Some(candidate)
    }
}
