use std::{sync::Arc, thread, time::Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError, at, never, select};

use crate::{
    config::SpellerConfig,
    debounce::DebounceStateMachine,
    semaphore::{LetterClassifier, arm_codes},
    types::{ArmCodes, BodyFrame, Symbol, SpellerUpdate, UpdateReason},
    word::WordBuffer,
};

/// Everything one spelling session mutates. Not shared: the worker thread owns it.
pub struct Speller {
    config: SpellerConfig,
    classifier: LetterClassifier,
    debounce: DebounceStateMachine,
    word: WordBuffer,
    completed: Arc<[String]>,
    arms: ArmCodes,
    symbol: Symbol,
}

impl Speller {
    pub fn new(config: SpellerConfig) -> Self {
        Self {
            config,
            classifier: LetterClassifier::new(),
            debounce: DebounceStateMachine::new(config.hold_duration),
            word: WordBuffer::new(),
            completed: Arc::from([]),
            arms: ArmCodes::default(),
            symbol: Symbol::None,
        }
    }

    pub fn on_frame(&mut self, frame: &BodyFrame) -> SpellerUpdate {
        let arms = frame.primary_body().map(arm_codes).unwrap_or_default();
        let symbol = self.classifier.classify(arms);

        self.arms = arms;
        self.symbol = symbol;

        let committed = self.debounce.observe(symbol, frame.timestamp);
        if let Some(committed) = committed {
            self.commit(committed);
        }

        self.update(committed, UpdateReason::Frame)
    }

    pub fn on_deadline(&mut self, now: Instant) -> Option<SpellerUpdate> {
        let committed = self.debounce.poll(now)?;
        self.commit(committed);
        Some(self.update(Some(committed), UpdateReason::HoldElapsed))
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.debounce.deadline()
    }

    pub fn word(&self) -> &WordBuffer {
        &self.word
    }

    fn commit(&mut self, symbol: Symbol) {
        self.word.apply(symbol, self.config.word_break);
        if matches!(symbol, Symbol::Reset | Symbol::WordBreak) {
            self.completed = self.word.completed().into();
        }
        log::info!(
            "committed {} -> word \"{}\"",
            symbol.label(),
            self.word.as_str()
        );
    }

    fn update(&self, committed: Option<Symbol>, reason: UpdateReason) -> SpellerUpdate {
        SpellerUpdate {
            arms: self.arms,
            symbol: self.symbol,
            committed,
            word: self.word.as_str().to_string(),
            completed_words: Arc::clone(&self.completed),
            reason,
        }
    }
}

pub fn start_speller(
    config: SpellerConfig,
    frame_rx: Receiver<BodyFrame>,
    update_tx: Sender<SpellerUpdate>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        log::info!(
            "speller ready (hold {:?}, word break {:?})",
            config.hold_duration,
            config.word_break
        );
        run_speller_loop(Speller::new(config), frame_rx, update_tx);
        log::info!("frame source closed, speller stopped");
    })
}

enum Wake {
    Frame(BodyFrame),
    Deadline(Instant),
    Closed,
}

fn run_speller_loop(
    mut speller: Speller,
    frame_rx: Receiver<BodyFrame>,
    update_tx: Sender<SpellerUpdate>,
) {
    // One hold timer at a time; it is only rebuilt when the deadline moves.
    let mut armed = None;
    let mut timer: Receiver<Instant> = never();

    loop {
        let wake = select! {
            recv(frame_rx) -> frame => frame.map(Wake::Frame).unwrap_or(Wake::Closed),
            recv(timer) -> fired => Wake::Deadline(fired.unwrap_or_else(|_| Instant::now())),
        };

        let update = match wake {
            Wake::Frame(frame) => Some(speller.on_frame(&frame)),
            Wake::Deadline(now) => {
                // `at` fires once; force a re-arm even if the deadline did not move.
                armed = None;
                // Frames queued before the timer was serviced may have moved the candidate.
                for frame in frame_rx.try_iter() {
                    publish(&update_tx, speller.on_frame(&frame));
                }
                speller.on_deadline(now)
            }
            Wake::Closed => break,
        };

        let deadline = speller.deadline();
        if deadline != armed {
            timer = match deadline {
                Some(deadline) => at(deadline),
                None => never(),
            };
            armed = deadline;
        }

        if let Some(update) = update {
            publish(&update_tx, update);
        }
    }
}

fn publish(update_tx: &Sender<SpellerUpdate>, update: SpellerUpdate) {
    // Each update carries the whole word, so a dropped one is healed by the next.
    match update_tx.try_send(update) {
        Ok(()) => {}
        Err(TrySendError::Full(update)) => {
            log::warn!("display is behind, dropping update for {}", update.symbol.label());
        }
        Err(TrySendError::Disconnected(_)) => {}
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crossbeam_channel::bounded;

    use super::*;
    use crate::{
        pipeline::replay::pose_body,
        types::{Body, ClockCode},
        word::WordBreakPolicy,
    };

    const HOLD: Duration = Duration::from_millis(3_000);
    const FRAME: Duration = Duration::from_millis(33);

    fn frame(body: Body, timestamp: Instant) -> BodyFrame {
        BodyFrame {
            bodies: vec![body],
            timestamp,
        }
    }

    fn pose(speller: &Speller, symbol: Symbol) -> Body {
        let arms = speller
            .classifier
            .pose_for(symbol)
            .unwrap_or_else(|| panic!("no pose for {symbol:?}"));
        pose_body(arms)
    }

    fn rest() -> Body {
        pose_body(ArmCodes::new(ClockCode::None, ClockCode::None))
    }

    /// Feeds `symbol` at 30 fps for `duration`, then returns the next timestamp.
    fn hold(speller: &mut Speller, symbol: Symbol, start: Instant, duration: Duration) -> Instant {
        let body = pose(speller, symbol);
        let mut now = start;
        while now <= start + duration {
            speller.on_frame(&frame(body.clone(), now));
            now += FRAME;
        }
        now
    }

    fn spell(speller: &mut Speller, symbols: &[Symbol], start: Instant) -> Instant {
        let mut now = start;
        for &symbol in symbols {
            now = hold(speller, symbol, now, HOLD + Duration::from_millis(10));
            // Bent arms in between so the same letter twice forms two holds.
            for _ in 0..10 {
                speller.on_frame(&frame(rest(), now));
                now += FRAME;
            }
        }
        now
    }

    #[test]
    fn frame_update_reports_arms_and_symbol() {
        let mut speller = Speller::new(SpellerConfig::default());
        let body = pose(&speller, Symbol::A);
        let update = speller.on_frame(&frame(body, Instant::now()));

        assert_eq!(
            update.arms,
            ArmCodes::new(ClockCode::Four, ClockCode::Six)
        );
        assert_eq!(update.symbol, Symbol::A);
        assert_eq!(update.committed, None);
        assert_eq!(update.reason, UpdateReason::Frame);
        assert!(speller.deadline().is_some());
    }

    #[test]
    fn spells_cat() {
        let mut speller = Speller::new(SpellerConfig::default());
        spell(&mut speller, &[Symbol::C, Symbol::A, Symbol::T], Instant::now());
        assert_eq!(speller.word().as_str(), "CAT");
    }

    #[test]
    fn double_letters_need_two_holds() {
        let mut speller = Speller::new(SpellerConfig::default());
        spell(&mut speller, &[Symbol::O, Symbol::O], Instant::now());
        assert_eq!(speller.word().as_str(), "OO");
    }

    #[test]
    fn short_hold_never_commits() {
        let mut speller = Speller::new(SpellerConfig::default());
        let t0 = Instant::now();
        let next = hold(&mut speller, Symbol::D, t0, Duration::from_millis(2_000));
        hold(&mut speller, Symbol::E, next, Duration::from_millis(500));

        assert_eq!(speller.on_deadline(t0 + HOLD + FRAME), None);
        assert_eq!(speller.word().as_str(), "");
    }

    #[test]
    fn reset_pose_clears_word() {
        let mut speller = Speller::new(SpellerConfig::default());
        let next = spell(&mut speller, &[Symbol::H, Symbol::I], Instant::now());
        assert_eq!(speller.word().as_str(), "HI");

        spell(&mut speller, &[Symbol::Reset], next);
        assert_eq!(speller.word().as_str(), "");
    }

    #[test]
    fn word_break_follows_policy() {
        let config = SpellerConfig::default().with_word_break(WordBreakPolicy::Finalize);
        let mut speller = Speller::new(config);
        spell(
            &mut speller,
            &[Symbol::N, Symbol::O, Symbol::WordBreak, Symbol::G],
            Instant::now(),
        );
        assert_eq!(speller.word().completed(), ["NO".to_string()]);
        assert_eq!(speller.word().as_str(), "G");
    }

    #[test]
    fn updates_share_completed_words_until_one_is_finalized() {
        let config = SpellerConfig::default().with_word_break(WordBreakPolicy::Finalize);
        let mut speller = Speller::new(config);
        let next = spell(&mut speller, &[Symbol::O, Symbol::K, Symbol::WordBreak], Instant::now());

        let body = pose(&speller, Symbol::B);
        let first = speller.on_frame(&frame(body.clone(), next));
        let second = speller.on_frame(&frame(body, next + FRAME));
        assert_eq!(&*first.completed_words, ["OK".to_string()]);
        assert!(Arc::ptr_eq(&first.completed_words, &second.completed_words));

        let end = spell(&mut speller, &[Symbol::B, Symbol::WordBreak], next + FRAME * 2);
        let third = speller.on_frame(&frame(rest(), end));
        assert_eq!(&*third.completed_words, ["OK".to_string(), "B".to_string()]);
        assert!(!Arc::ptr_eq(&first.completed_words, &third.completed_words));
    }

    #[test]
    fn deadline_commit_without_frames() {
        let mut speller = Speller::new(SpellerConfig::default());
        let t0 = Instant::now();
        speller.on_frame(&frame(pose(&speller, Symbol::W), t0));

        assert_eq!(speller.on_deadline(t0 + Duration::from_millis(1_000)), None);
        let update = speller
            .on_deadline(t0 + HOLD)
            .expect("hold should have elapsed");
        assert_eq!(update.committed, Some(Symbol::W));
        assert_eq!(update.reason, UpdateReason::HoldElapsed);
        assert_eq!(update.word, "W");
        assert_eq!(speller.deadline(), None);
    }

    #[test]
    fn untracked_bodies_are_ignored() {
        let mut speller = Speller::new(SpellerConfig::default());
        let mut body = pose(&speller, Symbol::Z);
        body.tracked = false;

        let update = speller.on_frame(&frame(body, Instant::now()));
        assert_eq!(update.arms, ArmCodes::default());
        assert_eq!(update.symbol, Symbol::None);
        assert_eq!(speller.deadline(), None);
    }

    #[test]
    fn worker_commits_on_timer_and_stops_with_source() {
        let config = SpellerConfig::default().with_hold_duration(Duration::from_millis(40));
        let (frame_tx, frame_rx) = bounded(4);
        let (update_tx, update_rx) = bounded(64);
        let handle = start_speller(config, frame_rx, update_tx);

        let body = pose_body(ArmCodes::new(ClockCode::Ten, ClockCode::Seven));
        frame_tx
            .send(frame(body, Instant::now()))
            .expect("worker is running");

        let first = update_rx
            .recv_timeout(Duration::from_secs(2))
            .expect("frame update");
        assert_eq!(first.symbol, Symbol::X);
        assert_eq!(first.committed, None);

        // No further frames: only the hold timer can produce this.
        let second = update_rx
            .recv_timeout(Duration::from_secs(2))
            .expect("timer update");
        assert_eq!(second.committed, Some(Symbol::X));
        assert_eq!(second.reason, UpdateReason::HoldElapsed);
        assert_eq!(second.word, "X");

        drop(frame_tx);
        handle.join().expect("worker exits cleanly");
        assert!(update_rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn queued_frame_from_before_deadline_is_seen_before_timer_commit() {
        let config = SpellerConfig::default().with_hold_duration(Duration::from_millis(1_000));
        let (frame_tx, frame_rx) = bounded(4);
        let (update_tx, update_rx) = bounded(64);

        // X's hold already ran out in wall-clock time, but A was stamped before
        // X's deadline and is waiting behind it when the timer fires.
        let t0 = Instant::now() - Duration::from_millis(1_500);
        let x = pose_body(ArmCodes::new(ClockCode::Ten, ClockCode::Seven));
        let a = pose_body(ArmCodes::new(ClockCode::Four, ClockCode::Six));
        frame_tx.send(frame(x, t0)).expect("queue has room");
        frame_tx
            .send(frame(a, t0 + Duration::from_millis(300)))
            .expect("queue has room");
        let handle = start_speller(config, frame_rx, update_tx);

        let mut updates = Vec::new();
        while let Ok(update) = update_rx.recv_timeout(Duration::from_secs(2)) {
            let done = update.committed.is_some();
            updates.push(update);
            if done {
                break;
            }
        }
        drop(frame_tx);
        handle.join().expect("worker exits cleanly");

        let commits: Vec<_> = updates.iter().filter_map(|u| u.committed).collect();
        assert_eq!(commits, [Symbol::A]);
        let last = updates.last().expect("updates were published");
        assert_eq!(last.reason, UpdateReason::HoldElapsed);
        assert_eq!(last.word, "A");
    }
}
