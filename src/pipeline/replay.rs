use std::{
    collections::{BTreeMap, HashMap},
    io::{BufRead, Write},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{Sender, TrySendError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    semaphore::LetterClassifier,
    types::{
        ArmCodes, ArmSide, Body, BodyFrame, ClockCode, Joint, JointId, Point2, Symbol,
        TrackingState,
    },
};

const FRAME_INTERVAL_MS: u64 = 33;
const REST_MS: u64 = 500;
const ARM_LENGTH: f64 = 100.0;
const SHOULDER_Y: f64 = 150.0;
const SHOULDER_RIGHT_X: f64 = 200.0;
const SHOULDER_LEFT_X: f64 = 300.0;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to read or write replay")]
    Io(#[from] std::io::Error),
    #[error("line {line}: invalid frame")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("line {line}: timestamp goes backwards")]
    NonMonotonic { line: usize },
    #[error("no semaphore pose for {0:?}")]
    Unspellable(char),
    #[error("hold {0:?} is out of range for a scripted replay")]
    InvalidHold(Duration),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplayJoint {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub state: TrackingState,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplayBody {
    #[serde(default = "default_tracked")]
    pub tracked: bool,
    pub joints: BTreeMap<JointId, ReplayJoint>,
}

fn default_tracked() -> bool {
    true
}

/// One line of a replay file: joint positions at `t_ms` after the start.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplayFrame {
    pub t_ms: u64,
    #[serde(default)]
    pub bodies: Vec<ReplayBody>,
}

impl ReplayFrame {
    pub fn to_body_frame(&self, timestamp: Instant) -> BodyFrame {
        let bodies = self
            .bodies
            .iter()
            .map(|body| Body {
                tracked: body.tracked,
                joints: body
                    .joints
                    .iter()
                    .map(|(&id, joint)| {
                        (
                            id,
                            Joint {
                                position: Point2::new(joint.x, joint.y),
                                tracking: joint.state,
                            },
                        )
                    })
                    .collect::<HashMap<_, _>>(),
            })
            .collect();

        BodyFrame { bodies, timestamp }
    }
}

pub fn parse_replay<R: BufRead>(reader: R) -> Result<Vec<ReplayFrame>, ReplayError> {
    let mut frames: Vec<ReplayFrame> = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let frame: ReplayFrame = serde_json::from_str(trimmed).map_err(|source| {
            ReplayError::Parse {
                line: line_no,
                source,
            }
        })?;

        if frames.last().is_some_and(|prev| frame.t_ms < prev.t_ms) {
            return Err(ReplayError::NonMonotonic { line: line_no });
        }
        frames.push(frame);
    }

    Ok(frames)
}

pub fn write_replay<W: Write>(frames: &[ReplayFrame], mut writer: W) -> Result<(), ReplayError> {
    for frame in frames {
        serde_json::to_writer(&mut writer, frame).map_err(std::io::Error::from)?;
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

fn direction(code: ClockCode) -> Option<(f64, f64)> {
    let diag = std::f64::consts::FRAC_1_SQRT_2;
    // Screen space: y grows downwards.
    match code {
        ClockCode::None => None,
        ClockCode::Twelve => Some((0.0, -1.0)),
        ClockCode::One => Some((diag, -diag)),
        ClockCode::Three => Some((1.0, 0.0)),
        ClockCode::Four => Some((diag, diag)),
        ClockCode::Six => Some((0.0, 1.0)),
        ClockCode::Seven => Some((-diag, diag)),
        ClockCode::Nine => Some((-1.0, 0.0)),
        ClockCode::Ten => Some((-diag, -diag)),
    }
}

fn arm_joints(side: ArmSide, code: ClockCode) -> [(JointId, Point2); 3] {
    let (shoulder_id, elbow_id, hand_id) = side.joints();
    let shoulder = match side {
        ArmSide::Right => Point2::new(SHOULDER_RIGHT_X, SHOULDER_Y),
        ArmSide::Left => Point2::new(SHOULDER_LEFT_X, SHOULDER_Y),
    };

    let (elbow, hand) = match direction(code) {
        Some((dx, dy)) => (
            Point2::new(
                shoulder.x + dx * ARM_LENGTH / 2.0,
                shoulder.y + dy * ARM_LENGTH / 2.0,
            ),
            Point2::new(shoulder.x + dx * ARM_LENGTH, shoulder.y + dy * ARM_LENGTH),
        ),
        // Bent at a right angle: never passes the straightness check.
        None => (
            Point2::new(shoulder.x, shoulder.y + ARM_LENGTH / 2.0),
            Point2::new(shoulder.x + ARM_LENGTH / 2.0, shoulder.y + ARM_LENGTH / 2.0),
        ),
    };

    [(shoulder_id, shoulder), (elbow_id, elbow), (hand_id, hand)]
}

/// A tracked body whose arms point at `arms`.
pub fn pose_body(arms: ArmCodes) -> Body {
    let joints = arm_joints(ArmSide::Right, arms.right)
        .into_iter()
        .chain(arm_joints(ArmSide::Left, arms.left))
        .map(|(id, p)| (id, Joint::tracked(p.x, p.y)))
        .collect();

    Body {
        tracked: true,
        joints,
    }
}

fn pose_replay_frame(t_ms: u64, arms: ArmCodes) -> ReplayFrame {
    let joints = arm_joints(ArmSide::Right, arms.right)
        .into_iter()
        .chain(arm_joints(ArmSide::Left, arms.left))
        .map(|(id, p)| {
            (
                id,
                ReplayJoint {
                    x: p.x,
                    y: p.y,
                    state: TrackingState::Tracked,
                },
            )
        })
        .collect();

    ReplayFrame {
        t_ms,
        bodies: vec![ReplayBody {
            tracked: true,
            joints,
        }],
    }
}

fn symbol_for(ch: char) -> Option<Symbol> {
    match ch {
        ' ' => Some(Symbol::WordBreak),
        '-' => Some(Symbol::Reset),
        _ => Symbol::from_letter(ch),
    }
}

/// Builds a replay that spells `text`: each pose is held for just under
/// `hold`, then the arms rest long enough for the hold timer to fire.
/// A space is the word break pose and `-` the reset pose. The hold must
/// cover at least one frame interval.
pub fn script_frames(text: &str, hold: Duration) -> Result<Vec<ReplayFrame>, ReplayError> {
    let hold_ms = u64::try_from(hold.as_millis())
        .ok()
        .filter(|&ms| ms >= FRAME_INTERVAL_MS)
        .ok_or(ReplayError::InvalidHold(hold))?;
    let classifier = LetterClassifier::new();
    let rest = ArmCodes::new(ClockCode::None, ClockCode::None);

    let mut frames = Vec::new();
    let mut t_ms = 0;
    for ch in text.chars() {
        let arms = symbol_for(ch)
            .and_then(|symbol| classifier.pose_for(symbol))
            .ok_or(ReplayError::Unspellable(ch))?;

        let pose_end = t_ms + hold_ms;
        while t_ms < pose_end {
            frames.push(pose_replay_frame(t_ms, arms));
            t_ms += FRAME_INTERVAL_MS;
        }

        let rest_end = t_ms + REST_MS;
        while t_ms < rest_end {
            frames.push(pose_replay_frame(t_ms, rest));
            t_ms += FRAME_INTERVAL_MS;
        }
    }

    Ok(frames)
}

#[derive(Debug)]
pub struct ReplayStream {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ReplayStream {
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    /// Blocks until every frame has been delivered.
    pub fn wait(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ReplayStream {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Plays `frames` in real time. Each frame is stamped with its scheduled
/// instant so hold timing does not pick up thread scheduling jitter.
pub fn start_replay(frames: Vec<ReplayFrame>, frame_tx: Sender<BodyFrame>) -> ReplayStream {
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();

    let handle = thread::spawn(move || {
        let start = Instant::now();
        log::info!("replaying {} frames", frames.len());

        for frame in &frames {
            let scheduled = start + Duration::from_millis(frame.t_ms);
            thread::sleep(scheduled.saturating_duration_since(Instant::now()));
            if stop_flag.load(Ordering::Relaxed) {
                log::debug!("replay stopped at {} ms", frame.t_ms);
                return;
            }

            match frame_tx.try_send(frame.to_body_frame(scheduled)) {
                Ok(()) => {}
                // Drop if the speller is busy.
                Err(TrySendError::Full(_)) => {
                    log::debug!("speller busy, dropped frame at {} ms", frame.t_ms);
                }
                Err(TrySendError::Disconnected(_)) => {
                    log::warn!("speller went away, stopping replay");
                    return;
                }
            }
        }

        log::info!("replay finished after {:?}", start.elapsed());
    });

    ReplayStream {
        stop,
        handle: Some(handle),
    }
}
