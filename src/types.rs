use std::{collections::HashMap, sync::Arc, time::Instant};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point2) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum JointId {
    SpineBase,
    SpineMid,
    Neck,
    Head,
    ShoulderLeft,
    ElbowLeft,
    WristLeft,
    HandLeft,
    ShoulderRight,
    ElbowRight,
    WristRight,
    HandRight,
    HipLeft,
    KneeLeft,
    AnkleLeft,
    FootLeft,
    HipRight,
    KneeRight,
    AnkleRight,
    FootRight,
    SpineShoulder,
    HandTipLeft,
    ThumbLeft,
    HandTipRight,
    ThumbRight,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackingState {
    #[default]
    Tracked,
    Inferred,
    NotTracked,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Joint {
    pub position: Point2,
    pub tracking: TrackingState,
}

impl Joint {
    pub fn tracked(x: f64, y: f64) -> Self {
        Self {
            position: Point2::new(x, y),
            tracking: TrackingState::Tracked,
        }
    }

    /// Position if the joint can take part in geometry at all.
    pub fn usable_position(&self) -> Option<Point2> {
        match self.tracking {
            TrackingState::NotTracked => None,
            _ if !self.position.is_finite() => None,
            _ => Some(self.position),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Body {
    pub tracked: bool,
    pub joints: HashMap<JointId, Joint>,
}

impl Body {
    pub fn joint_position(&self, id: JointId) -> Option<Point2> {
        self.joints.get(&id).and_then(Joint::usable_position)
    }
}

#[derive(Clone, Debug)]
pub struct BodyFrame {
    pub bodies: Vec<Body>,
    pub timestamp: Instant,
}

impl BodyFrame {
    /// Only one body spells at a time: the first one the tracker reports as tracked.
    pub fn primary_body(&self) -> Option<&Body> {
        self.bodies.iter().find(|body| body.tracked)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArmSide {
    Left,
    Right,
}

impl ArmSide {
    /// (shoulder, elbow, hand)
    pub fn joints(&self) -> (JointId, JointId, JointId) {
        match self {
            ArmSide::Left => (JointId::ShoulderLeft, JointId::ElbowLeft, JointId::HandLeft),
            ArmSide::Right => (
                JointId::ShoulderRight,
                JointId::ElbowRight,
                JointId::HandRight,
            ),
        }
    }
}

/// Arm pointing direction as an hour on a clock face.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ClockCode {
    #[default]
    None,
    One,
    Three,
    Four,
    Six,
    Seven,
    Nine,
    Ten,
    Twelve,
}

impl ClockCode {
    pub fn hour(&self) -> Option<u8> {
        match self {
            ClockCode::None => None,
            ClockCode::One => Some(1),
            ClockCode::Three => Some(3),
            ClockCode::Four => Some(4),
            ClockCode::Six => Some(6),
            ClockCode::Seven => Some(7),
            ClockCode::Nine => Some(9),
            ClockCode::Ten => Some(10),
            ClockCode::Twelve => Some(12),
        }
    }

    pub fn from_hour(hour: u8) -> ClockCode {
        match hour {
            1 => ClockCode::One,
            3 => ClockCode::Three,
            4 => ClockCode::Four,
            6 => ClockCode::Six,
            7 => ClockCode::Seven,
            9 => ClockCode::Nine,
            10 => ClockCode::Ten,
            12 => ClockCode::Twelve,
            _ => ClockCode::None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ClockCode::None => "-",
            ClockCode::One => "1",
            ClockCode::Three => "3",
            ClockCode::Four => "4",
            ClockCode::Six => "6",
            ClockCode::Seven => "7",
            ClockCode::Nine => "9",
            ClockCode::Ten => "10",
            ClockCode::Twelve => "12",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ArmCodes {
    pub right: ClockCode,
    pub left: ClockCode,
}

impl ArmCodes {
    pub const fn new(right: ClockCode, left: ClockCode) -> Self {
        Self { right, left }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Symbol {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,
    Reset,
    WordBreak,
    #[default]
    None,
}

const ALPHABET: [Symbol; 26] = [
    Symbol::A,
    Symbol::B,
    Symbol::C,
    Symbol::D,
    Symbol::E,
    Symbol::F,
    Symbol::G,
    Symbol::H,
    Symbol::I,
    Symbol::J,
    Symbol::K,
    Symbol::L,
    Symbol::M,
    Symbol::N,
    Symbol::O,
    Symbol::P,
    Symbol::Q,
    Symbol::R,
    Symbol::S,
    Symbol::T,
    Symbol::U,
    Symbol::V,
    Symbol::W,
    Symbol::X,
    Symbol::Y,
    Symbol::Z,
];

const LETTER_LABELS: [&str; 26] = [
    "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P", "Q", "R", "S",
    "T", "U", "V", "W", "X", "Y", "Z",
];

impl Symbol {
    pub fn letter(&self) -> Option<char> {
        ALPHABET
            .iter()
            .position(|symbol| symbol == self)
            .map(|idx| (b'A' + idx as u8) as char)
    }

    pub fn from_letter(letter: char) -> Option<Symbol> {
        let idx = (letter.to_ascii_uppercase() as u32).checked_sub('A' as u32)?;
        ALPHABET.get(idx as usize).copied()
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Symbol::None)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Symbol::Reset => "RESET",
            Symbol::WordBreak => "EOW SPACE",
            Symbol::None => "Def",
            letter => ALPHABET
                .iter()
                .position(|symbol| symbol == letter)
                .map_or("", |idx| LETTER_LABELS[idx]),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateReason {
    Frame,
    HoldElapsed,
}

/// What the display side gets after every frame and every timer commit.
#[derive(Clone, Debug, PartialEq)]
pub struct SpellerUpdate {
    pub arms: ArmCodes,
    pub symbol: Symbol,
    pub committed: Option<Symbol>,
    pub word: String,
    /// Shared between updates; only replaced when a word is finalized.
    pub completed_words: Arc<[String]>,
    pub reason: UpdateReason,
}

impl SpellerUpdate {
    pub fn display_text(&self) -> String {
        format!(
            "R{:>2} L{:>2}  {:<9}  word: \"{}\"",
            self.arms.right.label(),
            self.arms.left.label(),
            self.symbol.label(),
            self.word
        )
    }
}
