use std::collections::HashMap;

use crate::types::{ArmCodes, ArmSide, Body, ClockCode, Point2, Symbol};

/// Max slack between elbow-routed length and straight shoulder-hand length.
const STRAIGHT_TOLERANCE: f64 = 4.0;
/// Half-width of the vertical and horizontal bands around the shoulder.
const AXIS_BAND: f64 = 30.0;
/// Max difference between |dx| and |dy| for a 45 degree pose.
const DIAGONAL_BAND: f64 = 20.0;

type BandRule = fn(&Point2, &Point2) -> Option<ClockCode>;

// Checked in order; the first rule that claims the hand wins.
const BAND_RULES: [BandRule; 3] = [vertical_band, horizontal_band, diagonal_band];

pub fn clock_code(shoulder: Point2, elbow: Point2, hand: Point2) -> ClockCode {
    if !is_straight(&shoulder, &elbow, &hand) {
        return ClockCode::None;
    }

    BAND_RULES
        .iter()
        .find_map(|rule| rule(&shoulder, &hand))
        .unwrap_or(ClockCode::None)
}

pub fn arm_clock_code(body: &Body, side: ArmSide) -> ClockCode {
    let (shoulder, elbow, hand) = side.joints();
    match (
        body.joint_position(shoulder),
        body.joint_position(elbow),
        body.joint_position(hand),
    ) {
        (Some(shoulder), Some(elbow), Some(hand)) => clock_code(shoulder, elbow, hand),
        _ => ClockCode::None,
    }
}

pub fn arm_codes(body: &Body) -> ArmCodes {
    ArmCodes::new(
        arm_clock_code(body, ArmSide::Right),
        arm_clock_code(body, ArmSide::Left),
    )
}

fn is_straight(shoulder: &Point2, elbow: &Point2, hand: &Point2) -> bool {
    let ab = elbow.distance(hand);
    let bc = elbow.distance(shoulder);
    let ac = hand.distance(shoulder);

    ab + bc < ac + STRAIGHT_TOLERANCE && ab + bc > ac - STRAIGHT_TOLERANCE
}

fn vertical_band(shoulder: &Point2, hand: &Point2) -> Option<ClockCode> {
    if !(hand.x < shoulder.x + AXIS_BAND && hand.x > shoulder.x - AXIS_BAND) {
        return None;
    }
    Some(if hand.y < shoulder.y {
        ClockCode::Twelve
    } else {
        ClockCode::Six
    })
}

fn horizontal_band(shoulder: &Point2, hand: &Point2) -> Option<ClockCode> {
    if !(hand.y < shoulder.y + AXIS_BAND && hand.y > shoulder.y - AXIS_BAND) {
        return None;
    }
    Some(if hand.x < shoulder.x {
        ClockCode::Nine
    } else {
        ClockCode::Three
    })
}

fn diagonal_band(shoulder: &Point2, hand: &Point2) -> Option<ClockCode> {
    let dx = (hand.x - shoulder.x).abs();
    let dy = (hand.y - shoulder.y).abs();
    if !(dx < dy + DIAGONAL_BAND && dx > dy - DIAGONAL_BAND) {
        return None;
    }

    let up = hand.y < shoulder.y;
    let down = hand.y > shoulder.y;
    let left = hand.x < shoulder.x;
    let right = hand.x > shoulder.x;

    // Screen space: y grows downwards.
    let code = if up && left {
        ClockCode::Ten
    } else if down && left {
        ClockCode::Seven
    } else if up && right {
        ClockCode::One
    } else if down && right {
        ClockCode::Four
    } else {
        ClockCode::None
    };
    Some(code)
}

// Flag semaphore, keyed by (right arm hour, left arm hour).
const LETTER_TABLE: &[((u8, u8), Symbol)] = &[
    ((4, 6), Symbol::A),
    ((4, 12), Symbol::K),
    ((4, 10), Symbol::L),
    ((4, 9), Symbol::M),
    ((4, 7), Symbol::N),
    ((3, 6), Symbol::B),
    ((3, 4), Symbol::H),
    ((3, 1), Symbol::O),
    ((3, 12), Symbol::P),
    ((3, 10), Symbol::Q),
    ((3, 9), Symbol::R),
    ((3, 7), Symbol::S),
    ((1, 6), Symbol::C),
    ((1, 12), Symbol::T),
    ((1, 10), Symbol::U),
    ((1, 9), Symbol::Y),
    ((1, 7), Symbol::Reset),
    ((12, 6), Symbol::D),
    ((12, 4), Symbol::I),
    ((12, 9), Symbol::J),
    ((12, 7), Symbol::V),
    ((6, 10), Symbol::E),
    ((6, 9), Symbol::F),
    ((6, 7), Symbol::G),
    ((6, 6), Symbol::WordBreak),
    ((10, 9), Symbol::W),
    ((10, 7), Symbol::X),
    ((7, 7), Symbol::Z),
];

pub struct LetterClassifier {
    table: HashMap<ArmCodes, Symbol>,
}

impl LetterClassifier {
    pub fn new() -> Self {
        let table = LETTER_TABLE
            .iter()
            .map(|&((right, left), symbol)| {
                (
                    ArmCodes::new(ClockCode::from_hour(right), ClockCode::from_hour(left)),
                    symbol,
                )
            })
            .collect();

        Self { table }
    }

    pub fn classify(&self, arms: ArmCodes) -> Symbol {
        self.table.get(&arms).copied().unwrap_or(Symbol::None)
    }

    pub fn classify_hours(&self, right: u8, left: u8) -> Symbol {
        self.classify(ArmCodes::new(
            ClockCode::from_hour(right),
            ClockCode::from_hour(left),
        ))
    }

    /// Arm pose that spells `symbol`, used to script replays and tests.
    pub fn pose_for(&self, symbol: Symbol) -> Option<ArmCodes> {
        self.table
            .iter()
            .find(|(_, candidate)| **candidate == symbol)
            .map(|(arms, _)| *arms)
    }
}

impl Default for LetterClassifier {
    fn default() -> Self {
        Self::new()
    }
}
