//! Pose update records sent by the headset at display rate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{ParseError, Parser, Pose, Quaternion, Vector3};

/// Controller tracking flags as reported by the headset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HandState {
    pub tracked: bool,
    pub valid: bool,
}

impl HandState {
    /// A hand pose is only meaningful when it is both tracked and valid.
    pub fn is_usable(&self) -> bool {
        self.tracked && self.valid
    }
}

/// One decoded `poseUpdate` record.
///
/// Hand poses are `None` unless their controller is both tracked and valid.
/// The head and the raw tracking-origin pose are always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseUpdate {
    pub frame: i64,
    /// Headset clock, in seconds.
    pub time: f64,
    pub head: Pose,
    pub left_hand: Option<Pose>,
    pub right_hand: Option<Pose>,
    pub tracking_origin_raw: Pose,
    pub left_hand_state: HandState,
    pub right_hand_state: HandState,
}

impl PoseUpdate {
    /// Parse one record. The keyword order is fixed.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut parser = Parser::new(text);

        parser.match_token("frame")?;
        let frame = parser.parse_integer()?;
        parser.match_token("time")?;
        let time = parser.parse_double()?;

        let head = parse_pose(&mut parser, "head_pos", "head_rot")?;
        let left_hand = parse_pose(&mut parser, "left_hand_pos", "left_hand_rot")?;
        let right_hand = parse_pose(&mut parser, "right_hand_pos", "right_hand_rot")?;
        let tracking_origin_raw = parse_pose(&mut parser, "raw_pos", "raw_rot")?;

        parser.match_token("lht")?;
        let left_tracked = parser.parse_bool()?;
        parser.match_token("lhv")?;
        let left_valid = parser.parse_bool()?;
        parser.match_token("rht")?;
        let right_tracked = parser.parse_bool()?;
        parser.match_token("rhv")?;
        let right_valid = parser.parse_bool()?;

        let left_hand_state = HandState { tracked: left_tracked, valid: left_valid };
        let right_hand_state = HandState { tracked: right_tracked, valid: right_valid };

        Ok(Self {
            frame,
            time,
            head,
            left_hand: left_hand_state.is_usable().then_some(left_hand),
            right_hand: right_hand_state.is_usable().then_some(right_hand),
            tracking_origin_raw,
            left_hand_state,
            right_hand_state,
        })
    }
}

fn parse_pose(parser: &mut Parser<'_>, position_key: &str, rotation_key: &str) -> Result<Pose, ParseError> {
    parser.match_token(position_key)?;
    let position = parser.parse_vector3()?;
    parser.match_token(rotation_key)?;
    let rotation = parser.parse_quaternion()?;
    Ok(Pose { position, rotation })
}

impl FromStr for PoseUpdate {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

struct Vec3Text<'a>(&'a Vector3);

impl fmt::Display for Vec3Text<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.0.x, self.0.y, self.0.z)
    }
}

struct QuatText<'a>(&'a Quaternion);

impl fmt::Display for QuatText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.0.x, self.0.y, self.0.z, self.0.w)
    }
}

/// Renders the wire grammar. Absent hands are written as the identity pose
/// with their original flags.
impl fmt::Display for PoseUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let left = self.left_hand.unwrap_or(Pose::IDENTITY);
        let right = self.right_hand.unwrap_or(Pose::IDENTITY);
        let flag = |b: bool| u8::from(b);

        write!(f, "frame {} time {}", self.frame, self.time)?;
        for (name, pose) in [
            ("head", &self.head),
            ("left_hand", &left),
            ("right_hand", &right),
            ("raw", &self.tracking_origin_raw),
        ] {
            write!(f, " {name}_pos {} {name}_rot {}", Vec3Text(&pose.position), QuatText(&pose.rotation))?;
        }
        write!(
            f,
            " lht {} lhv {} rht {} rhv {}",
            flag(self.left_hand_state.tracked),
            flag(self.left_hand_state.valid),
            flag(self.right_hand_state.tracked),
            flag(self.right_hand_state.valid)
        )
    }
}
