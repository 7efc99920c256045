//! Tracked poses.
//!
//! The calibration channel streams head and controller poses as text:
//!
//! ```text
//! frame <int> time <decimal>
//! head_pos <vec3> head_rot <quat>
//! left_hand_pos <vec3> left_hand_rot <quat>
//! right_hand_pos <vec3> right_hand_rot <quat>
//! raw_pos <vec3> raw_rot <quat>
//! lht <bool> lhv <bool> rht <bool> rhv <bool>
//! ```
//!
//! Keyword order is mandatory; an unexpected keyword is reported as
//! [`ParseError::TokenMismatch`], distinct from a malformed number.
//!
//! ```rust
//! use mrc_wire::pose::PoseUpdate;
//!
//! let update: PoseUpdate = "frame 10 time 1.5 head_pos 0,0,0 head_rot 0,0,0,1 \
//!     left_hand_pos 0,0,0 left_hand_rot 0,0,0,1 right_hand_pos 1,2,3 right_hand_rot 0,0,0,1 \
//!     raw_pos 0,0,0 raw_rot 0,0,0,1 lht 1 lhv 1 rht 0 rhv 0"
//!     .parse()
//!     .unwrap();
//! assert!(update.left_hand.is_some());
//! assert!(update.right_hand.is_none());
//! ```

mod math;
mod parser;
mod update;

pub use math::{Pose, Quaternion, Vector3};
pub use parser::{LiteralKind, ParseError, Parser};
pub use update::{HandState, PoseUpdate};
