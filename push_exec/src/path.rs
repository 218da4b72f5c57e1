//! # Path
//!
//! This module defines the segment paths followed by the towed body during the push, and by the
//! tug during its own short maneuvers.
//!
//! Segment headings are the heading the vehicle *faces* while on the segment. A `backward`
//! segment is driven in reverse, so the direction of travel is opposite to the facing heading.
//! Turns cover less than half a circle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{collections::VecDeque, fs::read_to_string, path::Path};

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use util::maths::{dir2hdg, hdg2dir, normalize_hdg, rel_hdg, right_normal};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Heading changes smaller than this are driven as a single straight segment.
const STRAIGHT_HDG_TOL_DEG: f64 = 1.0;

/// Straights shorter than this after a turn are dropped.
const MIN_STRAIGHT_LEN_M: f64 = 0.01;

/// Largest lateral offset between the start and target lines accepted for a straight.
const MAX_STRAIGHT_LAT_OFF_M: f64 = 0.5;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One section of a path.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum PathSegment {
    Straight {
        start_m: Vector2<f64>,
        end_m: Vector2<f64>,
        hdg_deg: f64,
        backward: bool,
    },
    Turn {
        center_m: Vector2<f64>,
        radius_m: f64,
        start_hdg_deg: f64,
        end_hdg_deg: f64,
        backward: bool,
    },
}

/// An ordered queue of segments, the head being the segment currently being driven.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct SegQueue(VecDeque<PathSegment>);

// -----------------------------------------------------------------------------------------------
// ENUMS
// -----------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("No path of the vehicle's turn radius reaches the target ({0:.1}, {1:.1})")]
    Unreachable(f64, f64),

    #[error("Could not read the route file: {0}")]
    FileLoadError(std::io::Error),

    #[error("Could not parse the route file: {0}")]
    DeserialiseError(serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PathSegment {
    pub fn is_backward(&self) -> bool {
        match *self {
            PathSegment::Straight { backward, .. } | PathSegment::Turn { backward, .. } => {
                backward
            }
        }
    }

    /// `1.0` for segments driven forwards, `-1.0` for backward segments.
    pub fn dir_sign(&self) -> f64 {
        if self.is_backward() {
            -1.0
        } else {
            1.0
        }
    }

    pub fn is_straight(&self) -> bool {
        matches!(self, PathSegment::Straight { .. })
    }

    /// For turns, `1.0` if the centre lies to the right of the facing direction and `-1.0` if it
    /// lies to the left. Straights give `0.0`.
    pub fn turn_side(&self) -> f64 {
        match *self {
            PathSegment::Straight { .. } => 0.0,
            PathSegment::Turn {
                start_hdg_deg,
                end_hdg_deg,
                backward,
                ..
            } => {
                let clockwise = rel_hdg(start_hdg_deg, end_hdg_deg) >= 0.0;
                if clockwise != backward {
                    1.0
                } else {
                    -1.0
                }
            }
        }
    }

    pub fn start_hdg(&self) -> f64 {
        match *self {
            PathSegment::Straight { hdg_deg, .. } => hdg_deg,
            PathSegment::Turn { start_hdg_deg, .. } => start_hdg_deg,
        }
    }

    pub fn end_hdg(&self) -> f64 {
        match *self {
            PathSegment::Straight { hdg_deg, .. } => hdg_deg,
            PathSegment::Turn { end_hdg_deg, .. } => end_hdg_deg,
        }
    }

    pub fn start_pos(&self) -> Vector2<f64> {
        match *self {
            PathSegment::Straight { start_m, .. } => start_m,
            PathSegment::Turn {
                center_m,
                radius_m,
                start_hdg_deg,
                ..
            } => center_m + hdg2dir(start_hdg_deg - 90.0 * self.turn_side()) * radius_m,
        }
    }

    pub fn end_pos(&self) -> Vector2<f64> {
        match *self {
            PathSegment::Straight { end_m, .. } => end_m,
            PathSegment::Turn {
                center_m,
                radius_m,
                end_hdg_deg,
                ..
            } => center_m + hdg2dir(end_hdg_deg - 90.0 * self.turn_side()) * radius_m,
        }
    }

    /// Unit vector of the direction of travel at the end of the segment.
    pub fn travel_dir_at_end(&self) -> Vector2<f64> {
        hdg2dir(self.end_hdg()) * self.dir_sign()
    }

    /// Length of the segment along the path.
    pub fn len_m(&self) -> f64 {
        match *self {
            PathSegment::Straight { start_m, end_m, .. } => (end_m - start_m).norm(),
            PathSegment::Turn {
                radius_m,
                start_hdg_deg,
                end_hdg_deg,
                ..
            } => rel_hdg(start_hdg_deg, end_hdg_deg).abs().to_radians() * radius_m,
        }
    }

    /// Distance left to drive from `pos_m` to the end of the segment. Negative once the end has
    /// been passed.
    pub fn remaining_m(&self, pos_m: &Vector2<f64>) -> f64 {
        match *self {
            PathSegment::Straight { end_m, .. } => {
                (end_m - pos_m).dot(&self.travel_dir_at_end())
            }
            PathSegment::Turn {
                center_m,
                radius_m,
                end_hdg_deg,
                ..
            } => {
                // Facing heading of the arc tangent at the point closest to pos
                let side = self.turn_side();
                let ideal_hdg = dir2hdg(&(pos_m - center_m)) + 90.0 * side;

                // The facing heading turns clockwise for right-hand centres driven forwards and
                // left-hand centres driven backwards
                let rot_sign = side * self.dir_sign();
                rot_sign * rel_hdg(ideal_hdg, end_hdg_deg).to_radians() * radius_m
            }
        }
    }
}

impl SegQueue {
    pub fn new() -> Self {
        Self(VecDeque::new())
    }

    pub fn peek_head(&self) -> Option<&PathSegment> {
        self.0.front()
    }

    pub fn peek_tail(&self) -> Option<&PathSegment> {
        self.0.back()
    }

    pub fn pop_head(&mut self) -> Option<PathSegment> {
        self.0.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn append(&mut self, seg: PathSegment) {
        self.0.push_back(seg)
    }

    pub fn extend<I: IntoIterator<Item = PathSegment>>(&mut self, segs: I) {
        self.0.extend(segs)
    }

    /// Replace the whole queue.
    pub fn replace(&mut self, other: SegQueue) {
        *self = other;
    }

    pub fn clear(&mut self) {
        self.0.clear()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathSegment> {
        self.0.iter()
    }

    /// Load a route from a JSON file containing a list of segments.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, PathError> {
        let json = read_to_string(path).map_err(PathError::FileLoadError)?;
        serde_json::from_str(&json).map_err(PathError::DeserialiseError)
    }
}

impl From<Vec<PathSegment>> for SegQueue {
    fn from(segs: Vec<PathSegment>) -> Self {
        Self(segs.into())
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Plan the segments needed to drive from one pose to another.
///
/// The result is either a single straight (if the headings match) or a turn followed by an
/// optional straight. The turn is tangent to both the start heading and the line through the
/// target along `to_hdg_deg`, so its radius is fixed by the geometry. The direction of travel is
/// backward if the target lies behind the start heading.
pub fn plan_to_point(
    from_m: Vector2<f64>,
    from_hdg_deg: f64,
    to_m: Vector2<f64>,
    to_hdg_deg: f64,
    min_radius_m: f64,
) -> Result<Vec<PathSegment>, PathError> {
    let delta = to_m - from_m;
    let unreachable = || PathError::Unreachable(to_m.x, to_m.y);

    if delta.norm() < MIN_STRAIGHT_LEN_M {
        return Ok(Vec::new());
    }

    let backward = hdg2dir(from_hdg_deg).dot(&delta) < 0.0;
    let dir_sign = if backward { -1.0 } else { 1.0 };
    let turn_deg = rel_hdg(from_hdg_deg, to_hdg_deg);

    if turn_deg.abs() < STRAIGHT_HDG_TOL_DEG {
        let lat_off_m = delta.dot(&right_normal(&hdg2dir(from_hdg_deg)));
        if lat_off_m.abs() > MAX_STRAIGHT_LAT_OFF_M {
            return Err(unreachable());
        }

        return Ok(vec![PathSegment::Straight {
            start_m: from_m,
            end_m: to_m,
            hdg_deg: normalize_hdg(from_hdg_deg),
            backward,
        }]);
    }

    // Centre on the right of the facing direction for clockwise turns driven forwards
    let side = if (turn_deg > 0.0) != backward { 1.0 } else { -1.0 };
    let centre_dir = hdg2dir(from_hdg_deg + 90.0 * side);

    // Pick the radius which puts the centre `radius` away from the target line, on the same side
    // relative to the final heading
    let target_norm = right_normal(&hdg2dir(to_hdg_deg));
    let denom = side - centre_dir.dot(&target_norm);
    if denom.abs() < 1e-6 {
        return Err(unreachable());
    }
    let radius_m = (from_m - to_m).dot(&target_norm) / denom;
    if !(radius_m >= min_radius_m) {
        return Err(unreachable());
    }

    let turn = PathSegment::Turn {
        center_m: from_m + centre_dir * radius_m,
        radius_m,
        start_hdg_deg: normalize_hdg(from_hdg_deg),
        end_hdg_deg: normalize_hdg(to_hdg_deg),
        backward,
    };

    let turn_end_m = turn.end_pos();
    let straight_len_m = (to_m - turn_end_m).dot(&(hdg2dir(to_hdg_deg) * dir_sign));
    if straight_len_m < -MIN_STRAIGHT_LEN_M {
        return Err(unreachable());
    }

    let mut segs = vec![turn];
    if straight_len_m > MIN_STRAIGHT_LEN_M {
        segs.push(PathSegment::Straight {
            start_m: turn_end_m,
            end_m: to_m,
            hdg_deg: normalize_hdg(to_hdg_deg),
            backward,
        });
    }

    Ok(segs)
}

/// A single straight ending at `to_m` along `hdg_deg`, starting abeam of `from_m`.
///
/// Used for short moves where the vehicle is already roughly lined up. Any lateral or heading
/// error left at the start is taken out by the segment follower.
pub fn straight_to(from_m: Vector2<f64>, to_m: Vector2<f64>, hdg_deg: f64) -> Option<PathSegment> {
    let dir = hdg2dir(hdg_deg);
    let along_m = (to_m - from_m).dot(&dir);

    if along_m.abs() < MIN_STRAIGHT_LEN_M {
        return None;
    }

    Some(PathSegment::Straight {
        start_m: to_m - dir * along_m,
        end_m: to_m,
        hdg_deg: normalize_hdg(hdg_deg),
        backward: along_m < 0.0,
    })
}
