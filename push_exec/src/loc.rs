//! # Localisation module
//!
//! Pose bookkeeping for the towed body and the tug. The body pose comes from the host every tick,
//! the tug pose is computed by the core.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::acf::HostInputs;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use util::maths::{hdg2dir, normalize_hdg, rel_hdg};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Position, heading and signed longitudinal speed of a vehicle.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Pose {
    /// World position of the vehicle's reference point
    pub pos_m: Vector2<f64>,

    /// Compass heading, `[0, 360)`
    pub hdg_deg: f64,

    /// Longitudinal speed, positive forwards
    pub spd_ms: f64,
}

/// Change between two poses over one tick.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct PoseDelta {
    pub pos_m: Vector2<f64>,

    /// Signed heading change, clockwise positive
    pub hdg_deg: f64,

    pub spd_ms: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose {
    pub fn new(pos_m: Vector2<f64>, hdg_deg: f64, spd_ms: f64) -> Self {
        Self {
            pos_m,
            hdg_deg: normalize_hdg(hdg_deg),
            spd_ms,
        }
    }

    /// Pose of the towed body reported by the host.
    pub fn from_inputs(inputs: &HostInputs) -> Self {
        Self::new(inputs.pos_m, inputs.hdg_deg, inputs.spd_ms)
    }

    /// Unit vector along the vehicle's heading.
    pub fn dir(&self) -> Vector2<f64> {
        hdg2dir(self.hdg_deg)
    }

    /// The point the given distance ahead of the reference point along the heading. Negative
    /// distances are behind.
    pub fn fwd_point(&self, dist_m: f64) -> Vector2<f64> {
        self.pos_m + self.dir() * dist_m
    }

    /// Change from `last` to this pose.
    pub fn delta_from(&self, last: &Pose) -> PoseDelta {
        PoseDelta {
            pos_m: self.pos_m - last.pos_m,
            hdg_deg: rel_hdg(last.hdg_deg, self.hdg_deg),
            spd_ms: self.spd_ms - last.spd_ms,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_delta_wraps_heading() {
        let last = Pose::new(Vector2::new(0.0, 0.0), 359.0, 1.0);
        let cur = Pose::new(Vector2::new(0.0, 1.0), 1.0, 0.5);

        let d = cur.delta_from(&last);
        assert!((d.hdg_deg - 2.0).abs() < 1e-9);
        assert_eq!(d.spd_ms, -0.5);
        assert_eq!(d.pos_m, Vector2::new(0.0, 1.0));
    }

    #[test]
    fn test_fwd_point() {
        let p = Pose::new(Vector2::new(10.0, 10.0), 90.0, 0.0);
        let ahead = p.fwd_point(-2.0);
        assert!((ahead.x - 8.0).abs() < 1e-9 && (ahead.y - 10.0).abs() < 1e-9);
    }
}
