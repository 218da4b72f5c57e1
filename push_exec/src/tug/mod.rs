//! # Tug module
//!
//! Runtime state of the tug serving a push. When not connected the tug drives itself along its
//! own short segment queue using a kinematic bicycle model around its fixed axle. When connected
//! its pose is imposed by the coupling with the body.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod catalog;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use nalgebra::Vector2;

// Internal
pub use catalog::{LiftType, LiftWallLoc, TugCatalog, TugError, TugInfo};
use crate::{
    drive_ctrl::{self, DriveCtrl, DriveStatus},
    loc::Pose,
    path::{plan_to_point, straight_to, PathError, SegQueue},
};
use comms_if::eqpt::tug::TugRender;
use util::maths::{clamp_abs, hdg2dir, normalize_hdg, rem_euclid, sign, turn_radius};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Fraction of the tug's steering used when planning its own maneuvers.
const TUG_PLAN_STEER_FRACT: f64 = 0.9;

/// Speed cap for moves close to the nose gear.
const SLOW_SPD_MS: f64 = 0.6;

/// Radius of the tug's tires, for the wheel rotation animation.
const TUG_TIRE_RADIUS_M: f64 = 0.4;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Animation state of the tug.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TugAnim {
    /// `0` open to `1` closed
    pub cradle_closure: f64,

    /// `0` down to `1` up
    pub lift: f64,

    pub winch_dist_m: f64,

    pub winch_on: bool,

    pub cradle_lights: bool,

    pub hazard_lights: bool,

    pub clear_signal: bool,

    pub engine_snd: f64,

    /// Wheel rotation, `[0, 360)`
    pub tire_rot_deg: f64,
}

/// A tug taking part in a push.
#[derive(Debug, Clone)]
pub struct Tug {
    pub info: TugInfo,

    /// Pose of the tug's origin
    pub pose: Pose,

    /// Current steering angle, positive right
    pub steer_deg: f64,

    /// The tug's own maneuver queue
    pub segs: SegQueue,

    pub anim: TugAnim,

    drive: DriveCtrl,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Tug {
    /// Create a stationary tug with its fixed axle at `axle_pos_m`.
    pub fn spawn(
        info: TugInfo,
        axle_pos_m: Vector2<f64>,
        hdg_deg: f64,
        drive_params: drive_ctrl::Params,
    ) -> Self {
        let origin = axle_pos_m - hdg2dir(hdg_deg) * info.veh.fixed_axle_fwd_m;

        debug!(
            "Spawning tug {} at ({:.1}, {:.1}) hdg {:.0}",
            info.name, origin.x, origin.y, hdg_deg
        );

        Self {
            info,
            pose: Pose::new(origin, hdg_deg, 0.0),
            steer_deg: 0.0,
            segs: SegQueue::new(),
            anim: TugAnim::default(),
            drive: DriveCtrl::new(drive_params),
        }
    }

    /// Position of the tug's fixed axle.
    pub fn axle_pos(&self) -> Vector2<f64> {
        self.pose.fwd_point(self.info.veh.fixed_axle_fwd_m)
    }

    /// Tightest radius the tug's maneuvers are planned with.
    pub fn min_plan_radius_m(&self) -> f64 {
        self.info.veh.min_turn_radius_m(TUG_PLAN_STEER_FRACT)
    }

    /// Queue a maneuver which brings the fixed axle to `axle_pos_m` facing `hdg_deg`.
    ///
    /// The maneuver starts where the last queued one ends, or at the tug's current pose.
    pub fn plan_axle_to(&mut self, axle_pos_m: Vector2<f64>, hdg_deg: f64) -> Result<(), PathError> {
        let (from_pos, from_hdg) = match self.segs.peek_tail() {
            Some(s) => (s.end_pos(), s.end_hdg()),
            None => (self.axle_pos(), self.pose.hdg_deg),
        };

        let segs = plan_to_point(
            from_pos,
            from_hdg,
            axle_pos_m,
            hdg_deg,
            self.min_plan_radius_m(),
        )?;
        self.segs.extend(segs);

        Ok(())
    }

    /// Queue a maneuver which brings the tug's origin to `pos_m` facing `hdg_deg`.
    pub fn plan_to(&mut self, pos_m: Vector2<f64>, hdg_deg: f64) -> Result<(), PathError> {
        let axle = pos_m + hdg2dir(hdg_deg) * self.info.veh.fixed_axle_fwd_m;
        self.plan_axle_to(axle, hdg_deg)
    }

    /// Queue a straight which brings the tug's origin to `pos_m` along `hdg_deg`.
    ///
    /// Used to back onto and pull off the nose gear, where the tug is already lined up.
    pub fn plan_straight_to(&mut self, pos_m: Vector2<f64>, hdg_deg: f64) {
        let axle = pos_m + hdg2dir(hdg_deg) * self.info.veh.fixed_axle_fwd_m;
        let from = match self.segs.peek_tail() {
            Some(s) => s.end_pos(),
            None => self.axle_pos(),
        };

        if let Some(seg) = straight_to(from, axle, hdg_deg) {
            self.segs.append(seg);
        }
    }

    /// True when the tug has nothing left to drive and has come to rest.
    pub fn is_stopped(&self) -> bool {
        self.segs.is_empty() && self.pose.spd_ms == 0.0
    }

    /// Drive the tug along its own queue for one tick. Returns true while it is still driving.
    ///
    /// With `slow` set the tug is held to a walking pace.
    pub fn drive(&mut self, d_t: f64, slow: bool) -> bool {
        if self.segs.is_empty() {
            self.pose.spd_ms = 0.0;
            return false;
        }

        let cmd = loop {
            match self.drive.drive_segs(&self.pose, &self.info.veh, &mut self.segs, d_t) {
                DriveStatus::Driving(cmd) => break Some(cmd),
                DriveStatus::SegComplete(_) => continue,
                DriveStatus::Finished => break None,
            }
        };

        let cmd = match cmd {
            Some(c) => c,
            None => {
                self.pose.spd_ms = 0.0;
                self.anim.engine_snd = 0.0;
                return false;
            }
        };

        self.set_steering(cmd.steer_deg, d_t);

        let tgt_spd = if slow {
            clamp_abs(cmd.spd_ms, SLOW_SPD_MS)
        } else {
            cmd.spd_ms
        };

        // Speed changes are limited by the tug's acceleration, and a change of direction starts
        // from rest
        let max_d_spd = if cmd.decelerating {
            self.info.veh.max_decel_mss
        } else {
            self.info.veh.max_accel_mss
        } * d_t;
        let mut spd = if tgt_spd * self.pose.spd_ms < 0.0 {
            0.0
        } else {
            self.pose.spd_ms + clamp_abs(tgt_spd - self.pose.spd_ms, max_d_spd)
        };

        // Never below the creep speed or the tug could stall short of the end
        let creep = self.drive.params().min_creep_spd_ms.min(tgt_spd.abs());
        if spd.abs() < creep {
            spd = creep * sign(tgt_spd);
        }

        self.move_bicycle(spd, d_t);
        self.anim.engine_snd = (spd.abs() / self.info.veh.max_fwd_spd_ms).min(1.0);

        true
    }

    /// Move the tug for one tick at the given speed and its current steering.
    fn move_bicycle(&mut self, spd_ms: f64, d_t: f64) {
        let fx = self.info.veh.fixed_axle_fwd_m;
        let mut axle = self.axle_pos();

        let r = turn_radius(self.info.veh.wheelbase_m, self.steer_deg);
        let hdg = normalize_hdg(self.pose.hdg_deg + (spd_ms / r).to_degrees() * d_t);
        axle += hdg2dir(hdg) * spd_ms * d_t;

        let pos = axle - hdg2dir(hdg) * fx;
        self.set_pos(pos, hdg, spd_ms);
    }

    /// Steer the tug towards `steer_deg`, limited by the tug's steering rate and range.
    pub fn set_steering(&mut self, steer_deg: f64, d_t: f64) {
        let tgt = clamp_abs(steer_deg, self.info.veh.max_steer_deg);
        let max_d = self.info.max_steer_rate_dps * d_t;

        self.steer_deg += clamp_abs(tgt - self.steer_deg, max_d);
    }

    /// Impose the tug's pose, used while it is coupled to the body.
    pub fn set_pos(&mut self, pos_m: Vector2<f64>, hdg_deg: f64, spd_ms: f64) {
        let dist_m = (pos_m - self.pose.pos_m).dot(&hdg2dir(hdg_deg));
        self.anim.tire_rot_deg = rem_euclid(
            self.anim.tire_rot_deg + (dist_m / TUG_TIRE_RADIUS_M).to_degrees(),
            360.0,
        );

        self.pose = Pose::new(pos_m, hdg_deg, spd_ms);
    }

    pub fn render(&self) -> TugRender {
        TugRender {
            name: self.info.name.clone(),
            pos_m: self.pose.pos_m,
            hdg_deg: self.pose.hdg_deg,
            spd_ms: self.pose.spd_ms,
            steer_deg: self.steer_deg,
            cradle: self.anim.cradle_closure,
            lift: self.anim.lift,
            winch_dist_m: self.anim.winch_dist_m,
            winch_on: self.anim.winch_on,
            cradle_lights: self.anim.cradle_lights,
            hazard_lights: self.anim.hazard_lights,
            clear_signal: self.anim.clear_signal,
            engine_snd: self.anim.engine_snd,
            tire_rot_deg: self.anim.tire_rot_deg,
        }
    }
}
