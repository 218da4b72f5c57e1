//! # Coupling module
//!
//! Kinematics of the connected tug and body. While connected the body's nose gear sits in the
//! tug and the tug's heading relative to the body is the nose gear steering angle. The push is
//! steered by steering the tug, which changes that angle.
//!
//! The tug faces along the body's heading, its fixed axle `rear2nw` ahead of the seated nose
//! gear.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use nalgebra::Vector2;
use serde::Deserialize;

// Internal
use crate::{
    loc::{Pose, PoseDelta},
    tug::Tug,
    veh::{ang_vel_speed_limit, AcfGeom},
};
use util::maths::{
    clamp, clamp_abs, dir2hdg, hdg2dir, normalize_hdg, rel_hdg, rotate_vec, set_abs, sign,
    turn_radius,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Coupling parameters
#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    /// Gain on the heading correction needed to make the body pivot around the tug's fixed axle
    pub hdg_corr_gain: f64,

    /// Hard limit on the angle between the tug and the body
    pub max_coupling_deg: f64,

    /// Tug steering demanded per degree of coupling angle error
    pub tug_steer_gain: f64,
}

/// The body as seen by the coupling on one tick.
#[derive(Debug, Clone, Copy)]
pub struct BodyState<'a> {
    pub geom: &'a AcfGeom,

    pub pose: &'a Pose,

    pub delta: &'a PoseDelta,

    pub d_t: f64,

    /// Nose gear steering angle commanded on the last tick
    pub nw_steer_deg: f64,
}

/// Result of steering the nose gear through the tug.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NwTurn {
    /// Nose gear steering angle to command
    pub nw_steer_deg: f64,

    /// Heading correction to request from the host
    pub hdg_corr_deg: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// How the tug's heading is updated by `tug_pos_update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TugHdgMode {
    /// Keep the current heading, only move the tug with the nose gear
    PosOnly,

    /// Follow the commanded nose gear steering, the tug does no steering of its own
    Slave,

    /// Integrate the tug's own steering
    Follow,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            hdg_corr_gain: 1.0,
            max_coupling_deg: 85.0,
            tug_steer_gain: 3.0,
        }
    }
}

impl<'a> BodyState<'a> {
    pub fn nw_pos(&self) -> Vector2<f64> {
        self.pose.fwd_point(self.geom.nw_fwd_m)
    }

    pub fn main_pos(&self) -> Vector2<f64> {
        self.pose.fwd_point(self.geom.main_fwd_m)
    }

    fn yaw_rate_dps(&self) -> f64 {
        if self.d_t > 0.0 {
            self.delta.hdg_deg / self.d_t
        } else {
            0.0
        }
    }

    /// Speed of the nose gear along its steering direction, which is the speed of the tug.
    pub fn nw_speed_ms(&self) -> f64 {
        let v = Vector2::new(
            self.yaw_rate_dps().to_radians() * self.geom.wheelbase_m(),
            self.pose.spd_ms,
        );
        hdg2dir(self.nw_steer_deg).dot(&v)
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Steer the tug so that the nose gear steering angle moves towards `req_steer_deg`.
///
/// Returns the nose gear steering angle to command, which is the predicted angle between the tug
/// and the body limited to the steering range of both the body and the tug, and the heading
/// correction making the body pivot around the tug's fixed axle.
pub fn turn_nosewheel(
    req_steer_deg: f64,
    tug: &mut Tug,
    body: &BodyState,
    params: &Params,
) -> NwTurn {
    let dir_mult = sign(tug.pose.spd_ms);
    let veh = &body.geom.veh;
    let d_t = body.d_t;

    // The steering written back to the body stays within what both gears can turn
    let max_nw_steer = veh.max_steer_deg.min(tug.info.veh.max_steer_deg);
    let req_steer_deg = clamp_abs(req_steer_deg, max_nw_steer);

    // Predict the coupling angle at the end of this tick from the tug's and the body's yaw rates
    let tug_turn_r = turn_radius(tug.info.veh.wheelbase_m, tug.steer_deg);
    let tug_turn_rate_dps = (tug.pose.spd_ms / tug_turn_r).to_degrees();
    let rel_turn_rate_dps = tug_turn_rate_dps - body.yaw_rate_dps();

    let cur_nw_steer = clamp_abs(
        rel_hdg(body.pose.hdg_deg, tug.pose.hdg_deg) + rel_turn_rate_dps * d_t,
        params.max_coupling_deg,
    );
    let d_steer = req_steer_deg - cur_nw_steer;

    if tug.pose.spd_ms.abs() > 0.01 {
        let mut tug_steer = clamp_abs(
            dir_mult * params.tug_steer_gain * d_steer,
            tug.info.veh.max_steer_deg,
        );

        // Steer less at speed so the tug doesn't swing around
        let lim = ang_vel_speed_limit(&tug.info.veh, tug_steer, tug.pose.spd_ms);
        if lim.abs() < tug.pose.spd_ms.abs() {
            tug_steer *= lim / tug.pose.spd_ms;
        }
        tug.set_steering(tug_steer, d_t);
    }

    // The nose gear isn't over the tug's fixed axle, so as the tug turns it displaces the nose
    // gear sideways. Shift the body's heading to match.
    let rear2nw = tug.info.rear2nw_m(body.geom.nw_tire_radius_m);
    let turn_inc = (rel_turn_rate_dps * d_t).to_radians();
    let off = Vector2::new(
        -turn_inc.sin() * rear2nw / tug.info.veh.wheelbase_m,
        (turn_inc.cos() - 1.0) * rear2nw / tug.info.veh.wheelbase_m,
    );
    let off = rotate_vec(&off, cur_nw_steer);
    let d_hdg = clamp(&(off.x / body.geom.wheelbase_m()), &-1.0, &1.0)
        .asin()
        .to_degrees();

    trace!(
        "turn_nosewheel: req {:.2} deg, cur {:.2} deg, tug steer {:.2} deg, hdg corr {:.4} deg",
        req_steer_deg,
        cur_nw_steer,
        tug.steer_deg,
        params.hdg_corr_gain * d_hdg
    );

    NwTurn {
        nw_steer_deg: clamp_abs(cur_nw_steer, max_nw_steer),
        hdg_corr_deg: params.hdg_corr_gain * d_hdg,
    }
}

/// Move the tug with the body's nose gear.
///
/// While winching the tug holds still relative to where the nose gear was when the winching
/// started, given by `winch_start_nw_m`.
pub fn tug_pos_update(
    tug: &mut Tug,
    body: &BodyState,
    mode: TugHdgMode,
    winch_start_nw_m: Option<Vector2<f64>>,
) {
    let tug_spd = body.nw_speed_ms();
    let radius = turn_radius(tug.info.veh.wheelbase_m, tug.steer_deg);
    let max_steer = body.geom.veh.max_steer_deg;

    let tug_hdg = match mode {
        TugHdgMode::PosOnly => tug.pose.hdg_deg,
        TugHdgMode::Slave => normalize_hdg(body.pose.hdg_deg + body.nw_steer_deg),
        TugHdgMode::Follow if radius.abs() < 1e3 => {
            let hdg = tug.pose.hdg_deg + (tug_spd / radius).to_degrees() * body.d_t;

            // The tug can't turn past the nose gear's steering stops
            let r_hdg = clamp_abs(rel_hdg(body.pose.hdg_deg, hdg), max_steer);
            normalize_hdg(body.pose.hdg_deg + r_hdg)
        }
        TugHdgMode::Follow => tug.pose.hdg_deg,
    };

    match winch_start_nw_m {
        Some(start) => {
            let pos = start - body.pose.dir() * tug.info.plat_fwd_m;
            tug.set_pos(pos, body.pose.hdg_deg, 0.0);
        }
        None => {
            let seat = tug.info.nw_seat_fwd_m(body.geom.nw_tire_radius_m);
            let pos = body.nw_pos() - hdg2dir(tug_hdg) * seat;
            tug.set_pos(pos, tug_hdg, tug_spd);
        }
    }
}

/// Pose of the body's reference point as if its centreline passed through the tug's fixed axle.
///
/// This is the pose given to the segment follower when pushing, so that the path is followed by
/// the articulation the tug actually steers around.
pub fn corr_acf_pos(body: &BodyState, tug: &Tug) -> Pose {
    let main_pos = body.main_pos();
    let rear2nw = tug.info.rear2nw_m(body.geom.nw_tire_radius_m);

    let tug_axle = body.nw_pos() + hdg2dir(body.pose.hdg_deg + body.nw_steer_deg) * rear2nw;
    let corr_dir = tug_axle - main_pos;
    let corr_pos = main_pos + set_abs(&corr_dir, -body.geom.main_fwd_m);

    Pose::new(corr_pos, dir2hdg(&corr_dir), body.pose.spd_ms)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        drive_ctrl,
        tug::TugCatalog,
        veh::{test::test_inputs, AcfParams},
    };

    fn setup() -> (AcfGeom, Pose, Tug) {
        let geom = AcfGeom::from_inputs(&test_inputs(), &AcfParams::default()).unwrap();
        let pose = Pose::new(Vector2::new(0.0, 0.0), 0.0, -1.0);
        let info = TugCatalog::default().tugs[0].clone();
        let tug = Tug::spawn(info, Vector2::new(0.0, 20.0), 0.0, drive_ctrl::Params::default());
        (geom, pose, tug)
    }

    #[test]
    fn test_tug_follows_nose_gear() {
        let (geom, pose, mut tug) = setup();
        let delta = PoseDelta::default();
        let body = BodyState {
            geom: &geom,
            pose: &pose,
            delta: &delta,
            d_t: 0.05,
            nw_steer_deg: 0.0,
        };

        tug_pos_update(&mut tug, &body, TugHdgMode::Follow, None);

        // Nose gear at 15 m, seat 3.1 m behind the tug origin
        assert!((tug.pose.pos_m - Vector2::new(0.0, 18.1)).norm() < 1e-9);
        assert_eq!(tug.pose.hdg_deg, 0.0);
        assert!((tug.pose.spd_ms + 1.0).abs() < 1e-9);

        // Slave mode takes the heading from the commanded steering
        let body = BodyState {
            nw_steer_deg: 20.0,
            ..body
        };
        tug_pos_update(&mut tug, &body, TugHdgMode::Slave, None);
        assert!((tug.pose.hdg_deg - 20.0).abs() < 1e-9);

        // Winching holds the tug still
        let start = Vector2::new(0.0, 14.0);
        tug_pos_update(&mut tug, &body, TugHdgMode::Follow, Some(start));
        assert!((tug.pose.pos_m - Vector2::new(0.0, 14.0)).norm() < 1e-9);
        assert_eq!(tug.pose.spd_ms, 0.0);
    }

    #[test]
    fn test_follow_clamped_to_steer_stops() {
        let (geom, pose, mut tug) = setup();
        let delta = PoseDelta::default();
        let body = BodyState {
            geom: &geom,
            pose: &pose,
            delta: &delta,
            d_t: 0.05,
            nw_steer_deg: 0.0,
        };

        tug.pose.hdg_deg = 69.0;
        tug.steer_deg = -50.0;
        for _ in 0..100 {
            tug_pos_update(&mut tug, &body, TugHdgMode::Follow, None);
        }
        assert!((tug.pose.hdg_deg - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_turn_nosewheel_steers_tug() {
        let (geom, pose, mut tug) = setup();
        let delta = PoseDelta::default();
        let body = BodyState {
            geom: &geom,
            pose: &pose,
            delta: &delta,
            d_t: 0.05,
            nw_steer_deg: 0.0,
        };
        tug_pos_update(&mut tug, &body, TugHdgMode::Follow, None);

        // Reversing and asking for right steering turns the tug's wheels left
        let turn = turn_nosewheel(20.0, &mut tug, &body, &Params::default());
        assert!(tug.steer_deg < 0.0);
        assert!(turn.nw_steer_deg.abs() < 1e-6);
        assert!(turn.hdg_corr_deg.abs() < 1e-6);

        // Over a few seconds the coupling angle follows the request
        let mut nw_steer = 0.0;
        for _ in 0..200 {
            let body = BodyState {
                nw_steer_deg: nw_steer,
                ..body
            };
            tug_pos_update(&mut tug, &body, TugHdgMode::Follow, None);
            nw_steer = turn_nosewheel(20.0, &mut tug, &body, &Params::default()).nw_steer_deg;
            assert!(nw_steer.abs() <= 85.0);
        }
        assert!((nw_steer - 20.0).abs() < 2.0);
    }

    #[test]
    fn test_commanded_steer_within_both_limits() {
        let (geom, pose, mut tug) = setup();
        let delta = PoseDelta::default();
        let body = BodyState {
            geom: &geom,
            pose: &pose,
            delta: &delta,
            d_t: 0.05,
            nw_steer_deg: 0.0,
        };
        tug_pos_update(&mut tug, &body, TugHdgMode::Follow, None);

        // Body gear turns to 70 deg, the tug only to 50 deg
        let lim = geom.veh.max_steer_deg.min(tug.info.veh.max_steer_deg);
        assert_eq!(lim, 50.0);

        let mut nw_steer: f64 = 0.0;
        let mut max_cmd: f64 = 0.0;
        for _ in 0..400 {
            let body = BodyState {
                nw_steer_deg: nw_steer,
                ..body
            };
            tug_pos_update(&mut tug, &body, TugHdgMode::Follow, None);
            nw_steer = turn_nosewheel(90.0, &mut tug, &body, &Params::default()).nw_steer_deg;
            max_cmd = max_cmd.max(nw_steer.abs());
        }

        assert!(max_cmd <= lim);
        assert!(max_cmd > 30.0);
    }

    #[test]
    fn test_corr_acf_pos() {
        let (geom, pose, tug) = setup();
        let delta = PoseDelta::default();

        // Straight coupling leaves the pose unchanged
        let body = BodyState {
            geom: &geom,
            pose: &pose,
            delta: &delta,
            d_t: 0.05,
            nw_steer_deg: 0.0,
        };
        let corr = corr_acf_pos(&body, &tug);
        assert!(corr.pos_m.norm() < 1e-9);
        assert!(corr.hdg_deg.abs() < 1e-9);

        // Steering right moves the pivot right so the corrected heading turns right
        let body = BodyState {
            nw_steer_deg: 30.0,
            ..body
        };
        let corr = corr_acf_pos(&body, &tug);
        assert!(corr.hdg_deg > 0.0 && corr.hdg_deg < 10.0);
        assert!(((corr.pos_m - body.main_pos()).norm() - 5.0).abs() < 1e-9);
    }
}
