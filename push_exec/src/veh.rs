//! # Vehicle module
//!
//! Kinematic profiles of the towed body and the tug, and derivation of the towed body's geometry
//! from the gear data reported by the host.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::acf::{FrictionTier, HostInputs};
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use util::maths::{sign, turn_radius};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Kinematic limits of a vehicle, fixed once a push has started.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VehProfile {
    /// Distance between the steered wheel and the fixed axle
    pub wheelbase_m: f64,

    pub max_steer_deg: f64,

    pub max_fwd_spd_ms: f64,

    /// Maximum reverse speed, as a positive number
    pub max_rev_spd_ms: f64,

    pub max_fwd_ang_vel_dps: f64,

    pub max_rev_ang_vel_dps: f64,

    pub max_centr_accel_mss: f64,

    pub max_accel_mss: f64,

    pub max_decel_mss: f64,

    /// If true the planner steers the fixed axle along the path rather than the reference point
    pub use_rear_pos: bool,

    /// Longitudinal offset of the fixed axle from the reference point, positive forwards
    pub fixed_axle_fwd_m: f64,
}

/// A value for each surface friction tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PerFriction<T> {
    pub good: T,
    pub medium: T,
    pub poor: T,
}

/// Limits used to build the towed body's profile.
#[derive(Debug, Clone, Deserialize)]
pub struct AcfParams {
    pub max_fwd_spd_ms: f64,

    pub max_rev_spd_ms: f64,

    pub max_fwd_ang_vel_dps: f64,

    pub max_rev_ang_vel_dps: f64,

    pub max_centr_accel_mss: f64,

    pub max_accel_mss: f64,

    pub max_decel_mss: f64,

    /// Cap on the nose gear steering angle for each friction tier
    pub max_steer_cap_deg: PerFriction<f64>,

    /// Steering limits below this are considered implausible and replaced by a value between
    /// this and the friction cap
    pub min_steer_deg: f64,
}

/// Geometry of the towed body, derived when a session starts.
#[derive(Debug, Clone, PartialEq)]
pub struct AcfGeom {
    /// Index of the nose gear in the host's gear list
    pub nw_idx: usize,

    /// Longitudinal offset of the nose gear, positive forwards of the reference point
    pub nw_fwd_m: f64,

    /// Mean longitudinal offset of the main gears
    pub main_fwd_m: f64,

    pub nw_tire_radius_m: f64,

    pub nw_leg_len_m: f64,

    pub veh: VehProfile,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum VehError {
    #[error("The aircraft has no deployed landing gear")]
    NoGears,

    #[error("The aircraft has no steerable nose gear")]
    NoSteerableGear,

    #[error("The aircraft has no main gear behind the nose gear")]
    NoMainGear,

    #[error("The aircraft has an invalid wheelbase ({0:.2} m)")]
    BadWheelbase(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VehProfile {
    /// Angular velocity limit for travel in the direction of `spd_ms`.
    pub fn max_ang_vel_dps(&self, spd_ms: f64) -> f64 {
        if spd_ms >= 0.0 {
            self.max_fwd_ang_vel_dps
        } else {
            self.max_rev_ang_vel_dps
        }
    }

    /// Tightest turn radius the vehicle can hold while keeping the given fraction of its steering
    /// in reserve.
    pub fn min_turn_radius_m(&self, steer_fract: f64) -> f64 {
        turn_radius(self.wheelbase_m, self.max_steer_deg * steer_fract).abs()
    }
}

impl<T: Copy> PerFriction<T> {
    pub fn get(&self, tier: FrictionTier) -> T {
        match tier {
            FrictionTier::Good => self.good,
            FrictionTier::Medium => self.medium,
            FrictionTier::Poor => self.poor,
        }
    }
}

impl Default for AcfParams {
    fn default() -> Self {
        Self {
            max_fwd_spd_ms: 4.0,
            max_rev_spd_ms: 1.11,
            max_fwd_ang_vel_dps: 6.0,
            max_rev_ang_vel_dps: 4.0,
            max_centr_accel_mss: 0.1,
            max_accel_mss: 0.25,
            max_decel_mss: 0.17,
            max_steer_cap_deg: PerFriction {
                good: 75.0,
                medium: 50.0,
                poor: 35.0,
            },
            min_steer_deg: 35.0,
        }
    }
}

impl AcfGeom {
    /// Derive the body geometry from the gear data the host reports.
    ///
    /// The nose gear is the most forward steerable gear that is down, the main gear offset is the
    /// mean of all the other deployed gears.
    pub fn from_inputs(inputs: &HostInputs, params: &AcfParams) -> Result<Self, VehError> {
        let deployed: Vec<_> = inputs.deployed_gears().collect();
        if deployed.is_empty() {
            return Err(VehError::NoGears);
        }

        let (nw_idx, nw) = deployed
            .iter()
            .filter(|(_, g)| g.steerable)
            .max_by(|(_, a), (_, b)| {
                a.fwd_m
                    .partial_cmp(&b.fwd_m)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .copied()
            .ok_or(VehError::NoSteerableGear)?;

        let others: Vec<f64> = deployed
            .iter()
            .filter(|(i, _)| *i != nw_idx)
            .map(|(_, g)| g.fwd_m)
            .collect();
        if others.is_empty() {
            return Err(VehError::NoMainGear);
        }
        let main_fwd_m = others.iter().sum::<f64>() / others.len() as f64;

        let wheelbase_m = nw.fwd_m - main_fwd_m;
        if !(wheelbase_m > 0.0) {
            return Err(VehError::BadWheelbase(wheelbase_m));
        }

        let cap = params.max_steer_cap_deg.get(inputs.friction);
        let mut max_steer_deg = inputs.nw_steer_max_deg[0]
            .max(inputs.nw_steer_max_deg[1])
            .min(cap);
        if max_steer_deg < params.min_steer_deg {
            max_steer_deg = (cap + params.min_steer_deg) / 2.0;
        }

        debug!(
            "Aircraft geometry: nw {} at {:.2} m, main at {:.2} m, wheelbase {:.2} m, \
            max steer {:.1} deg",
            nw_idx, nw.fwd_m, main_fwd_m, wheelbase_m, max_steer_deg
        );

        Ok(Self {
            nw_idx,
            nw_fwd_m: nw.fwd_m,
            main_fwd_m,
            nw_tire_radius_m: nw.tire_radius_m,
            nw_leg_len_m: nw.leg_len_m,
            veh: VehProfile {
                wheelbase_m,
                max_steer_deg,
                max_fwd_spd_ms: params.max_fwd_spd_ms,
                max_rev_spd_ms: params.max_rev_spd_ms,
                max_fwd_ang_vel_dps: params.max_fwd_ang_vel_dps,
                max_rev_ang_vel_dps: params.max_rev_ang_vel_dps,
                max_centr_accel_mss: params.max_centr_accel_mss,
                max_accel_mss: params.max_accel_mss,
                max_decel_mss: params.max_decel_mss,
                use_rear_pos: true,
                fixed_axle_fwd_m: main_fwd_m,
            },
        })
    }

    pub fn wheelbase_m(&self) -> f64 {
        self.veh.wheelbase_m
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Limit a speed so that driving at the given steering angle stays within the vehicle's angular
/// velocity and centripetal acceleration limits.
///
/// The returned speed has the sign of `spd_ms` and a magnitude no greater than it.
pub fn ang_vel_speed_limit(veh: &VehProfile, steer_deg: f64, spd_ms: f64) -> f64 {
    let radius_m = turn_radius(veh.wheelbase_m, steer_deg).abs();

    let ang_vel_lim = veh.max_ang_vel_dps(spd_ms).to_radians() * radius_m;
    let centr_lim = (veh.max_centr_accel_mss * radius_m).sqrt();
    let lim = ang_vel_lim.min(centr_lim);

    if spd_ms.abs() > lim {
        lim * sign(spd_ms)
    } else {
        spd_ms
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use comms_if::eqpt::acf::{EngineState, GearState, LightState};
    use nalgebra::Vector2;

    /// Host inputs of a stationary twin-jet with a 20 m wheelbase, used throughout the crate's
    /// tests.
    pub(crate) fn test_inputs() -> HostInputs {
        let gear = |fwd_m, steerable| GearState {
            fwd_m,
            steerable,
            on_ground: true,
            deployed: true,
            leg_len_m: 1.5,
            tire_radius_m: 0.5,
        };

        HostInputs {
            time_s: 0.0,
            pos_m: Vector2::new(0.0, 0.0),
            hdg_deg: 0.0,
            spd_ms: 0.0,
            gears: vec![gear(15.0, true), gear(-5.0, false), gear(-5.0, false)],
            nw_steer_max_deg: [70.0, 10.0],
            mass_kg: 70_000.0,
            mtow_kg: 78_000.0,
            brake_pedal: 0.0,
            park_brake: 0.0,
            engines: EngineState {
                count: 2,
                any_running: false,
            },
            friction: FrictionTier::Good,
            lights: LightState::default(),
            steer_authority: true,
            doors_clear: true,
            yoke: None,
            sync: None,
        }
    }

    #[test]
    fn test_geom_from_inputs() {
        let geom = AcfGeom::from_inputs(&test_inputs(), &AcfParams::default()).unwrap();

        assert_eq!(geom.nw_idx, 0);
        assert_eq!(geom.main_fwd_m, -5.0);
        assert_eq!(geom.wheelbase_m(), 20.0);
        assert_eq!(geom.veh.max_steer_deg, 70.0);
        assert_eq!(geom.veh.fixed_axle_fwd_m, -5.0);
        assert!(geom.veh.use_rear_pos);
    }

    #[test]
    fn test_geom_steer_caps() {
        let params = AcfParams::default();
        let mut inputs = test_inputs();

        inputs.friction = FrictionTier::Medium;
        let geom = AcfGeom::from_inputs(&inputs, &params).unwrap();
        assert_eq!(geom.veh.max_steer_deg, 50.0);

        // Implausibly low limits are replaced
        inputs.friction = FrictionTier::Good;
        inputs.nw_steer_max_deg = [20.0, 10.0];
        let geom = AcfGeom::from_inputs(&inputs, &params).unwrap();
        assert_eq!(geom.veh.max_steer_deg, 55.0);
    }

    #[test]
    fn test_geom_errors() {
        let params = AcfParams::default();

        let mut inputs = test_inputs();
        inputs.gears.iter_mut().for_each(|g| g.deployed = false);
        assert_eq!(AcfGeom::from_inputs(&inputs, &params), Err(VehError::NoGears));

        let mut inputs = test_inputs();
        inputs.gears[0].steerable = false;
        assert_eq!(
            AcfGeom::from_inputs(&inputs, &params),
            Err(VehError::NoSteerableGear)
        );

        let mut inputs = test_inputs();
        inputs.gears[0].fwd_m = -6.0;
        assert!(matches!(
            AcfGeom::from_inputs(&inputs, &params),
            Err(VehError::BadWheelbase(_))
        ));
    }

    #[test]
    fn test_ang_vel_speed_limit() {
        let geom = AcfGeom::from_inputs(&test_inputs(), &AcfParams::default()).unwrap();

        // Straight ahead nothing is limited
        assert_eq!(ang_vel_speed_limit(&geom.veh, 0.0, -1.11), -1.11);

        // 45 deg of steering on a 20 m wheelbase is a 20 m radius. Reversing the angular limit
        // of 4 deg/s gives 1.396 m/s and the centripetal limit sqrt(2) m/s.
        let lim = ang_vel_speed_limit(&geom.veh, 45.0, -4.0);
        assert!((lim + 4f64.to_radians() * 20.0).abs() < 1e-6);

        // Forwards the centripetal limit binds
        let lim = ang_vel_speed_limit(&geom.veh, 45.0, 4.0);
        assert!((lim - 2f64.sqrt()).abs() < 1e-6);
    }
}
