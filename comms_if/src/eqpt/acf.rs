//! # Towed Body Interface
//!
//! Data the host reports about the towed body every tick, and the requests the pushback core
//! makes of the host in return.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::net::SyncState;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Everything the core reads from the host on a tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostInputs {
    /// Simulation time of this tick
    pub time_s: f64,

    /// World position of the body's reference point
    pub pos_m: Vector2<f64>,

    /// Compass heading of the body
    pub hdg_deg: f64,

    /// Signed longitudinal speed, positive forwards
    pub spd_ms: f64,

    /// Landing gear, in the host's order
    pub gears: Vec<GearState>,

    /// The two steering limits declared for the nose gear (low and high speed)
    pub nw_steer_max_deg: [f64; 2],

    /// Current mass
    pub mass_kg: f64,

    /// Maximum takeoff mass, used for tug selection
    pub mtow_kg: f64,

    /// Brake pedal application, the largest of left and right, `0..1`
    pub brake_pedal: f64,

    /// Parking brake application, `0..1`
    pub park_brake: f64,

    pub engines: EngineState,

    pub friction: FrictionTier,

    pub lights: LightState,

    /// True while the host grants this core the authority to steer the nose gear. False means
    /// another agent has taken the steering.
    pub steer_authority: bool,

    /// True when doors are closed and ground equipment is clear of the tug's path
    pub doors_clear: bool,

    /// Analog inputs used in manual push mode, if present
    pub yoke: Option<YokeAxes>,

    /// Latest copy of the replicated session state, if this instance takes part in a shared
    /// session
    pub sync: Option<SyncState>,
}

/// State of one landing gear.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GearState {
    /// Longitudinal position of the gear contact point, positive forwards of the reference point
    pub fwd_m: f64,

    /// True if this gear can be steered
    pub steerable: bool,

    /// True if the tire is touching the ground
    pub on_ground: bool,

    /// True if the gear is down and locked
    pub deployed: bool,

    /// Length of the gear leg (strut) from pivot to axle
    pub leg_len_m: f64,

    /// Tire radius
    pub tire_radius_m: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct EngineState {
    /// Number of engines fitted
    pub count: u32,

    /// True if any engine is running
    pub any_running: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LightState {
    pub landing: bool,
    pub taxi: bool,
}

/// Manual-push analog inputs, all in `-1..1`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct YokeAxes {
    /// Steering input, positive right
    pub roll: f64,

    /// Throttle input, positive forward
    pub pitch: f64,
}

/// Requests the core makes of the host on a tick.
///
/// Forces and moments are applied in addition to whatever the host's own physics produces.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct HostRequests {
    /// True if the core requires the host to hand it nose gear steering
    pub override_steer: bool,

    /// Nose gear steering angle to apply, positive right
    pub nw_steer_deg: Option<f64>,

    /// Longitudinal force on the body, positive forwards
    pub axial_force_n: f64,

    /// Moment about the body's vertical axis, positive clockwise seen from above
    pub yaw_moment_nm: f64,

    /// Moment about the body's lateral axis, positive nose up
    pub pitch_moment_nm: f64,

    /// Orientation correction to add to the body's heading this tick. Applied directly, not
    /// through the physics.
    pub hdg_corr_deg: f64,

    /// Brake application to set, if the core wants to change it
    pub brakes: Option<f64>,

    /// Height the tug has lifted the nose gear by
    pub nw_lift_m: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Surface friction, as reported by the host's weather.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum FrictionTier {
    Good,
    Medium,
    Poor,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for FrictionTier {
    fn default() -> Self {
        FrictionTier::Good
    }
}

impl HostInputs {
    /// Iterator over gears which are down.
    pub fn deployed_gears(&self) -> impl Iterator<Item = (usize, &GearState)> {
        self.gears.iter().enumerate().filter(|(_, g)| g.deployed)
    }

    /// True if any landing or taxi light is on.
    pub fn lights_on(&self) -> bool {
        self.lights.landing || self.lights.taxi
    }

    /// True if every deployed gear is on the ground.
    pub fn on_ground(&self) -> bool {
        let mut any = false;

        for (_, g) in self.deployed_gears() {
            if !g.on_ground {
                return false;
            }
            any = true;
        }

        any
    }
}
