//! # Tug Render Interface

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Everything the host needs to draw the tug on a tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TugRender {
    /// Name of the tug model
    pub name: String,

    pub pos_m: Vector2<f64>,

    pub hdg_deg: f64,

    pub spd_ms: f64,

    pub steer_deg: f64,

    /// Nose gear cradle closure, `0` open to `1` closed
    pub cradle: f64,

    /// Lift mechanism position, `0` down to `1` up
    pub lift: f64,

    /// Distance the winch has pulled the body onto the tug
    pub winch_dist_m: f64,

    pub winch_on: bool,

    pub cradle_lights: bool,

    pub hazard_lights: bool,

    /// Ground crew clear signal is being shown
    pub clear_signal: bool,

    /// Engine sound intensity, `0..1`
    pub engine_snd: f64,

    /// Wheel rotation for the tire animation
    pub tire_rot_deg: f64,
}
