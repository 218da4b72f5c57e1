//! Push control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use crate::veh::PerFriction;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the force controller
#[derive(Deserialize, Debug, Clone)]
pub struct Params {

    /// Hard ceiling on the target speed for each surface friction tier
    pub max_spd_ms: PerFriction<f64>,

    /// Largest force applied per tonne of the body's mass
    pub force_per_ton_n: f64,

    /// Below this speed the body is considered not to have broken away yet
    pub breakaway_thresh_ms: f64,

    /// Multiplier on the acceleration allowance until breakaway
    pub breakaway_accel_mult: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            max_spd_ms: PerFriction {
                good: 4.0,
                medium: 2.0,
                poor: 1.11,
            },
            force_per_ton_n: 5000.0,
            breakaway_thresh_ms: 0.09,
            breakaway_accel_mult: 100.0,
        }
    }
}
