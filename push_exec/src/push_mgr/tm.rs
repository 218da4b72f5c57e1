//! # Defines the telemetry record of a pushback session

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use serde::Serialize;

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

/// One tick of a session, flat so it can be archived as a CSV row.
#[derive(Debug, Clone, Serialize, Default)]
pub struct PushTm {
    pub time_s: f64,
    pub phase: String,
    pub hint: String,

    pub pos_x_m: f64,
    pub pos_y_m: f64,
    pub hdg_deg: f64,
    pub spd_ms: f64,

    pub tgt_spd_ms: f64,
    pub force_n: f64,
    pub nw_steer_deg: f64,
    pub hdg_corr_deg: f64,

    pub tug_x_m: f64,
    pub tug_y_m: f64,
    pub tug_hdg_deg: f64,
    pub tug_steer_deg: f64,

    /// Route segments left to push along
    pub segs_left: usize,

    pub lift: f64,
}
