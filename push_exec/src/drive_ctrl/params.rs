//! Drive control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the segment follower
#[derive(Deserialize, Debug, Clone)]
pub struct Params {

    /// Heading offset demanded per metre of lateral error
    pub lat_k_p_dpm: f64,

    /// Limit on the heading offset demanded by the lateral error
    pub max_hdg_corr_deg: f64,

    /// Steering demanded per degree of heading error
    pub hdg_k_p: f64,

    /// Steering demanded per degree per second of heading error rate
    pub hdg_k_d: f64,

    /// Fraction of the maximum steering the turn feed-forward may use, the rest is left for
    /// correcting errors.
    pub seg_turn_mult: f64,

    /// The commanded speed never drops below this, so the end of the route is always reached.
    pub min_creep_spd_ms: f64,

    /// Distance from the end of the route at which the steering is neutralised.
    pub nearing_end_thresh_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            lat_k_p_dpm: 3.0,
            max_hdg_corr_deg: 30.0,
            hdg_k_p: 1.5,
            hdg_k_d: 0.3,
            seg_turn_mult: 0.9,
            min_creep_spd_ms: 0.1,
            nearing_end_thresh_m: 1.0,
        }
    }
}
