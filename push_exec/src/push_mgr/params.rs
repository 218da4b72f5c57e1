//! # PushMgr Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::notify::Announcement;
use serde::Deserialize;

use crate::{coupling, drive_ctrl, push_ctrl, veh::AcfParams};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of a pushback session.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Limits used to build the body's kinematic profile
    pub acf: AcfParams,

    pub coupling: coupling::Params,

    pub voice: VoiceParams,

    /// Speed the body is moved at while it is straightened after the push
    pub creep_spd_ms: f64,

    /// A slave ends the push once no session state has been received for this long
    pub sync_timeout_s: f64,

    /// A session can't be started with the body moving at or above this speed
    pub max_start_spd_ms: f64,
}

/// Time each announcement takes to play. The session waits for an announcement to finish before
/// moving on from the phases which make one.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VoiceParams {
    pub driving_up_s: f64,
    pub ready_to_connect_s: f64,
    pub winch_s: f64,
    pub connected_s: f64,
    pub push_started_s: f64,
    pub op_complete_s: f64,
    pub disconnecting_s: f64,
    pub done_s: f64,
}

/// Parameters of the controllers run during a session.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CtrlParams {
    /// Segment follower used for the body
    pub drive: drive_ctrl::Params,

    pub push: push_ctrl::Params,

    /// Segment follower used by the tug for its own maneuvers
    pub tug_drive: drive_ctrl::Params,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            acf: AcfParams::default(),
            coupling: coupling::Params::default(),
            voice: VoiceParams::default(),
            creep_spd_ms: 0.3,
            sync_timeout_s: 5.0,
            max_start_spd_ms: 1.0,
        }
    }
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self {
            driving_up_s: 3.0,
            ready_to_connect_s: 5.0,
            winch_s: 4.0,
            connected_s: 3.0,
            push_started_s: 4.0,
            op_complete_s: 4.0,
            disconnecting_s: 3.0,
            done_s: 3.0,
        }
    }
}

impl VoiceParams {
    pub fn duration_s(&self, announcement: Announcement) -> f64 {
        match announcement {
            Announcement::DrivingUp => self.driving_up_s,
            Announcement::ReadyToConnect { .. } => self.ready_to_connect_s,
            Announcement::Winch => self.winch_s,
            Announcement::Connected => self.connected_s,
            Announcement::PushStarted { .. } => self.push_started_s,
            Announcement::OpComplete => self.op_complete_s,
            Announcement::Disconnecting => self.disconnecting_s,
            Announcement::DoneRight | Announcement::DoneLeft => self.done_s,
        }
    }
}

impl Default for CtrlParams {
    fn default() -> Self {
        Self {
            drive: drive_ctrl::Params::default(),
            push: push_ctrl::Params::default(),
            tug_drive: drive_ctrl::Params::default(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn params_path(file: &str) -> String {
        format!("{}/../params/{}", env!("CARGO_MANIFEST_DIR"), file)
    }

    #[test]
    fn test_param_files() {
        let params: Params = util::params::load_from(params_path("push_mgr.toml")).unwrap();
        assert_eq!(params.acf.max_rev_spd_ms, 1.11);
        assert_eq!(params.acf.max_steer_cap_deg.medium, 50.0);
        assert_eq!(params.coupling.max_coupling_deg, 85.0);
        assert_eq!(params.voice.duration_s(Announcement::DoneLeft), 3.0);

        let ctrl: CtrlParams = util::params::load_from(params_path("ctrl.toml")).unwrap();
        assert_eq!(ctrl.push.force_per_ton_n, 5000.0);
        assert_eq!(ctrl.push.max_spd_ms.poor, 1.11);
        assert_eq!(ctrl.tug_drive.min_creep_spd_ms, 0.1);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let params: Params = util::params::from_str("creep_spd_ms = 0.5").unwrap();
        assert_eq!(params.creep_spd_ms, 0.5);
        assert_eq!(params.sync_timeout_s, 5.0);
        assert_eq!(params.voice.connected_s, 3.0);
    }
}
