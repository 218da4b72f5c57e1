//! # Manual push
//!
//! In manual mode the operator drives the push instead of a route. Steering comes from the
//! yoke's roll axis, or from keyboard steps kept as a percentage of the nose gear's maximum, and
//! speed from the yoke's pitch axis or the body's maximum forward speed.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::tc::ManualCmd;
use log::debug;
use util::maths::{clamp, clamp_abs};

use super::{push::hold_body, StepCtx};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Above this steering angle the body is held to its reversing speed in either direction.
const MANUAL_MAX_FWD_STEER_DEG: f64 = 35.0;

const MIN_COS_STEER: f64 = 0.1;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Manual push settings.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ManualPush {
    pub active: bool,

    /// Steer and throttle with the yoke
    pub yoke: bool,

    /// Keyboard steering, percent of the maximum, positive right
    pub angle_pct: f64,

    pub paused: bool,

    /// Towing forwards rather than pushing back
    pub forward: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ManualPush {
    pub fn apply(&mut self, cmd: ManualCmd) {
        match cmd {
            ManualCmd::Activate { yoke } => {
                *self = ManualPush {
                    active: true,
                    yoke,
                    ..Default::default()
                }
            }
            ManualCmd::Deactivate => self.active = false,
            ManualCmd::SteerStep { delta_pct } => {
                self.angle_pct = clamp(&(self.angle_pct + delta_pct), &-100.0, &100.0)
            }
            ManualCmd::TogglePause => self.paused = !self.paused,
            ManualCmd::ToggleDirection => self.forward = !self.forward,
        }

        debug!("Manual push now {:?}", self);
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Push as the operator asks. Returns false once manual mode has been turned off.
pub(super) fn run_push_manual(ctx: &mut StepCtx) -> bool {
    if !ctx.manual.active {
        return false;
    }

    if hold_body(ctx) {
        return true;
    }

    let veh = &ctx.geom.veh;
    let yoke = if ctx.manual.yoke { ctx.inputs.yoke } else { None };

    let angle_fract = match yoke {
        Some(y) => clamp(&y.roll, &-1.0, &1.0),
        None => ctx.manual.angle_pct / 100.0,
    };
    let angle_deg = angle_fract * veh.max_steer_deg;

    let mut spd_ms = match yoke {
        Some(y) => veh.max_fwd_spd_ms * clamp(&y.pitch, &0.0, &1.0),
        None => veh.max_fwd_spd_ms,
    };
    if !ctx.manual.forward {
        spd_ms = -spd_ms;
    }
    spd_ms = spd_ms.max(-veh.max_rev_spd_ms);
    if angle_deg.abs() > MANUAL_MAX_FWD_STEER_DEG {
        spd_ms = clamp_abs(spd_ms, veh.max_rev_spd_ms);
    }

    let spd_mult = if ctx.manual.paused {
        0.0
    } else {
        angle_deg.to_radians().cos().max(MIN_COS_STEER)
    };

    ctx.turn_nosewheel(angle_deg);
    ctx.push(spd_ms * spd_mult, false);

    true
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_manual_cmds() {
        let mut m = ManualPush::default();

        m.apply(ManualCmd::Activate { yoke: false });
        assert!(m.active);
        assert!(!m.forward);

        m.apply(ManualCmd::SteerStep { delta_pct: 60.0 });
        m.apply(ManualCmd::SteerStep { delta_pct: 60.0 });
        assert_eq!(m.angle_pct, 100.0);
        m.apply(ManualCmd::SteerStep { delta_pct: -150.0 });
        assert_eq!(m.angle_pct, -50.0);

        m.apply(ManualCmd::TogglePause);
        assert!(m.paused);
        m.apply(ManualCmd::ToggleDirection);
        assert!(m.forward);

        // Activating again starts from a clean state
        m.apply(ManualCmd::Activate { yoke: true });
        assert_eq!(
            m,
            ManualPush {
                active: true,
                yoke: true,
                ..Default::default()
            }
        );

        m.apply(ManualCmd::Deactivate);
        assert!(!m.active);
    }
}
