//! # Push phases
//!
//! The body is pushed along the route by steering the tug so the nose gear follows the segment
//! follower's steering demand, while the force controller holds the demanded speed. Once the
//! route is finished the body is straightened, stopped and held on its brakes.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::notify::Announcement;
use log::{debug, info};
use util::maths::{clamp, fx_lin, rel_hdg};

use super::{
    manual, Phase, Role, StepAction, StepCtx, REVERSE_PAUSE_S, SPEED_COMPLETE_THRESH_MS,
};
use crate::drive_ctrl::DriveStatus;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Time the body is held still while the tug takes up the load.
const START_DELAY_S: f64 = 5.0;

/// Heading error to the final heading below which the body counts as straight.
const FINAL_HDG_THRESH_DEG: f64 = 1.0;

/// Tug steering below which the tug counts as straight.
const TUG_STRAIGHT_THRESH_DEG: f64 = 5.0;

/// Nose gear steering below which the nose gear counts as straight.
const NW_STRAIGHT_THRESH_DEG: f64 = 2.5;

/// Divisor floor for the coupling angle speed compensation.
const MIN_COS_STEER: f64 = 0.1;

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

pub(super) fn enter_starting(ctx: &mut StepCtx) {
    let backward = if ctx.manual.active {
        !ctx.manual.forward
    } else {
        ctx.st
            .segs
            .peek_head()
            .map(|s| s.is_backward())
            .unwrap_or(true)
    };

    ctx.announce(Announcement::PushStarted { backward });
}

pub(super) fn starting(ctx: &mut StepCtx) -> StepAction {
    ctx.set_brakes(false);

    if ctx.elapsed_s() >= START_DELAY_S {
        return StepAction::Advance(Phase::Pushing);
    }

    if ctx.manual.active {
        ctx.manual.angle_pct = 0.0;
        ctx.manual.paused = false;
        ctx.st.last_seg_backward = !ctx.manual.forward;
        ctx.st.final_hdg = None;
    } else if let Some(tail) = ctx.st.segs.peek_tail() {
        ctx.st.last_seg_backward = tail.is_backward();
        ctx.st.final_hdg = if tail.is_straight() {
            None
        } else {
            Some(tail.end_hdg())
        };
    }

    ctx.turn_nosewheel(0.0);
    ctx.push(0.0, false);

    StepAction::Continue
}

pub(super) fn pushing(ctx: &mut StepCtx) -> StepAction {
    if ctx.inputs.lights_on() {
        if !ctx.st.light_warning {
            ctx.message("Turn off the landing and taxi lights, the push is paused".into());
            ctx.st.light_warning = true;
        }
        let steer = ctx.st.nw_steer_deg;
        ctx.turn_nosewheel(steer);
        ctx.push(0.0, true);
        return StepAction::Continue;
    }

    // The master drives a shared push, a slave only mirrors it
    if ctx.cfg.role == Role::Slave {
        return StepAction::Continue;
    }

    let running = if ctx.manual.active {
        manual::run_push_manual(ctx)
    } else {
        run_push(ctx)
    };

    if running {
        return StepAction::Continue;
    }

    info!("Push finished");
    ctx.st.op_complete = true;
    ctx.manual.active = false;

    StepAction::Advance(Phase::Stopping)
}

/// Hold the body if the crew is braking it, or the push is pausing for a change of direction.
///
/// Returns true if the body is being held.
pub(super) fn hold_body(ctx: &mut StepCtx) -> bool {
    if ctx.brakes_applied() {
        ctx.zero_force();
        return true;
    }

    if let Some(reverse_s) = ctx.st.reverse_s {
        if ctx.now_s - reverse_s < REVERSE_PAUSE_S {
            ctx.turn_nosewheel(0.0);
            ctx.push(0.0, true);
            return true;
        }
        ctx.st.reverse_s = None;
    }

    false
}

/// Push along the route. Returns false once the route is finished.
fn run_push(ctx: &mut StepCtx) -> bool {
    if hold_body(ctx) {
        return true;
    }

    let corr = ctx.corr_pos();

    loop {
        let status = ctx
            .drive_ctrl
            .drive_segs(&corr, &ctx.geom.veh, &mut ctx.st.segs, ctx.d_t);

        match status {
            DriveStatus::Driving(cmd) => {
                ctx.turn_nosewheel(cmd.steer_deg);

                let cos_steer = ctx.st.nw_steer_deg.to_radians().cos().max(MIN_COS_STEER);
                ctx.push(cmd.spd_ms / cos_steer, cmd.decelerating);
                return true;
            }
            DriveStatus::SegComplete(done) => {
                debug!("Route segment complete, {} left", ctx.st.segs.len());

                let next_backward = match ctx.st.segs.peek_head() {
                    Some(s) => s.is_backward(),
                    None => return false,
                };
                if next_backward != done.is_backward() {
                    info!("Changing direction");
                    ctx.st.reverse_s = Some(ctx.now_s);
                    ctx.turn_nosewheel(0.0);
                    ctx.push(0.0, true);
                    return true;
                }
            }
            DriveStatus::Finished => return false,
        }
    }
}

/// Straighten the body and bring it to a stop.
pub(super) fn stopping(ctx: &mut StepCtx) -> StepAction {
    let dir_mult = if ctx.st.last_seg_backward { -1.0 } else { 1.0 };
    let creep_ms = dir_mult * ctx.params.creep_spd_ms;

    let final_err_deg = ctx
        .st
        .final_hdg
        .map(|h| rel_hdg(ctx.pose.hdg_deg, h))
        .filter(|e| e.abs() > FINAL_HDG_THRESH_DEG);

    let done = match final_err_deg {
        Some(err_deg) => {
            // Long bodies on short tugs need more steering for the same heading change
            let wb_ratio = ctx.geom.wheelbase_m() / ctx.tug.info.veh.wheelbase_m;
            let gain = clamp(&fx_lin(wb_ratio, 1.0, 3.0, 5.0, 10.0), &2.0, &10.0);

            ctx.turn_nosewheel(dir_mult * err_deg * gain);
            ctx.push(creep_ms, false);
            false
        }
        None => {
            ctx.st.final_hdg = None;
            ctx.turn_nosewheel(0.0);

            if ctx.tug.steer_deg.abs() > TUG_STRAIGHT_THRESH_DEG
                || ctx.st.nw_steer_deg.abs() > NW_STRAIGHT_THRESH_DEG
            {
                ctx.push(creep_ms, false);
                false
            } else {
                if ctx.brakes_applied() {
                    ctx.zero_force();
                } else {
                    ctx.push(0.0, true);
                }
                true
            }
        }
    };

    if !done || ctx.pose.spd_ms.abs() >= SPEED_COMPLETE_THRESH_MS {
        return StepAction::Hold;
    }

    ctx.set_brakes(true);

    StepAction::AdvanceAfterDwell(Phase::Stopped)
}

pub(super) fn enter_stopped(ctx: &mut StepCtx) {
    ctx.set_brakes(true);
    ctx.announce(Announcement::OpComplete);
}

/// Hold the body on its brakes until the crew sets the parking brake.
pub(super) fn stopped(ctx: &mut StepCtx) -> StepAction {
    ctx.turn_nosewheel(0.0);
    ctx.zero_force();
    ctx.set_brakes(true);

    if !ctx.cfg.ignore_park_brake && !ctx.park_brake_set() {
        return StepAction::Hold;
    }

    if !ctx.voice_idle(0.0) {
        return StepAction::Hold;
    }

    StepAction::AdvanceAfterDwell(Phase::Lowering)
}
