//! # Connection phases
//!
//! The tug drives up to the body, opens its cradle and gets hold of the nose gear, either by
//! closing the cradle around the tire or by winching the body up onto its platform. The nose gear
//! is then lifted and the route is handed to the segment follower.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::notify::Announcement;
use log::info;
use util::maths::{clamp, right_normal};

use super::{
    Phase, PushMgrError, StepAction, StepCtx, STATE_TRANS_DELAY_S, TUG_APPCH_LONG_WB,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Time taken to open the cradle.
const CRADLE_DELAY_S: f64 = 10.0;

/// Time taken to close the cradle around the nose gear tire.
const CONN_GRAB_DURATION_S: f64 = 13.0;

/// Time taken to lift the nose gear.
const CONN_LIFT_DURATION_S: f64 = 9.0;

/// Time taken to attach the winch strap, and again to take up its slack.
const WINCH_STRAP_S: f64 = 2.0;

/// Speed the body is winched onto the platform at.
const WINCH_SPD_MS: f64 = 0.05;

/// Engine sound while the lift or winch is working.
pub(super) const LIFT_TE_SND: f64 = 0.075;

/// Long approach turn-in point, to the left of the centreline, in tug wheelbases.
const APPCH_TURN_IN_SIDE_WB: f64 = 2.0;

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

pub(super) fn tug_dispatched(_ctx: &mut StepCtx) -> StepAction {
    StepAction::Advance(Phase::ApproachStart)
}

/// Plan the tug's way to the approach point ahead of the nose gear.
pub(super) fn approach_start(ctx: &mut StepCtx) -> Result<StepAction, PushMgrError> {
    let dir = ctx.pose.dir();
    let hdg = ctx.pose.hdg_deg;
    let wb = ctx.tug.info.veh.wheelbase_m;
    let apch = ctx.conn_origin() + dir * ctx.tug.info.apch_dist_m;

    if ctx.cfg.tug_starts_next_plane {
        ctx.tug.plan_straight_to(apch, hdg);
    } else {
        // Cross in front of the body, then back round onto the centreline
        let turn_in = ctx.nw_pos() + dir * (TUG_APPCH_LONG_WB * wb)
            - right_normal(&dir) * (APPCH_TURN_IN_SIDE_WB * wb);
        ctx.tug.plan_axle_to(turn_in, hdg - 90.0)?;
        ctx.tug.plan_to(apch, hdg)?;
    }

    ctx.announce(Announcement::DrivingUp);

    Ok(StepAction::Advance(Phase::DrivingUpClose))
}

pub(super) fn driving_up_close(ctx: &mut StepCtx) -> StepAction {
    if !ctx.tug.is_stopped() {
        return StepAction::Hold;
    }

    StepAction::AdvanceAfterDwell(Phase::WaitingForDoors)
}

pub(super) fn enter_waiting_for_doors(ctx: &mut StepCtx) {
    ctx.tug.anim.cradle_lights = true;
}

pub(super) fn waiting_for_doors(ctx: &mut StepCtx) -> StepAction {
    if !ctx.cfg.ignore_doors_check && !ctx.inputs.doors_clear && !ctx.st.doors_warning {
        ctx.message("Close the doors and clear the ground equipment so the tug can connect".into());
        ctx.st.doors_warning = true;
    }

    StepAction::Advance(Phase::OpeningCradle)
}

pub(super) fn opening_cradle(ctx: &mut StepCtx) -> StepAction {
    if !ctx.cfg.ignore_doors_check && !ctx.inputs.doors_clear {
        return StepAction::Hold;
    }

    let t = ctx.elapsed_s();
    ctx.tug.anim.cradle_closure = clamp(&(1.0 - t / CRADLE_DELAY_S), &0.0, &1.0);

    if t < CRADLE_DELAY_S + STATE_TRANS_DELAY_S {
        return StepAction::Continue;
    }

    if !ctx.st.reconnect {
        let park_brake_set = ctx.park_brake_set();
        ctx.announce(Announcement::ReadyToConnect { park_brake_set });
    }

    StepAction::Advance(Phase::WaitingForParkBrake)
}

pub(super) fn waiting_for_park_brake(ctx: &mut StepCtx) -> StepAction {
    if (!ctx.cfg.ignore_park_brake && !ctx.park_brake_set()) || !ctx.voice_idle(0.0) {
        return StepAction::Hold;
    }

    StepAction::AdvanceAfterDwell(Phase::DrivingUpConnect)
}

/// Plan the final slow drive in: grab tugs put the cradle round the tire, winch tugs put the
/// platform edge against it.
pub(super) fn enter_driving_up_connect(ctx: &mut StepCtx) {
    let target = if ctx.is_winch() {
        ctx.nw_pos() - ctx.pose.dir() * ctx.tug.info.plat_fwd_m
    } else {
        ctx.conn_origin()
    };
    let hdg = ctx.pose.hdg_deg;

    ctx.tug.plan_straight_to(target, hdg);
}

pub(super) fn driving_up_connect(ctx: &mut StepCtx) -> StepAction {
    if !ctx.cfg.ignore_park_brake {
        ctx.set_brakes(true);
    }

    if !ctx.tug.is_stopped() {
        return StepAction::Hold;
    }

    StepAction::AdvanceAfterDwell(Phase::Grabbing)
}

pub(super) fn enter_grabbing(ctx: &mut StepCtx) {
    ctx.st.nw_steer_deg = 0.0;

    if ctx.is_winch() && !ctx.st.reconnect {
        ctx.st.winch_start_nw_m = Some(ctx.nw_pos());
        ctx.st.winch_complete = false;
        ctx.st.winch_called = false;
        ctx.tug.anim.winch_dist_m = ctx.tug.info.winch_dist_m(ctx.geom.nw_tire_radius_m);
    }
}

pub(super) fn grabbing(ctx: &mut StepCtx) -> StepAction {
    let t = ctx.elapsed_s();

    if !ctx.is_winch() {
        ctx.tug.anim.cradle_closure = clamp(&(t / CONN_GRAB_DURATION_S), &0.0, &1.0);

        return if t < CONN_GRAB_DURATION_S {
            StepAction::Continue
        } else {
            StepAction::Advance(Phase::Lifting)
        };
    }

    if ctx.st.winch_complete {
        return StepAction::Advance(Phase::Lifting);
    }

    if t < WINCH_STRAP_S {
        return StepAction::Continue;
    }
    ctx.tug.anim.winch_on = true;
    ctx.tug.anim.engine_snd = LIFT_TE_SND;
    if t < 2.0 * WINCH_STRAP_S {
        return StepAction::Continue;
    }

    // The body can only be winched once the crew has released the parking brake
    if ctx.park_brake_set() && !ctx.cfg.ignore_park_brake {
        if !ctx.st.winch_called {
            ctx.announce(Announcement::Winch);
            ctx.st.winch_called = true;
        }
        return StepAction::Continue;
    }

    let start = match ctx.st.winch_start_nw_m {
        Some(s) => s,
        None => ctx.nw_pos(),
    };
    let winched_m = (ctx.nw_pos() - start).dot(&ctx.pose.dir());
    let winch_dist_m = ctx.tug.info.winch_dist_m(ctx.geom.nw_tire_radius_m);

    // The nose gear climbs the platform ramp until it reaches the lift wall
    let info = &ctx.tug.info;
    let ramp_m = info.lift_wall_fwd_m - info.plat_fwd_m;
    let ramp_fract = if ramp_m > 0.0 {
        clamp(&(winched_m / ramp_m), &0.0, &1.0)
    } else {
        1.0
    };
    ctx.st.nw_lift_m = info.plat_h_m * ramp_fract;
    ctx.tug.anim.winch_dist_m = (winch_dist_m - winched_m).max(0.0);

    if winched_m < winch_dist_m {
        ctx.push_at_speed(WINCH_SPD_MS, WINCH_SPD_MS, false, false);
        return StepAction::Continue;
    }

    info!("Winching complete after {:.2} m", winched_m);
    ctx.st.winch_complete = true;
    ctx.tug.anim.winch_on = false;
    ctx.tug.anim.engine_snd = 0.0;
    ctx.zero_force();
    ctx.set_brakes(true);

    StepAction::Advance(Phase::Lifting)
}

pub(super) fn lifting(ctx: &mut StepCtx) -> StepAction {
    let t = ctx.elapsed_s();
    let fract = clamp(&(t / CONN_LIFT_DURATION_S), &0.0, &1.0);

    ctx.tug.anim.lift = fract;
    ctx.tug.anim.engine_snd = if fract < 1.0 { LIFT_TE_SND } else { 0.0 };
    ctx.st.nw_lift_m = ctx.tug.info.lift_height_m * fract + ctx.tug.info.plat_h_m;
    ctx.set_brakes(true);

    if t < CONN_LIFT_DURATION_S + STATE_TRANS_DELAY_S {
        return StepAction::Continue;
    }

    if ctx.st.awaiting_plan && !ctx.manual.active {
        return StepAction::Continue;
    }

    StepAction::Advance(Phase::Connected)
}

/// Hand the route over to the segment follower.
pub(super) fn enter_connected(ctx: &mut StepCtx) {
    ctx.st.segs = std::mem::take(&mut ctx.st.plan);
    ctx.st.reverse_s = None;
    ctx.drive_ctrl.reset();

    info!("Connected, {} route segments to push along", ctx.st.segs.len());

    if !ctx.is_winch() {
        ctx.announce(Announcement::Connected);
    }
}

pub(super) fn connected(ctx: &mut StepCtx) -> StepAction {
    if ctx.st.awaiting_plan && !ctx.manual.active {
        return StepAction::Hold;
    }

    if (!ctx.cfg.ignore_park_brake && ctx.park_brake_set()) || !ctx.voice_idle(0.0) {
        return StepAction::Hold;
    }

    StepAction::AdvanceAfterDwell(Phase::Starting)
}
