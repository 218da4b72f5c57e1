//! # Disconnection phases
//!
//! Once the body is parked the nose gear is lowered and released, and the tug pulls off, clears
//! to one side of the body and drives back to where it came from.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::notify::Announcement;
use log::{info, warn};
use nalgebra::Vector2;
use util::maths::{clamp, dir2hdg, hdg2dir, rel_hdg, right_normal};

use super::{connect::LIFT_TE_SND, Phase, PushMgrError, StepAction, StepCtx, STATE_TRANS_DELAY_S};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

const LOWER_DURATION_S: f64 = 9.0;

/// Time taken to open the cradle around the nose gear tire.
const UNGRAB_DURATION_S: f64 = 10.0;

/// Time taken to release and stow the winch strap.
const UNWINCH_DURATION_S: f64 = 4.0;

const CRADLE_CLOSE_DURATION_S: f64 = 10.0;

/// Time the ground crew shows the clear signal for.
const CLEAR_SIGNAL_DELAY_S: f64 = 15.0;

/// The tug is done once it has been driving away for this long, wherever it is.
const MAX_DRIVING_AWAY_S: f64 = 30.0;

/// Straight drive away used when no better way back can be planned.
const FALLBACK_DRIVE_AWAY_M: f64 = 80.0;

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

pub(super) fn enter_lowering(ctx: &mut StepCtx) {
    ctx.announce(Announcement::Disconnecting);
}

pub(super) fn lowering(ctx: &mut StepCtx) -> StepAction {
    ctx.zero_force();
    ctx.set_brakes(true);

    if !ctx.voice_idle(0.0) {
        return StepAction::Hold;
    }

    let t = ctx.elapsed_s();
    if t <= STATE_TRANS_DELAY_S {
        return StepAction::Continue;
    }

    let fract = clamp(
        &(1.0 - (t - STATE_TRANS_DELAY_S) / LOWER_DURATION_S),
        &0.0,
        &1.0,
    );
    ctx.tug.anim.lift = fract;
    ctx.st.nw_lift_m = ctx.tug.info.lift_height_m * fract + ctx.tug.info.plat_h_m;

    if fract > 0.0 {
        ctx.tug.anim.engine_snd = LIFT_TE_SND;
        return StepAction::Continue;
    }

    ctx.tug.anim.engine_snd = 0.0;

    StepAction::Advance(Phase::Ungrabbing)
}

pub(super) fn ungrabbing(ctx: &mut StepCtx) -> StepAction {
    let t = ctx.elapsed_s();

    let done = if ctx.is_winch() {
        if t >= STATE_TRANS_DELAY_S {
            ctx.tug.anim.winch_on = false;
        }
        t >= UNWINCH_DURATION_S
    } else {
        ctx.tug.anim.cradle_closure = clamp(&(1.0 - t / UNGRAB_DURATION_S), &0.0, &1.0);
        t >= UNGRAB_DURATION_S + STATE_TRANS_DELAY_S
    };

    if !done {
        return StepAction::Continue;
    }

    ctx.set_brakes(false);
    ctx.st.reconnect = false;
    ctx.st.ok_to_disconnect = false;

    StepAction::Advance(Phase::WaitingForDisconnectOk)
}

pub(super) fn waiting_for_disconnect_ok(ctx: &mut StepCtx) -> StepAction {
    if ctx.cfg.disco_when_done {
        ctx.st.ok_to_disconnect = true;
    }

    if !ctx.st.ok_to_disconnect {
        return StepAction::Hold;
    }

    StepAction::AdvanceAfterDwell(Phase::MovingAway)
}

/// Pull straight off the nose gear, back to the approach point.
pub(super) fn enter_moving_away(ctx: &mut StepCtx) {
    let target = ctx.conn_origin() + ctx.pose.dir() * ctx.tug.info.apch_dist_m;
    let hdg = ctx.pose.hdg_deg;

    ctx.tug.plan_straight_to(target, hdg);
}

pub(super) fn moving_away(ctx: &mut StepCtx) -> StepAction {
    // The body rolls back down the platform ramp as the tug pulls away
    if ctx.is_winch() {
        let info = &ctx.tug.info;
        let tug_fwd_m = (ctx.tug.pose.pos_m - ctx.nw_pos()).dot(&ctx.pose.dir());
        let ramp_m = info.lift_wall_fwd_m - info.plat_fwd_m;
        ctx.st.nw_lift_m = if ramp_m > 0.0 {
            info.plat_h_m * clamp(&((-tug_fwd_m - info.plat_fwd_m) / ramp_m), &0.0, &1.0)
        } else {
            0.0
        };
    }

    if !ctx.tug.is_stopped() {
        return StepAction::Continue;
    }

    ctx.st.nw_lift_m = 0.0;

    StepAction::Advance(Phase::ClosingCradle)
}

/// Close the cradle and tell the crew which way the tug will clear.
pub(super) fn closing_cradle(ctx: &mut StepCtx) -> StepAction {
    let t = ctx.elapsed_s();
    ctx.tug.anim.cradle_closure = clamp(&(t / CRADLE_CLOSE_DURATION_S), &0.0, &1.0);

    if t < CRADLE_CLOSE_DURATION_S + STATE_TRANS_DELAY_S {
        return StepAction::Continue;
    }

    // Clear towards the side the tug came from
    let to_start = ctx.st.tug_start_axle_m - ctx.pose.pos_m;
    ctx.st.clear_right =
        to_start.norm() < 1e-3 || rel_hdg(ctx.pose.hdg_deg, dir2hdg(&to_start)) >= 0.0;

    let done = if ctx.st.clear_right {
        Announcement::DoneRight
    } else {
        Announcement::DoneLeft
    };
    ctx.announce(done);
    ctx.tug.anim.cradle_lights = false;

    StepAction::Advance(Phase::StartingToClear)
}

/// Plan the tug's way out to the side, turning off in front of the body and stopping abeam of it.
pub(super) fn starting_to_clear(ctx: &mut StepCtx) -> Result<StepAction, PushMgrError> {
    if !ctx.voice_idle(STATE_TRANS_DELAY_S) {
        return Ok(StepAction::Hold);
    }

    let side = if ctx.st.clear_right { 1.0 } else { -1.0 };
    let wb = ctx.tug.info.veh.wheelbase_m;
    let acf_wb = ctx.geom.wheelbase_m();
    let hdg = ctx.tug.pose.hdg_deg;
    let dir = hdg2dir(hdg);
    let norm = right_normal(&dir) * side;

    let turn_pt = ctx.tug.axle_pos() + dir * (3.0 * wb) + norm * (acf_wb / 2.0).max(3.0 * wb);
    ctx.tug.plan_axle_to(turn_pt, hdg + 90.0 * side)?;

    let abeam = turn_pt - dir * (2.0 * wb) + norm * (4.0 * wb);
    ctx.tug.plan_axle_to(abeam, hdg + 135.0 * side)?;

    info!(
        "Tug clearing to the {}",
        if ctx.st.clear_right { "right" } else { "left" }
    );

    Ok(StepAction::Advance(Phase::MovingToClear))
}

pub(super) fn moving_to_clear(ctx: &mut StepCtx) -> StepAction {
    if !ctx.tug.is_stopped() {
        return StepAction::Continue;
    }

    StepAction::Advance(Phase::ClearSignal)
}

pub(super) fn clear_signal(ctx: &mut StepCtx) -> Result<StepAction, PushMgrError> {
    ctx.tug.anim.clear_signal = true;

    if ctx.elapsed_s() < CLEAR_SIGNAL_DELAY_S {
        return Ok(StepAction::Continue);
    }

    ctx.tug.anim.clear_signal = false;
    plan_drive_away(ctx)?;

    Ok(StepAction::Advance(Phase::DrivingAway))
}

pub(super) fn driving_away(ctx: &mut StepCtx) -> StepAction {
    if ctx.tug.is_stopped() || ctx.elapsed_s() > MAX_DRIVING_AWAY_S {
        return StepAction::Complete;
    }

    StepAction::Continue
}

/// Plan the tug's way back to where it was spawned.
///
/// If the way back would pass close to the body, or can't be planned, the tug drives straight on
/// instead.
fn plan_drive_away(ctx: &mut StepCtx) -> Result<(), PushMgrError> {
    let target = ctx.st.tug_start_axle_m;
    let target_hdg = ctx.st.tug_start_hdg_deg;
    let acf_wb = ctx.geom.wheelbase_m();

    // Where the target is relative to the body
    let rel = target - ctx.pose.pos_m;
    let long_m = rel.dot(&ctx.pose.dir());
    let lat_m = rel.dot(&right_normal(&ctx.pose.dir()));
    let near_body = lat_m.abs() < 1.5 * acf_wb && long_m > -4.0 * acf_wb;

    if !near_body && try_plan_back(ctx, target, target_hdg) {
        return Ok(());
    }

    warn!("No way back to the tug's start planned, driving straight on");
    ctx.tug.segs.clear();
    let axle = ctx.tug.axle_pos();
    let hdg = ctx.tug.pose.hdg_deg;
    ctx.tug
        .plan_axle_to(axle + hdg2dir(hdg) * FALLBACK_DRIVE_AWAY_M, hdg)?;

    Ok(())
}

/// Plan back to the target directly if it's ahead of the tug, or through a point off to the side
/// if not. Returns false, with nothing queued, if neither works.
fn try_plan_back(ctx: &mut StepCtx, target: Vector2<f64>, target_hdg: f64) -> bool {
    let axle = ctx.tug.axle_pos();
    let hdg = ctx.tug.pose.hdg_deg;
    let wb = ctx.tug.info.veh.wheelbase_m;

    let to_target = target - axle;
    if rel_hdg(hdg, dir2hdg(&to_target)).abs() < 90.0
        && ctx.tug.plan_axle_to(target, target_hdg).is_ok()
    {
        return true;
    }
    ctx.tug.segs.clear();

    let side = if ctx.st.clear_right { 1.0 } else { -1.0 };
    let dir = hdg2dir(hdg);
    let via = axle + dir * (2.0 * wb) + right_normal(&dir) * (side * 2.0 * wb);

    let planned = ctx.tug.plan_axle_to(via, hdg + 90.0 * side).is_ok()
        && ctx.tug.plan_axle_to(target, target_hdg).is_ok();
    if !planned {
        ctx.tug.segs.clear();
    }

    planned
}
