//! # PushMgr module
//!
//! This module implements the [`PushMgr`] state machine, which runs a pushback session from the
//! tug being dispatched to it driving away. A session moves through a fixed sequence of
//! [`Phase`]s, each of which has a single handler. Handlers are grouped by part of the operation:
//!
//! - `connect` - the tug drives up, opens its cradle, gets hold of the nose gear and lifts it
//! - `push` - the body is pushed along the route and stopped
//! - `disconnect` - the nose gear is lowered and released, and the tug clears the body
//! - `manual` - operator driven pushing, run in place of the route during `Pushing`
//!
//! Handlers report what they want to happen with a [`StepAction`]. Most phase changes are made
//! only once the handler's condition has held for [`STATE_TRANS_DELAY_S`]; that dwell is applied
//! by the dispatcher, not by the handlers.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod connect;
mod disconnect;
pub mod manual;
mod params;
mod push;
pub mod tm;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt::Display;

use comms_if::{
    eqpt::{
        acf::{HostInputs, HostRequests},
        notify::Announcement,
        tug::TugRender,
    },
    net::SyncState,
    tc::ManualCmd,
};
use log::{error, info, warn};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use util::maths::right_normal;

pub use self::{
    manual::ManualPush,
    params::{CtrlParams, Params, VoiceParams},
    tm::PushTm,
};
use crate::{
    coupling::{self, BodyState, TugHdgMode},
    drive_ctrl::DriveCtrl,
    loc::{Pose, PoseDelta},
    path::{PathError, SegQueue},
    push_ctrl::{PushCtrl, PushEnv, PushInput, PushOutput},
    tug::{LiftType, Tug, TugCatalog, TugError},
    veh::{AcfGeom, VehError},
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Time a phase's exit condition must hold before the next phase is entered.
pub const STATE_TRANS_DELAY_S: f64 = 2.0;

/// Ticks closer together than this are skipped.
const MIN_STEP_TIME_S: f64 = 0.001;

/// Below this speed the body is considered stopped.
const SPEED_COMPLETE_THRESH_MS: f64 = 0.08;

/// Brake pedal application above which the push force is dropped.
const BRAKE_PEDAL_THRESH: f64 = 0.03;

/// Parking brake application above which the parking brake counts as set.
const PARK_BRAKE_SET_THRESH: f64 = 0.5;

/// Brake application requested when the tug wants the body held.
const BRAKES_SET: f64 = 0.9;

/// Ticks closer than this after a change of direction command zero speed.
const REVERSE_PAUSE_S: f64 = 2.0 * STATE_TRANS_DELAY_S;

/// Long approach spawn distance ahead of the nose gear, in tug wheelbases.
const TUG_APPCH_LONG_WB: f64 = 6.0;

/// Long approach spawn distance to the right of the centreline, in tug wheelbases.
const TUG_APPCH_LONG_SIDE_WB: f64 = 10.0;

/// Short approach spawn distance ahead of the approach point, in tug wheelbases.
const TUG_APPCH_SHORT_WB: f64 = 2.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Pushback manager
///
/// Owns everything about the current session, and the route and manual mode settings waiting for
/// the next one.
pub struct PushMgr {
    params: Params,

    ctrl: CtrlParams,

    catalog: TugCatalog,

    /// Route to push along in the next session
    route: SegQueue,

    /// Manual push settings, kept between sessions so manual mode can be selected before a start
    manual: ManualPush,

    /// The active session, if any
    sess: Option<Box<ActivePush>>,

    /// Telemetry of the last tick
    tm: PushTm,

    /// Sequence number of the last sync state written
    sync_seq: u64,
}

/// Session configuration chosen by the operator at start.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionCfg {
    /// Give the OK to disconnect automatically once the body is stopped
    pub disco_when_done: bool,

    /// Don't wait for the crew to set or release the parking brake
    pub ignore_park_brake: bool,

    /// Don't wait for the doors and ground equipment to be clear
    pub ignore_doors_check: bool,

    /// Start without a route, the push waits for one once the tug is connected
    pub late_plan: bool,

    /// The tug starts just in front of the body rather than driving up from the side
    pub tug_starts_next_plane: bool,

    /// Skip the tug's approach and disconnection, the tug starts connected
    pub quick_debug: bool,

    pub role: Role,

    /// Accept a start with the engines running
    pub allow_engines_running: bool,
}

/// Output of one tick.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TickOutput {
    pub status: TickStatus,

    /// Requests to apply to the body
    pub requests: HostRequests,

    /// Output of the force controller, if it ran this tick
    pub push: Option<PushOutput>,

    /// The tug to draw, while there is one
    pub tug: Option<TugRender>,

    /// Voice prompts to play
    pub announcements: Vec<Announcement>,

    /// Messages to show the operator
    pub messages: Vec<String>,

    /// Replicated session state, written by the master every tick
    pub sync: Option<SyncState>,
}

/// The state of a session once it has started.
struct ActivePush {
    cfg: SessionCfg,

    geom: AcfGeom,

    tug: Tug,

    push_ctrl: PushCtrl,

    drive_ctrl: DriveCtrl,

    st: SessState,
}

/// Mutable session state, reset with the session.
#[derive(Debug, Clone, Default)]
struct SessState {
    phase: Phase,

    /// Time the current phase was entered, or the dwell timer was last re-armed
    step_start_s: f64,

    last_t_s: f64,

    last_pose: Pose,

    /// Route waiting to be pushed along, moved into `segs` when connected
    plan: SegQueue,

    /// Route being pushed along
    segs: SegQueue,

    /// Nose gear steering commanded on the last tick
    nw_steer_deg: f64,

    nw_lift_m: f64,

    /// Time of the last change of direction
    reverse_s: Option<f64>,

    /// Direction of the last segment of the route
    last_seg_backward: bool,

    /// Heading to straighten to once stopped, when the route ends in a turn
    final_hdg: Option<f64>,

    /// Nose gear position when winching started
    winch_start_nw_m: Option<Vector2<f64>>,

    winch_complete: bool,

    winch_called: bool,

    reconnect: bool,

    ok_to_disconnect: bool,

    light_warning: bool,

    doors_warning: bool,

    /// The push is over, either the route is finished or it was stopped
    op_complete: bool,

    /// Started with a late plan and still waiting for the route
    awaiting_plan: bool,

    stop_requested: bool,

    /// Time the last announcement finishes playing
    voice_until_s: f64,

    /// Steering override was requested on the last tick
    override_active: bool,

    /// The tug clears to the right of the body
    clear_right: bool,

    /// Time a sync state was last received, slave only
    last_sync_s: f64,

    /// Where the tug was spawned, it returns there when done
    tug_start_axle_m: Vector2<f64>,
    tug_start_hdg_deg: f64,
}

/// Everything a phase handler works with on one tick.
struct StepCtx<'a> {
    params: &'a Params,
    cfg: &'a SessionCfg,
    geom: &'a AcfGeom,
    tug: &'a mut Tug,
    push_ctrl: &'a mut PushCtrl,
    drive_ctrl: &'a mut DriveCtrl,
    st: &'a mut SessState,
    manual: &'a mut ManualPush,
    inputs: &'a HostInputs,
    pose: Pose,
    delta: PoseDelta,
    d_t: f64,
    now_s: f64,
    out: &'a mut TickOutput,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Phases of a session, in the order they are run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Phase {
    Off,
    TugDispatched,
    ApproachStart,
    DrivingUpClose,
    WaitingForDoors,
    OpeningCradle,
    WaitingForParkBrake,
    DrivingUpConnect,
    Grabbing,
    Lifting,
    Connected,
    Starting,
    Pushing,
    Stopping,
    Stopped,
    Lowering,
    Ungrabbing,
    WaitingForDisconnectOk,
    MovingAway,
    ClosingCradle,
    StartingToClear,
    MovingToClear,
    ClearSignal,
    DrivingAway,
}

/// Which instance computes the push in a shared session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Computes the push and writes the sync state
    Master,

    /// Mirrors a remote master's session, computes no forces
    Slave,
}

/// What a phase handler wants done at the end of the tick.
#[derive(Debug, Clone, PartialEq)]
pub enum StepAction {
    /// The exit condition doesn't hold, stay and re-arm the dwell timer
    Hold,

    /// Stay, keeping the dwell timer
    Continue,

    /// The exit condition holds, advance once it has held for the dwell time
    AdvanceAfterDwell(Phase),

    /// Advance now
    Advance(Phase),

    /// The session is over
    Complete,

    /// The session can't continue
    Abort(String),
}

/// Status reported by a tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum TickStatus {
    /// No session is active
    Off,

    /// The tick came too soon after the last one and was ignored
    Skipped,

    Active(Phase),

    /// The session ended normally on this tick
    Complete,

    /// The session was aborted on this tick
    Aborted,
}

/// Errors which prevent a session starting or an operator request being accepted.
#[derive(Debug, thiserror::Error)]
pub enum PushMgrError {
    #[error("A pushback session is already active")]
    AlreadyActive,

    #[error("The aircraft has no landing gear")]
    NoGears,

    #[error("The landing gear is not down")]
    GearUp,

    #[error("The aircraft is not on the ground")]
    NotOnGround,

    #[error("The aircraft is moving ({0:.1} m/s)")]
    Moving(f64),

    #[error("The engines are running")]
    EnginesRunning,

    #[error("The nose gear can't be steered")]
    NoSteerLimits,

    #[error("The aircraft has no steerable nose gear")]
    NoSteerableGear,

    #[error("The aircraft has no main gear behind the nose gear")]
    NoMainGear,

    #[error("The aircraft has an invalid wheelbase ({0:.2} m)")]
    BadWheelbase(f64),

    #[error("No route has been planned")]
    NoRoute,

    #[error("No session state has been received from the master")]
    NoSync,

    #[error("No tug is able to push an aircraft with an MTOW of {0:.0} kg")]
    NoSuitableTug(f64),

    #[error("Invalid tug name: {0}")]
    InvalidTugName(String),

    #[error("Unknown tug {0}")]
    UnknownTug(String),

    #[error("Can't reconnect during {0}")]
    CannotReconnect(Phase),

    #[error("Tug maneuver planning failed: {0}")]
    PathError(PathError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PushMgr {
    pub fn new(params: Params, ctrl: CtrlParams, catalog: TugCatalog) -> Self {
        Self {
            params,
            ctrl,
            catalog,
            route: SegQueue::new(),
            manual: ManualPush::default(),
            sess: None,
            tm: PushTm::default(),
            sync_seq: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.sess.as_ref().map(|s| s.st.phase).unwrap_or(Phase::Off)
    }

    pub fn is_active(&self) -> bool {
        self.sess.is_some()
    }

    /// Telemetry of the last tick.
    pub fn get_tm(&self) -> &PushTm {
        &self.tm
    }

    pub fn manual_state(&self) -> &ManualPush {
        &self.manual
    }

    /// Set the route to push along.
    ///
    /// Before a session the route is kept for the next start. During a session it replaces the
    /// planned route up to the point the tug is connected, or while waiting to disconnect so the
    /// tug can be reconnected for another push.
    pub fn set_route(&mut self, route: SegQueue) {
        let sess = match self.sess.as_mut() {
            Some(s) => s,
            None => {
                self.route = route;
                return;
            }
        };

        let st = &mut sess.st;
        match st.phase {
            p if p < Phase::Connected || p == Phase::WaitingForDisconnectOk => {
                st.plan = route;
                st.awaiting_plan = false;
            }
            Phase::Connected => {
                st.segs = route;
                st.awaiting_plan = false;
            }
            p => warn!("Route change ignored during {}", p),
        }
    }

    /// Start a session.
    pub fn start(&mut self, inputs: &HostInputs, cfg: SessionCfg) -> Result<(), PushMgrError> {
        if self.sess.is_some() {
            return Err(PushMgrError::AlreadyActive);
        }

        // ---- PRECONDITIONS ----

        if inputs.gears.is_empty() {
            return Err(PushMgrError::NoGears);
        }
        if inputs.deployed_gears().next().is_none() {
            return Err(PushMgrError::GearUp);
        }
        if !inputs.on_ground() {
            return Err(PushMgrError::NotOnGround);
        }
        if inputs.spd_ms.abs() >= self.params.max_start_spd_ms {
            return Err(PushMgrError::Moving(inputs.spd_ms));
        }
        if inputs.engines.any_running && !cfg.allow_engines_running {
            return Err(PushMgrError::EnginesRunning);
        }
        if inputs.nw_steer_max_deg.iter().all(|s| *s <= 0.0) {
            return Err(PushMgrError::NoSteerLimits);
        }

        let geom = AcfGeom::from_inputs(inputs, &self.params.acf)?;

        let slave = cfg.role == Role::Slave;
        if self.route.is_empty() && !cfg.late_plan && !slave && !self.manual.active {
            return Err(PushMgrError::NoRoute);
        }

        // ---- TUG ----

        let info = match cfg.role {
            Role::Master => self.catalog.select_by_mtow(inputs.mtow_kg)?.clone(),
            Role::Slave => {
                let sync = inputs.sync.as_ref().ok_or(PushMgrError::NoSync)?;
                self.catalog.by_name(&sync.tug_name)?.clone()
            }
        };

        let pose = Pose::from_inputs(inputs);
        let dir = pose.dir();
        let nw = pose.fwd_point(geom.nw_fwd_m);
        let wb = info.veh.wheelbase_m;
        let fx = info.veh.fixed_axle_fwd_m;
        let conn_origin = nw - dir * info.nw_seat_fwd_m(geom.nw_tire_radius_m);

        let (axle, hdg) = if cfg.quick_debug {
            (conn_origin + dir * fx, pose.hdg_deg)
        } else if cfg.tug_starts_next_plane {
            let origin = conn_origin + dir * (info.apch_dist_m + TUG_APPCH_SHORT_WB * wb);
            (origin + dir * fx, pose.hdg_deg)
        } else {
            let axle = nw
                + dir * (TUG_APPCH_LONG_WB * wb)
                + right_normal(&dir) * (TUG_APPCH_LONG_SIDE_WB * wb);
            (axle, pose.hdg_deg - 90.0)
        };

        let mut tug = Tug::spawn(info, axle, hdg, self.ctrl.tug_drive.clone());
        tug.anim.cradle_closure = 1.0;
        tug.anim.hazard_lights = true;

        // ---- SESSION ----

        let plan = std::mem::take(&mut self.route);
        let st = SessState {
            phase: Phase::TugDispatched,
            step_start_s: inputs.time_s,
            last_t_s: inputs.time_s,
            last_pose: pose,
            awaiting_plan: cfg.late_plan && plan.is_empty(),
            plan,
            last_sync_s: inputs.time_s,
            tug_start_axle_m: tug.axle_pos(),
            tug_start_hdg_deg: tug.pose.hdg_deg,
            ..Default::default()
        };

        info!(
            "Pushback started with {} ({:?}), {} route segments",
            tug.info.name,
            cfg.role,
            st.plan.len()
        );
        info!("PushMgr phase change to: {}", st.phase);

        self.sess = Some(Box::new(ActivePush {
            cfg,
            geom,
            tug,
            push_ctrl: PushCtrl::new(self.ctrl.push.clone()),
            drive_ctrl: DriveCtrl::new(self.ctrl.drive.clone()),
            st,
        }));

        Ok(())
    }

    /// Ask for the push to stop. Before the body has started moving this cancels the session.
    pub fn stop(&mut self) {
        if let Some(s) = self.sess.as_mut() {
            info!("Stop requested during {}", s.st.phase);
            s.st.stop_requested = true;
        }
    }

    /// The ground crew may disconnect the tug once the push is done.
    pub fn set_ok_to_disconnect(&mut self) {
        if let Some(s) = self.sess.as_mut() {
            s.st.ok_to_disconnect = true;
        }
    }

    /// Reconnect the tug while it is waiting to disconnect, to push along a new route.
    pub fn reconnect(&mut self) -> Result<(), PushMgrError> {
        let sess = self.sess.as_mut().ok_or(PushMgrError::CannotReconnect(Phase::Off))?;
        let st = &mut sess.st;

        if st.phase != Phase::WaitingForDisconnectOk {
            return Err(PushMgrError::CannotReconnect(st.phase));
        }
        if st.plan.is_empty() && !self.manual.active {
            return Err(PushMgrError::NoRoute);
        }

        st.reconnect = true;
        st.op_complete = false;
        st.stop_requested = false;
        st.ok_to_disconnect = false;
        st.phase = Phase::Grabbing;
        st.step_start_s = st.last_t_s;
        info!("PushMgr phase change to: {} (reconnecting)", st.phase);

        Ok(())
    }

    /// Handle a manual push command.
    pub fn manual(&mut self, cmd: ManualCmd) {
        self.manual.apply(cmd);

        if let (ManualCmd::ToggleDirection, Some(s)) = (cmd, self.sess.as_mut()) {
            if s.st.phase == Phase::Pushing {
                s.st.reverse_s = Some(s.st.last_t_s);
            }
            s.st.last_seg_backward = !self.manual.forward;
        }
    }

    /// Run one tick of the session.
    pub fn tick(&mut self, inputs: &HostInputs) -> TickOutput {
        let mut out = TickOutput::default();

        let sess = match self.sess.as_mut() {
            Some(s) => s,
            None => {
                out.status = TickStatus::Off;
                return out;
            }
        };

        let d_t = inputs.time_s - sess.st.last_t_s;
        if d_t < MIN_STEP_TIME_S {
            out.status = TickStatus::Skipped;
            return out;
        }

        let pose = Pose::from_inputs(inputs);
        let delta = pose.delta_from(&sess.st.last_pose);

        let end = {
            let ActivePush {
                cfg,
                geom,
                tug,
                push_ctrl,
                drive_ctrl,
                st,
            } = &mut **sess;

            let mut ctx = StepCtx {
                params: &self.params,
                cfg,
                geom,
                tug,
                push_ctrl,
                drive_ctrl,
                st,
                manual: &mut self.manual,
                inputs,
                pose,
                delta,
                d_t,
                now_s: inputs.time_s,
                out: &mut out,
            };

            ctx.step()
        };

        if let Some(status) = end {
            self.teardown();
            return TickOutput {
                status,
                announcements: out.announcements,
                messages: out.messages,
                ..Default::default()
            };
        }

        if sess.cfg.role == Role::Master {
            self.sync_seq += 1;
            out.sync = Some(SyncState {
                remote_driven: true,
                op_complete: sess.st.op_complete,
                plan_complete: !sess.st.awaiting_plan,
                tug_name: sess.tug.info.name.clone(),
                seq: self.sync_seq,
            });
        }

        let push = out.push.unwrap_or_default();
        self.tm = PushTm {
            time_s: inputs.time_s,
            phase: sess.st.phase.to_string(),
            hint: sess.st.phase.hint().to_string(),
            pos_x_m: pose.pos_m.x,
            pos_y_m: pose.pos_m.y,
            hdg_deg: pose.hdg_deg,
            spd_ms: pose.spd_ms,
            tgt_spd_ms: push.tgt_spd_ms,
            force_n: push.force_n,
            nw_steer_deg: sess.st.nw_steer_deg,
            hdg_corr_deg: out.requests.hdg_corr_deg,
            tug_x_m: sess.tug.pose.pos_m.x,
            tug_y_m: sess.tug.pose.pos_m.y,
            tug_hdg_deg: sess.tug.pose.hdg_deg,
            tug_steer_deg: sess.tug.steer_deg,
            segs_left: sess.st.segs.len(),
            lift: sess.tug.anim.lift,
        };

        out
    }

    fn teardown(&mut self) {
        self.sess = None;
        self.manual = ManualPush::default();
        self.tm = PushTm {
            phase: Phase::Off.to_string(),
            hint: Phase::Off.hint().to_string(),
            ..Default::default()
        };
        info!("PushMgr phase change to: {}", Phase::Off);
    }
}

impl<'a> StepCtx<'a> {
    /// Run the tick. Returns the final status if the session ends.
    fn step(&mut self) -> Option<TickStatus> {
        let phase = self.st.phase;
        let master = self.cfg.role == Role::Master;

        // ---- TUG ----

        let slow = matches!(phase, Phase::DrivingUpConnect | Phase::MovingAway);
        self.tug.drive(self.d_t, slow);

        if self.tug.segs.is_empty() && phase >= Phase::Grabbing && phase <= Phase::Ungrabbing {
            let mode = if master {
                TugHdgMode::Follow
            } else {
                TugHdgMode::Slave
            };
            let winch_start = match phase {
                Phase::Grabbing if !self.st.winch_complete => self.st.winch_start_nw_m,
                _ => None,
            };
            self.tug_pos_update(mode, winch_start);
        }

        // ---- FATAL CHECKS ----

        if master && self.st.override_active && !self.inputs.steer_authority {
            return self.apply(StepAction::Abort(
                "another agent took the nose gear steering".into(),
            ));
        }

        // ---- STOP ----

        if self.inputs.sync.is_some() {
            self.st.last_sync_s = self.now_s;
        }

        if self.stop_signal() {
            if phase < Phase::Starting {
                self.message("Pushback cancelled".into());
                return Some(TickStatus::Complete);
            }
            if phase < Phase::Stopping {
                info!("Stopping the push");
                self.st.segs.clear();
                self.st.final_hdg = None;
                self.st.op_complete = true;
                self.st.stop_requested = false;
                self.manual.active = false;

                let next = if self.pose.spd_ms.abs() < SPEED_COMPLETE_THRESH_MS
                    && self.park_brake_set()
                {
                    Phase::Stopped
                } else {
                    Phase::Stopping
                };
                if let Some(end) = self.apply(StepAction::Advance(next)) {
                    return Some(end);
                }
            }
        }

        // ---- QUICK DEBUG ----

        let phase = self.st.phase;
        if self.cfg.quick_debug {
            if phase < Phase::Connected {
                self.tug.anim.cradle_closure = 1.0;
                self.tug.anim.lift = 1.0;
                self.st.nw_lift_m = self.tug.info.lift_height_m + self.tug.info.plat_h_m;
                self.st.winch_complete = true;
                if let Some(end) = self.apply(StepAction::Advance(Phase::Connected)) {
                    return Some(end);
                }
            } else if phase == Phase::Ungrabbing {
                return self.apply(StepAction::Complete);
            }
        }

        // ---- PHASE HANDLER ----

        let phase = self.st.phase;
        let action = match self.handler() {
            Ok(a) => a,
            Err(e) => {
                error!("PushMgr error during {}: {}", phase, e);
                StepAction::Abort(e.to_string())
            }
        };

        if let Some(end) = self.apply(action) {
            return Some(end);
        }

        // ---- OUTPUTS ----

        let phase = self.st.phase;
        let overriding =
            master && phase >= Phase::DrivingUpConnect && phase <= Phase::MovingAway;
        self.out.requests.override_steer = overriding;
        if overriding {
            self.out.requests.nw_steer_deg = Some(self.st.nw_steer_deg);
        }
        self.st.override_active = overriding;
        self.out.requests.nw_lift_m = self.st.nw_lift_m;
        self.out.tug = Some(self.tug.render());
        self.out.status = TickStatus::Active(phase);

        self.st.last_pose = self.pose;
        self.st.last_t_s = self.now_s;

        None
    }

    /// True if the push should stop.
    fn stop_signal(&self) -> bool {
        if self.st.stop_requested {
            return true;
        }

        match self.cfg.role {
            Role::Master => {
                !self.st.awaiting_plan
                    && !self.manual.active
                    && self.st.plan.is_empty()
                    && self.st.segs.is_empty()
            }
            Role::Slave => {
                let remote_done = self
                    .inputs
                    .sync
                    .as_ref()
                    .map(|s| s.op_complete)
                    .unwrap_or(false);
                let lost = self.now_s - self.st.last_sync_s > self.params.sync_timeout_s;
                if lost {
                    warn!("No session state received from the master, stopping");
                }
                remote_done || lost
            }
        }
    }

    fn handler(&mut self) -> Result<StepAction, PushMgrError> {
        match self.st.phase {
            Phase::Off => Ok(StepAction::Complete),
            Phase::TugDispatched => Ok(connect::tug_dispatched(self)),
            Phase::ApproachStart => connect::approach_start(self),
            Phase::DrivingUpClose => Ok(connect::driving_up_close(self)),
            Phase::WaitingForDoors => Ok(connect::waiting_for_doors(self)),
            Phase::OpeningCradle => Ok(connect::opening_cradle(self)),
            Phase::WaitingForParkBrake => Ok(connect::waiting_for_park_brake(self)),
            Phase::DrivingUpConnect => Ok(connect::driving_up_connect(self)),
            Phase::Grabbing => Ok(connect::grabbing(self)),
            Phase::Lifting => Ok(connect::lifting(self)),
            Phase::Connected => Ok(connect::connected(self)),
            Phase::Starting => Ok(push::starting(self)),
            Phase::Pushing => Ok(push::pushing(self)),
            Phase::Stopping => Ok(push::stopping(self)),
            Phase::Stopped => Ok(push::stopped(self)),
            Phase::Lowering => Ok(disconnect::lowering(self)),
            Phase::Ungrabbing => Ok(disconnect::ungrabbing(self)),
            Phase::WaitingForDisconnectOk => Ok(disconnect::waiting_for_disconnect_ok(self)),
            Phase::MovingAway => Ok(disconnect::moving_away(self)),
            Phase::ClosingCradle => Ok(disconnect::closing_cradle(self)),
            Phase::StartingToClear => disconnect::starting_to_clear(self),
            Phase::MovingToClear => Ok(disconnect::moving_to_clear(self)),
            Phase::ClearSignal => disconnect::clear_signal(self),
            Phase::DrivingAway => Ok(disconnect::driving_away(self)),
        }
    }

    /// Apply a handler's action. Returns the final status if the session ends.
    fn apply(&mut self, action: StepAction) -> Option<TickStatus> {
        let next = match action {
            StepAction::Hold => {
                self.st.step_start_s = self.now_s;
                return None;
            }
            StepAction::Continue => return None,
            StepAction::AdvanceAfterDwell(next) => {
                if self.elapsed_s() < STATE_TRANS_DELAY_S {
                    return None;
                }
                next
            }
            StepAction::Advance(next) => next,
            StepAction::Complete => {
                info!("Pushback complete");
                return Some(TickStatus::Complete);
            }
            StepAction::Abort(reason) => {
                error!("Pushback aborted during {}: {}", self.st.phase, reason);
                self.message(format!("Pushback aborted: {}", reason));
                return Some(TickStatus::Aborted);
            }
        };

        self.st.phase = next;
        self.st.step_start_s = self.now_s;
        info!("PushMgr phase change to: {}", next);

        self.on_enter(next);

        None
    }

    /// One-off actions made on entering a phase.
    fn on_enter(&mut self, phase: Phase) {
        match phase {
            Phase::WaitingForDoors => connect::enter_waiting_for_doors(self),
            Phase::DrivingUpConnect => connect::enter_driving_up_connect(self),
            Phase::Grabbing => connect::enter_grabbing(self),
            Phase::Connected => connect::enter_connected(self),
            Phase::Starting => push::enter_starting(self),
            Phase::Stopped => push::enter_stopped(self),
            Phase::Lowering => disconnect::enter_lowering(self),
            Phase::MovingAway => disconnect::enter_moving_away(self),
            _ => (),
        }
    }

    // ---- HELPERS ----

    fn body(&self) -> BodyState {
        BodyState {
            geom: self.geom,
            pose: &self.pose,
            delta: &self.delta,
            d_t: self.d_t,
            nw_steer_deg: self.st.nw_steer_deg,
        }
    }

    /// Seconds since the phase was entered or the dwell timer was re-armed.
    fn elapsed_s(&self) -> f64 {
        self.now_s - self.st.step_start_s
    }

    fn nw_pos(&self) -> Vector2<f64> {
        self.pose.fwd_point(self.geom.nw_fwd_m)
    }

    /// Position of the tug's origin when connected.
    fn conn_origin(&self) -> Vector2<f64> {
        self.nw_pos() - self.pose.dir() * self.tug.info.nw_seat_fwd_m(self.geom.nw_tire_radius_m)
    }

    fn is_winch(&self) -> bool {
        self.tug.info.lift_type == LiftType::Winch
    }

    /// Steer the tug so the nose gear moves towards `req_steer_deg`.
    fn turn_nosewheel(&mut self, req_steer_deg: f64) {
        let body = BodyState {
            geom: self.geom,
            pose: &self.pose,
            delta: &self.delta,
            d_t: self.d_t,
            nw_steer_deg: self.st.nw_steer_deg,
        };
        let turn =
            coupling::turn_nosewheel(req_steer_deg, self.tug, &body, &self.params.coupling);

        self.st.nw_steer_deg = turn.nw_steer_deg;
        self.out.requests.hdg_corr_deg = turn.hdg_corr_deg;
    }

    fn tug_pos_update(&mut self, mode: TugHdgMode, winch_start_nw_m: Option<Vector2<f64>>) {
        let body = BodyState {
            geom: self.geom,
            pose: &self.pose,
            delta: &self.delta,
            d_t: self.d_t,
            nw_steer_deg: self.st.nw_steer_deg,
        };
        coupling::tug_pos_update(self.tug, &body, mode, winch_start_nw_m);
    }

    /// Body pose as seen from the tug's fixed axle, given to the segment follower.
    fn corr_pos(&self) -> Pose {
        coupling::corr_acf_pos(&self.body(), self.tug)
    }

    /// Push the body at the normal acceleration, with engine sound.
    fn push(&mut self, tgt_spd_ms: f64, decelerating: bool) {
        let accel = self.geom.veh.max_accel_mss;
        self.push_at_speed(tgt_spd_ms, accel, true, decelerating);
    }

    /// Run the force controller and request its forces. Slaves compute no forces.
    fn push_at_speed(
        &mut self,
        tgt_spd_ms: f64,
        max_accel_mss: f64,
        sound: bool,
        decelerating: bool,
    ) {
        if self.cfg.role == Role::Slave {
            return;
        }

        let input = PushInput {
            tgt_spd_ms,
            max_accel_mss,
            sound,
            decelerating,
        };
        let env = PushEnv {
            d_t: self.d_t,
            spd_ms: self.pose.spd_ms,
            d_spd_ms: self.delta.spd_ms,
            d_hdg_deg: self.delta.hdg_deg,
            steer_deg: self.st.nw_steer_deg,
            mass_kg: self.inputs.mass_kg,
            friction: self.inputs.friction,
            nw_on_ground: self
                .inputs
                .gears
                .get(self.geom.nw_idx)
                .map(|g| g.on_ground)
                .unwrap_or(true),
            nw_fwd_m: self.geom.nw_fwd_m,
            nw_leg_len_m: self.geom.nw_leg_len_m,
            acf_wb_m: self.geom.wheelbase_m(),
            tug_mass_kg: self.tug.info.mass_kg,
            tug_max_te_n: self.tug.info.max_te_n,
            tug_max_fwd_spd_ms: self.tug.info.veh.max_fwd_spd_ms,
        };

        let push = self.push_ctrl.push_at_speed(&input, &env);

        self.out.requests.axial_force_n = push.axial_force_n;
        self.out.requests.yaw_moment_nm = push.yaw_moment_nm;
        self.out.requests.pitch_moment_nm = push.pitch_moment_nm;
        if let Some(snd) = push.engine_snd {
            self.tug.anim.engine_snd = snd;
        }
        self.out.push = Some(push);
    }

    /// Drop the push force, the body's brakes are holding it.
    fn zero_force(&mut self) {
        self.push_ctrl.zero_force();
        self.tug.anim.engine_snd = 0.0;
    }

    fn announce(&mut self, announcement: Announcement) {
        info!("Announcement: {:?}", announcement);
        self.st.voice_until_s = self.now_s + self.params.voice.duration_s(announcement);
        self.out.announcements.push(announcement);
    }

    /// True once the last announcement has finished, and `extra_s` more has passed.
    fn voice_idle(&self, extra_s: f64) -> bool {
        self.now_s >= self.st.voice_until_s + extra_s
    }

    fn message(&mut self, msg: String) {
        warn!("{}", msg);
        self.out.messages.push(msg);
    }

    fn set_brakes(&mut self, on: bool) {
        self.out.requests.brakes = Some(if on { BRAKES_SET } else { 0.0 });
    }

    fn park_brake_set(&self) -> bool {
        self.inputs.park_brake >= PARK_BRAKE_SET_THRESH
    }

    /// True if the crew is holding the body with either brake.
    fn brakes_applied(&self) -> bool {
        self.inputs.brake_pedal > BRAKE_PEDAL_THRESH || self.park_brake_set()
    }
}

impl Phase {
    /// Status line shown to the operator.
    pub fn hint(&self) -> &'static str {
        match self {
            Phase::Off => "Pushback off",
            Phase::TugDispatched => "Tug dispatched",
            Phase::ApproachStart | Phase::DrivingUpClose => "Tug driving up",
            Phase::WaitingForDoors => "Waiting for doors and ground equipment to be clear",
            Phase::OpeningCradle => "Tug preparing to connect",
            Phase::WaitingForParkBrake => "Waiting for the parking brake to be set",
            Phase::DrivingUpConnect => "Tug connecting",
            Phase::Grabbing => "Tug connecting",
            Phase::Lifting => "Tug lifting the nose gear",
            Phase::Connected => "Connected, release the parking brake to start",
            Phase::Starting => "Starting the push",
            Phase::Pushing => "Pushing",
            Phase::Stopping => "Stopping",
            Phase::Stopped => "Stopped, set the parking brake to disconnect",
            Phase::Lowering => "Tug lowering the nose gear",
            Phase::Ungrabbing => "Tug disconnecting",
            Phase::WaitingForDisconnectOk => "Waiting for the OK to disconnect",
            Phase::MovingAway => "Tug moving away",
            Phase::ClosingCradle => "Tug moving away",
            Phase::StartingToClear | Phase::MovingToClear => "Tug clearing",
            Phase::ClearSignal => "Ground crew showing the clear signal",
            Phase::DrivingAway => "Tug driving away",
        }
    }
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Off
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Master
    }
}

impl Default for TickStatus {
    fn default() -> Self {
        TickStatus::Off
    }
}

impl From<VehError> for PushMgrError {
    fn from(e: VehError) -> Self {
        match e {
            VehError::NoGears => PushMgrError::GearUp,
            VehError::NoSteerableGear => PushMgrError::NoSteerableGear,
            VehError::NoMainGear => PushMgrError::NoMainGear,
            VehError::BadWheelbase(wb) => PushMgrError::BadWheelbase(wb),
        }
    }
}

impl From<TugError> for PushMgrError {
    fn from(e: TugError) -> Self {
        match e {
            TugError::NoSuitableTug(mtow) => PushMgrError::NoSuitableTug(mtow),
            TugError::InvalidTugName(n) => PushMgrError::InvalidTugName(n),
            TugError::UnknownTug(n) => PushMgrError::UnknownTug(n),
        }
    }
}

impl From<PathError> for PushMgrError {
    fn from(e: PathError) -> Self {
        PushMgrError::PathError(e)
    }
}
