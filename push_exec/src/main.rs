//! Main pushback executable entry point.
//!
//! # Architecture
//!
//! The executable runs a pushback session closed-loop against the simulated host:
//!
//!     - Initialise the session, logging and parameters
//!     - Main loop:
//!         - Step the simulated host with the last tick's requests
//!         - Execute any scripted commands which are due
//!         - Tick the pushback manager
//!         - Report announcements and messages, archive telemetry
//!         - Play the flight crew, working the parking brake when asked
//!
//! Commands come from a script given with `--script`, one `<time_s> <command>` per line. Without
//! a script the session is started at time zero.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};
use nalgebra::Vector2;
use serde::Deserialize;
use std::{collections::VecDeque, fs::read_to_string, path::PathBuf};
use structopt::StructOpt;

// Internal
use comms_if::{
    eqpt::{
        acf::{EngineState, FrictionTier, GearState, HostInputs, HostRequests, LightState},
        notify::Announcement,
    },
    tc::{parse_script, PushCmd, TimedCmd},
};
use push_lib::{
    path::SegQueue,
    push_mgr::{CtrlParams, Params, Phase, PushMgr, SessionCfg, TickOutput, TickStatus},
    sim_host::SimHost,
    tug::TugCatalog,
};
use util::{
    archive::Archiver,
    host,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Simulated time between two ticks.
const CYCLE_PERIOD_S: f64 = 0.05;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "push_exec", about = "Run a pushback session against a simulated aircraft")]
struct Opts {
    /// Route to push along, a JSON list of segments.
    #[structopt(long, parse(from_os_str))]
    route: Option<PathBuf>,

    /// Command script to run.
    #[structopt(long, parse(from_os_str))]
    script: Option<PathBuf>,

    /// Start with the tug already connected.
    #[structopt(long)]
    quick_debug: bool,

    /// Disconnect automatically once the aircraft is stopped.
    #[structopt(long)]
    disco_when_done: bool,

    /// Give up after this much simulated time.
    #[structopt(long, default_value = "1800")]
    max_time_s: f64,

    /// Log the controllers' cyclic output.
    #[structopt(short, long)]
    verbose: bool,
}

/// Parameters of the executable itself.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExecParams {
    /// Session configuration used by `start` commands
    session: SessionCfg,

    body: BodyParams,
}

/// The simulated aircraft.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct BodyParams {
    nw_fwd_m: f64,
    main_fwd_m: f64,
    tire_radius_m: f64,
    leg_len_m: f64,
    nw_steer_max_deg: [f64; 2],
    mass_kg: f64,
    mtow_kg: f64,

    /// The parking brake is set when the simulation starts
    park_brake_set: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for BodyParams {
    fn default() -> Self {
        Self {
            nw_fwd_m: 15.0,
            main_fwd_m: -5.0,
            tire_radius_m: 0.5,
            leg_len_m: 1.5,
            nw_steer_max_deg: [70.0, 10.0],
            mass_kg: 70_000.0,
            mtow_kg: 78_000.0,
            park_brake_set: true,
        }
    }
}

impl BodyParams {
    /// Host inputs of the aircraft parked at the origin facing north.
    fn to_inputs(&self) -> HostInputs {
        let gear = |fwd_m, steerable| GearState {
            fwd_m,
            steerable,
            on_ground: true,
            deployed: true,
            leg_len_m: self.leg_len_m,
            tire_radius_m: self.tire_radius_m,
        };

        HostInputs {
            time_s: 0.0,
            pos_m: Vector2::zeros(),
            hdg_deg: 0.0,
            spd_ms: 0.0,
            gears: vec![
                gear(self.nw_fwd_m, true),
                gear(self.main_fwd_m, false),
                gear(self.main_fwd_m, false),
            ],
            nw_steer_max_deg: self.nw_steer_max_deg,
            mass_kg: self.mass_kg,
            mtow_kg: self.mtow_kg,
            brake_pedal: 0.0,
            park_brake: if self.park_brake_set { 1.0 } else { 0.0 },
            engines: EngineState {
                count: 2,
                any_running: false,
            },
            friction: FrictionTier::Good,
            lights: LightState::default(),
            steer_authority: true,
            doors_clear: true,
            yoke: None,
            sync: None,
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    let session = Session::new("push_exec", "sessions").wrap_err("Failed to create the session")?;

    let ctrl_level = if opts.verbose {
        LevelFilter::Trace
    } else {
        LevelFilter::Info
    };
    logger_init(LevelFilter::Trace, ctrl_level, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Pushback Executable\n");
    info!(
        "Software root: {:?}",
        host::get_sw_root().wrap_err("Failed to get the software root")?
    );
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let mut exec_params: ExecParams =
        util::params::load("push_exec.toml").wrap_err("Could not load exec params")?;
    let params: Params =
        util::params::load("push_mgr.toml").wrap_err("Could not load PushMgr params")?;
    let ctrl: CtrlParams =
        util::params::load("ctrl.toml").wrap_err("Could not load controller params")?;
    let catalog: TugCatalog =
        util::params::load("tugs.toml").wrap_err("Could not load the tug catalog")?;

    exec_params.session.quick_debug |= opts.quick_debug;
    exec_params.session.disco_when_done |= opts.disco_when_done;

    info!("Parameters loaded, {} tugs available", catalog.tugs.len());
    debug!("Session configuration: {:#?}", exec_params.session);

    // ---- COMMANDS ----

    let mut cmds: VecDeque<TimedCmd> = match opts.script {
        Some(ref path) => {
            info!("Loading script from {:?}", path);
            let script = read_to_string(path).wrap_err("Failed to read the script")?;
            parse_script(&script)
                .wrap_err("Failed to parse the script")?
                .into()
        }
        None => vec![TimedCmd {
            time_s: 0.0,
            cmd: PushCmd::Start,
        }]
        .into(),
    };
    info!("{} commands scheduled", cmds.len());

    // ---- INITIALISE MODULES ----

    let mut mgr = PushMgr::new(params, ctrl, catalog);

    if let Some(ref path) = opts.route {
        let route = SegQueue::load_json(path).wrap_err("Failed to load the route")?;
        info!("Loaded a route of {} segments from {:?}", route.len(), path);
        mgr.set_route(route);
    }

    let mut sim = SimHost::new(exec_params.body.to_inputs());

    let mut archiver =
        Archiver::from_path(&session, "push_tm.csv").wrap_err("Failed to create the archive")?;

    info!("Initialisation complete, beginning main loop\n");

    // ---- MAIN LOOP ----

    let mut req = HostRequests::default();

    let status = loop {
        sim.step(&req, CYCLE_PERIOD_S);
        let time_s = sim.inputs.time_s;

        while cmds.front().map(|c| c.time_s <= time_s).unwrap_or(false) {
            if let Some(c) = cmds.pop_front() {
                exec_cmd(&mut mgr, &sim.inputs, &exec_params.session, c.cmd);
            }
        }

        let out = mgr.tick(&sim.inputs);

        for a in out.announcements.iter() {
            info!("Voice: {:?}", a);
        }
        for m in out.messages.iter() {
            info!("Message: {}", m);
        }

        crew_response(&mut sim.inputs, &out);

        if let TickStatus::Active(_) = out.status {
            archiver
                .serialise(mgr.get_tm())
                .wrap_err("Failed to archive telemetry")?;
        }

        match out.status {
            TickStatus::Complete | TickStatus::Aborted => break out.status,
            TickStatus::Off if cmds.is_empty() => {
                warn!("No session is active and no commands are left");
                break out.status;
            }
            _ => (),
        }

        if time_s > opts.max_time_s {
            warn!("Simulated time limit of {:.0} s reached", opts.max_time_s);
            break out.status;
        }

        req = out.requests;
    };

    // ---- SHUTDOWN ----

    archiver.flush().wrap_err("Failed to flush the archive")?;
    session
        .save_json("final_inputs.json", &sim.inputs)
        .wrap_err("Failed to save the final aircraft state")?;

    info!(
        "Finished at {:.2} s, aircraft at ({:.2}, {:.2}) heading {:.1}",
        sim.inputs.time_s, sim.inputs.pos_m.x, sim.inputs.pos_m.y, sim.inputs.hdg_deg
    );

    match status {
        TickStatus::Aborted => Err(eyre!("The pushback was aborted")),
        _ => Ok(()),
    }
}

/// Execute an operator command. Rejected commands are logged, they don't end the run.
fn exec_cmd(mgr: &mut PushMgr, inputs: &HostInputs, cfg: &SessionCfg, cmd: PushCmd) {
    info!("Executing command {:?}", cmd);

    let res = match cmd {
        PushCmd::Start => mgr.start(inputs, cfg.clone()),
        PushCmd::Stop => {
            mgr.stop();
            Ok(())
        }
        PushCmd::Disconnect => {
            mgr.set_ok_to_disconnect();
            Ok(())
        }
        PushCmd::Reconnect => mgr.reconnect(),
        PushCmd::Manual(m) => {
            mgr.manual(m);
            Ok(())
        }
    };

    if let Err(e) = res {
        warn!("Command rejected: {}", e);
    }
}

/// Set the parking brake when the tug asks for it, and release it once the tug is ready to push
/// or winch.
fn crew_response(inputs: &mut HostInputs, out: &TickOutput) {
    for a in out.announcements.iter() {
        match a {
            Announcement::ReadyToConnect {
                park_brake_set: false,
            } => inputs.park_brake = 1.0,
            Announcement::Winch => inputs.park_brake = 0.0,
            _ => (),
        }
    }

    if out.status == TickStatus::Active(Phase::Connected) && inputs.park_brake > 0.0 {
        debug!("Crew releasing the parking brake");
        inputs.park_brake = 0.0;
    }
}
