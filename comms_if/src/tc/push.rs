//! # Pushback Telecommands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use structopt::StructOpt;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A command the operator can send to the pushback core.
#[derive(Debug, Clone, Serialize, Deserialize, StructOpt)]
pub enum PushCmd {
    /// Start a pushback session with the current route.
    #[structopt(name = "start")]
    Start,

    /// Stop the pushback. Before the body is moving this cancels the session.
    #[structopt(name = "stop")]
    Stop,

    /// Give the ground crew the OK to disconnect the tug.
    #[structopt(name = "disco")]
    Disconnect,

    /// Cancel a pending disconnection and reconnect the tug.
    #[structopt(name = "reconnect")]
    Reconnect,

    /// Manual push commands.
    #[structopt(name = "manual")]
    Manual(ManualCmd),
}

/// Manual push mode commands.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, StructOpt)]
pub enum ManualCmd {
    /// Take direct control of the push.
    #[structopt(name = "on")]
    Activate {
        /// Steer and throttle with the yoke instead of the keyboard.
        #[structopt(long)]
        yoke: bool,
    },

    /// End direct control, the tug stops the body.
    #[structopt(name = "off")]
    Deactivate,

    /// Change the keyboard steering angle by a percentage of the maximum.
    #[structopt(name = "steer")]
    SteerStep {
        #[structopt(allow_hyphen_values = true)]
        delta_pct: f64,
    },

    /// Pause or resume motion.
    #[structopt(name = "pause")]
    TogglePause,

    /// Swap between pushing backwards and towing forwards.
    #[structopt(name = "direction")]
    ToggleDirection,
}
