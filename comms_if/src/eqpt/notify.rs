//! # Notifier Interface
//!
//! Events the core raises so an external notifier can play the matching voice prompt.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A voice prompt raised on a phase transition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Announcement {
    /// The tug is on its way to the body
    DrivingUp,

    /// The tug is ready to connect, `park_brake_set` selects the variant which does not ask the
    /// crew to set the parking brake
    ReadyToConnect { park_brake_set: bool },

    /// Winch tugs only, the crew should release the parking brake to be winched onto the tug
    Winch,

    Connected,

    /// The push has started, `backward` is false when the body is being towed forwards
    PushStarted { backward: bool },

    OpComplete,

    Disconnecting,

    /// Ground crew has cleared to the right (`DoneRight`) or left (`DoneLeft`) of the body
    DoneRight,
    DoneLeft,
}
