//! # Pushback library.
//!
//! This library allows other crates in the workspace, and the benches, to access items defined
//! inside the pushback crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Tug-body coupling - steers the nose gear through the tug and keeps the tug on the nose gear
pub mod coupling;

/// Drive control module - follows a segment queue by commanding steering and speed
pub mod drive_ctrl;

/// Localisation module - poses of the body and the tug
pub mod loc;

/// Path module - segments and queues of segments, and short maneuver planning
pub mod path;

/// Push control module - converts a target speed into a push force
pub mod push_ctrl;

/// Pushback manager - runs a session from tug dispatch to drive away
pub mod push_mgr;

/// Simulated host - a simple closed-loop stand-in for the host
pub mod sim_host;

/// Tug module - tug catalog and runtime state
pub mod tug;

/// Vehicle module - kinematic profiles and body geometry
pub mod veh;
