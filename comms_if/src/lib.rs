//! # Communications interface crate.
//!
//! Provides the interfaces between the pushback core and the outside world: the host simulation,
//! the operator, and a remote peer in shared sessions.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Operator commands
pub mod tc;

/// Per-tick data exchanged with the host simulation
pub mod eqpt;

/// Replicated state shared between master and slave instances
pub mod net;
