//! # Equipment Interface
//!
//! This module defines the structures exchanged every tick with the host simulation and the
//! external notifier.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

/// Towed body (aircraft) sensing and requests
pub mod acf;

/// Voice prompt events
pub mod notify;

/// Tug rendering state
pub mod tug;
