//! # Network Module
//!
//! State replicated between a master instance, which computes the push physics, and slave
//! instances which only mirror the session for display. The transport is provided by the host,
//! this module only defines the message and its JSON encoding.
//!
//! Replication is best effort and last-write-wins. The master writes a fresh copy every tick and
//! is the only writer of the completion flags. Readers must not assume that the fields of a copy
//! were updated together.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Maximum length of a tug name, including the extension.
pub const MAX_TUG_NAME_LEN: usize = 63;

/// Extension every tug name must carry.
pub const TUG_NAME_EXT: &str = ".tug";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The replicated session state.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SyncState {
    /// The session is being driven by a remote master
    pub remote_driven: bool,

    /// The master has finished the push (or cancelled it)
    pub op_complete: bool,

    /// The master has a complete route
    pub plan_complete: bool,

    /// Name of the tug the master selected
    pub tug_name: String,

    /// Incremented by the master on every write
    pub seq: u64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Could not serialize the sync state: {0}")]
    SerializationError(serde_json::Error),

    #[error("Could not deserialize the sync state: {0}")]
    DeserializeError(serde_json::Error),

    #[error("Invalid tug name \"{0}\": {1}")]
    InvalidTugName(String, &'static str),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SyncState {
    pub fn to_json(&self) -> Result<String, SyncError> {
        serde_json::to_string(self).map_err(SyncError::SerializationError)
    }

    pub fn from_json(json_str: &str) -> Result<Self, SyncError> {
        serde_json::from_str(json_str).map_err(SyncError::DeserializeError)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Check a tug name received from a remote peer.
pub fn validate_tug_name(name: &str) -> Result<&str, SyncError> {
    let invalid = |why| Err(SyncError::InvalidTugName(name.to_string(), why));

    if name.is_empty() {
        return invalid("empty name");
    }
    if name.len() > MAX_TUG_NAME_LEN {
        return invalid("name too long");
    }
    if name.contains('/') || name.contains('\\') {
        return invalid("name contains a path separator");
    }
    if name.len() <= TUG_NAME_EXT.len() || !name.ends_with(TUG_NAME_EXT) {
        return invalid("name must end in .tug");
    }

    Ok(name)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_validate_tug_name() {
        assert_eq!(validate_tug_name("GT110.tug").unwrap(), "GT110.tug");

        assert!(validate_tug_name("").is_err());
        assert!(validate_tug_name(".tug").is_err());
        assert!(validate_tug_name("GT110").is_err());
        assert!(validate_tug_name("../../GT110.tug").is_err());
        assert!(validate_tug_name("tugs\\GT110.tug").is_err());
        assert!(validate_tug_name(&format!("{}.tug", "a".repeat(60))).is_err());
    }

    #[test]
    fn test_sync_json() {
        let state = SyncState {
            remote_driven: true,
            op_complete: false,
            plan_complete: true,
            tug_name: "GT110.tug".into(),
            seq: 42,
        };

        let decoded = SyncState::from_json(&state.to_json().unwrap()).unwrap();
        assert_eq!(decoded, state);

        assert!(matches!(
            SyncState::from_json("{\"remote_driven\": 1}"),
            Err(SyncError::DeserializeError(_))
        ));
    }
}
