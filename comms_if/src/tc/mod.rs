//! # Telecommand module
//!
//! Commands the operator sends to the pushback core.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod push;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use structopt::StructOpt;
use thiserror::Error;

pub use push::{ManualCmd, PushCmd};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A command scheduled at a given simulation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimedCmd {
    pub time_s: f64,
    pub cmd: PushCmd,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum TcParseError {
    #[error("Line {0} is empty")]
    Empty(usize),

    #[error("Line {0} has an invalid time: {1}")]
    InvalidTime(usize, std::num::ParseFloatError),

    #[error("Line {0} is not a valid command: {1}")]
    InvalidCmd(usize, String),
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Parse a command script.
///
/// Each non-empty line which does not begin with `#` holds a simulation time followed by a
/// command as it would be typed on the command line, for example `12.5 manual steer 20`.
pub fn parse_script(script: &str) -> Result<Vec<TimedCmd>, TcParseError> {
    let mut cmds = Vec::new();

    for (i, line) in script.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut words = line.split_whitespace();

        let time_s = words
            .next()
            .ok_or(TcParseError::Empty(i + 1))?
            .parse::<f64>()
            .map_err(|e| TcParseError::InvalidTime(i + 1, e))?;

        // StructOpt expects the binary name as the first item
        let cmd = PushCmd::from_iter_safe(std::iter::once("push").chain(words))
            .map_err(|e| TcParseError::InvalidCmd(i + 1, e.message))?;

        cmds.push(TimedCmd { time_s, cmd });
    }

    cmds.sort_by(|a, b| a.time_s.partial_cmp(&b.time_s).unwrap_or(std::cmp::Ordering::Equal));

    Ok(cmds)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_script() {
        let script = "\
            # comment\n\
            40 stop\n\
            0.0 start\n\
            \n\
            12.5 manual steer 20\n\
        ";

        let cmds = parse_script(script).unwrap();
        assert_eq!(cmds.len(), 3);
        assert_eq!(cmds[0].time_s, 0.0);
        assert!(matches!(cmds[0].cmd, PushCmd::Start));
        assert!(matches!(
            cmds[1].cmd,
            PushCmd::Manual(ManualCmd::SteerStep { delta_pct }) if delta_pct == 20.0
        ));
        assert!(matches!(cmds[2].cmd, PushCmd::Stop));

        assert!(matches!(parse_script("abc stop"), Err(TcParseError::InvalidTime(1, _))));
        assert!(matches!(parse_script("1.0 fly"), Err(TcParseError::InvalidCmd(1, _))));
    }
}
