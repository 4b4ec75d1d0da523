// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the commands which configure the test driver at runtime.
//!
//! Commands can be constructed directly or deserialized, e.g. from a TOML script:
//! ```toml
//! [[commands]]
//! command = "set_mode"
//! mode = "torque"
//!
//! [[commands]]
//! command = "ramp_hand_forces"
//! duration_secs = 2.0
//! x = 0.0
//! y = 0.0
//! z = 5.0
//! ```
use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::exception::{LwrException, LwrResult};
use crate::utils::NUMBER_OF_JOINTS;

/// An operation of the test driver. Use
/// [`TestDriver::execute`](`crate::TestDriver::execute`) to run it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Switches to "none", "position" or "torque".
    SetMode { mode: String },
    SetHandForces { x: f64, y: f64, z: f64 },
    SetElbowForces { x: f64, y: f64, z: f64 },
    SetHandTorques { x: f64, y: f64, z: f64 },
    SetElbowTorques { x: f64, y: f64, z: f64 },
    /// Ramps the hand forces to `x`, `y`, `z` within `duration_secs` seconds.
    RampHandForces {
        duration_secs: f64,
        x: f64,
        y: f64,
        z: f64,
    },
    /// Ramps the elbow forces to `x`, `y`, `z` within `duration_secs` seconds.
    RampElbowForces {
        duration_secs: f64,
        x: f64,
        y: f64,
        z: f64,
    },
    /// Logs the mean torques of the next `frames` cycles.
    AverageTau { frames: usize },
    LoadModel {
        path: PathBuf,
        lower_tip_link: String,
        upper_root_link: String,
    },
    /// Logs the diagnostics of the last cycle.
    Print,
    SetPositioningTorque { torque: f64 },
    SetEpsilon { epsilon: f64 },
    SetTargetAngles { angles: [f64; NUMBER_OF_JOINTS] },
    SetPidGains { k_p: f64, k_i: f64, k_d: f64 },
    EnablePid { enable: bool },
    EnableElbowToBase { enable: bool },
    ClampRamp { enable: bool },
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Command::SetMode { mode } => write!(f, "set_mode({})", mode),
            Command::SetHandForces { x, y, z } => write!(f, "set_hand_forces({}, {}, {})", x, y, z),
            Command::SetElbowForces { x, y, z } => {
                write!(f, "set_elbow_forces({}, {}, {})", x, y, z)
            }
            Command::SetHandTorques { x, y, z } => {
                write!(f, "set_hand_torques({}, {}, {})", x, y, z)
            }
            Command::SetElbowTorques { x, y, z } => {
                write!(f, "set_elbow_torques({}, {}, {})", x, y, z)
            }
            Command::RampHandForces {
                duration_secs,
                x,
                y,
                z,
            } => write!(
                f,
                "ramp_hand_forces({}s, {}, {}, {})",
                duration_secs, x, y, z
            ),
            Command::RampElbowForces {
                duration_secs,
                x,
                y,
                z,
            } => write!(
                f,
                "ramp_elbow_forces({}s, {}, {}, {})",
                duration_secs, x, y, z
            ),
            Command::AverageTau { frames } => write!(f, "average_tau({})", frames),
            Command::LoadModel {
                path,
                lower_tip_link,
                upper_root_link,
            } => write!(
                f,
                "load_model({}, {}, {})",
                path.display(),
                lower_tip_link,
                upper_root_link
            ),
            Command::Print => write!(f, "print"),
            Command::SetPositioningTorque { torque } => {
                write!(f, "set_positioning_torque({})", torque)
            }
            Command::SetEpsilon { epsilon } => write!(f, "set_epsilon({})", epsilon),
            Command::SetTargetAngles { angles } => write!(f, "set_target_angles({:?})", angles),
            Command::SetPidGains { k_p, k_i, k_d } => {
                write!(f, "set_pid_gains({}, {}, {})", k_p, k_i, k_d)
            }
            Command::EnablePid { enable } => write!(f, "enable_pid({})", enable),
            Command::EnableElbowToBase { enable } => write!(f, "enable_elbow_to_base({})", enable),
            Command::ClampRamp { enable } => write!(f, "clamp_ramp({})", enable),
        }
    }
}

/// A list of commands, the format of command scripts.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct CommandScript {
    #[serde(default)]
    pub commands: Vec<Command>,
}

impl CommandScript {
    /// Parses a TOML command script.
    /// # Errors
    /// * ConfigurationException if the document is malformed or names an unknown command.
    pub fn from_toml_str(toml: &str) -> LwrResult<Self> {
        toml::from_str(toml).map_err(|e| LwrException::ConfigurationException {
            message: format!("lwr: invalid command script: {}", e),
        })
    }
}
