// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the data types exchanged with the driver every cycle.
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::exception::{LwrException, LwrResult};
use crate::utils::{Vector7, NUMBER_OF_JOINTS};

/// Control policy the driver applies in every cycle.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Do absolutely nothing, the last torques stay in place.
    #[default]
    None,
    /// Drive every joint to its target angle with constant positioning torques.
    Position,
    /// Apply the torques caused by the hand and elbow wrenches or computed by the PID controller.
    Torque,
}

impl FromStr for Mode {
    type Err = LwrException;

    fn from_str(mode: &str) -> LwrResult<Self> {
        match mode {
            "none" => Ok(Mode::None),
            "position" => Ok(Mode::Position),
            "torque" => Ok(Mode::Torque),
            _ => Err(LwrException::ConfigurationException {
                message: format!(
                    "lwr: unknown mode \"{}\". Available modes are position, torque and none",
                    mode
                ),
            }),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Mode::None => write!(f, "none"),
            Mode::Position => write!(f, "position"),
            Mode::Torque => write!(f, "torque"),
        }
    }
}

/// Used to decide whether to enforce realtime mode for a control loop thread.
/// see [`ControlLoop`](`crate::ControlLoop`)
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum RealtimeConfig {
    Enforce,
    Ignore,
}

/// Measured state of all joints, lower chain joints first.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Default, PartialEq)]
pub struct JointState {
    /// Measured joint angles in \[rad\].
    pub angles: [f64; NUMBER_OF_JOINTS],
    /// Measured joint velocities in \[rad/s\].
    pub velocities: [f64; NUMBER_OF_JOINTS],
}

impl JointState {
    pub fn new(angles: [f64; NUMBER_OF_JOINTS], velocities: [f64; NUMBER_OF_JOINTS]) -> Self {
        JointState { angles, velocities }
    }
}

/// Joint torque command of all joints, lower chain joints first.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Default, PartialEq)]
pub struct Torques {
    /// Desired torques in \[Nm\].
    pub torques: [f64; NUMBER_OF_JOINTS],
}

impl Torques {
    /// Creates a new Torques instance
    /// # Arguments
    /// * `torques` - Desired joint torques in \[Nm\].
    pub fn new(torques: [f64; NUMBER_OF_JOINTS]) -> Self {
        Torques { torques }
    }
}

impl From<Vector7> for Torques {
    fn from(vector: Vector7) -> Self {
        Torques::new(vector.into())
    }
}

impl From<Torques> for Vector7 {
    fn from(torques: Torques) -> Self {
        Vector7::from_row_slice(&torques.torques)
    }
}

impl fmt::Display for Torques {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[")?;
        let mut iter = self.torques.iter().peekable();
        while let Some(torque) = iter.next() {
            match iter.peek() {
                Some(_) => write!(f, "{}, ", torque)?,
                None => write!(f, "{}", torque)?,
            }
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use crate::exception::LwrException;
    use crate::robot::control_types::{Mode, Torques};
    use crate::utils::Vector7;

    #[test]
    fn parse_modes() {
        assert_eq!("none".parse::<Mode>().unwrap(), Mode::None);
        assert_eq!("position".parse::<Mode>().unwrap(), Mode::Position);
        assert_eq!("torque".parse::<Mode>().unwrap(), Mode::Torque);
        assert!(matches!(
            "banana".parse::<Mode>(),
            Err(LwrException::ConfigurationException { .. })
        ));
        assert!("Torque".parse::<Mode>().is_err());
        assert_eq!(Mode::Torque.to_string(), "torque");
        assert_eq!(Mode::default(), Mode::None);
    }

    #[test]
    fn torques_conversions() {
        let vector = Vector7::from_row_slice(&[1., 2., 3., 4., 5., 6., 7.]);
        let torques = Torques::from(vector);
        assert_eq!(torques.torques, [1., 2., 3., 4., 5., 6., 7.]);
        assert_eq!(Vector7::from(torques), vector);
        assert_eq!(torques.to_string(), "[1, 2, 3, 4, 5, 6, 7]");
    }
}
