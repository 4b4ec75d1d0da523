// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the runtime configuration of the test driver.
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

use crate::exception::{LwrException, LwrResult};
use crate::model::{DEFAULT_LOWER_ROOT_LINK, DEFAULT_UPPER_TIP_LINK};
use crate::robot::pid::PidGains;
use crate::utils::{degrees_to_radians, NUMBER_OF_JOINTS};

/// Default target angles of position mode in \[deg\].
pub static DEFAULT_TARGET_ANGLES_DEGREES: [f64; NUMBER_OF_JOINTS] =
    [70., 12., 90., -80., 0., 60., 0.];
/// Default positioning torque: 1 Nm
pub static DEFAULT_POSITIONING_TORQUE: f64 = 1.0;
/// Default tolerance of position mode: 0.005 rad
pub static DEFAULT_EPSILON: f64 = 0.005;

/// Every value of the driver which can be adjusted at runtime.
///
/// Missing keys in a TOML document fall back to their defaults:
/// ```
/// use lwr::DriverConfig;
/// let config = DriverConfig::from_toml_str("enable_pid = true\n[pid]\nk_d = 0.5").unwrap();
/// assert!(config.enable_pid);
/// assert_eq!(config.pid.k_d, 0.5);
/// assert_eq!(config.epsilon, 0.005);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DriverConfig {
    /// Magnitude of the torques used in position mode in \[Nm\].
    pub positioning_torque: f64,
    /// Tolerance around the target angles in \[rad\].
    pub epsilon: f64,
    /// Target angles of position mode in \[rad\].
    pub target_angles: [f64; NUMBER_OF_JOINTS],
    /// Use the PID controller instead of the elbow wrench for the lower chain.
    pub enable_pid: bool,
    /// Interpret the elbow wrench in the elbow frame instead of the base frame.
    pub enable_elbow_to_base: bool,
    /// Stop ramps at their target instead of extrapolating.
    pub clamp_ramp: bool,
    pub lower_root_link: String,
    pub upper_tip_link: String,
    pub pid: PidGains,
}

impl Default for DriverConfig {
    fn default() -> Self {
        let mut target_angles = [0.; NUMBER_OF_JOINTS];
        for (angle, degrees) in target_angles
            .iter_mut()
            .zip(DEFAULT_TARGET_ANGLES_DEGREES.iter())
        {
            *angle = degrees_to_radians(*degrees);
        }
        DriverConfig {
            positioning_torque: DEFAULT_POSITIONING_TORQUE,
            epsilon: DEFAULT_EPSILON,
            target_angles,
            enable_pid: false,
            enable_elbow_to_base: false,
            clamp_ramp: false,
            lower_root_link: DEFAULT_LOWER_ROOT_LINK.to_string(),
            upper_tip_link: DEFAULT_UPPER_TIP_LINK.to_string(),
            pid: PidGains::default(),
        }
    }
}

fn configuration_error(message: String) -> LwrException {
    LwrException::ConfigurationException { message }
}

/// Checks that `value` is finite and not negative.
pub(crate) fn check_magnitude(name: &str, value: f64) -> LwrResult<()> {
    if !value.is_finite() || value < 0. {
        return Err(configuration_error(format!(
            "lwr: {} has to be finite and not negative, got {}",
            name, value
        )));
    }
    Ok(())
}

/// Checks that every value is finite.
pub(crate) fn check_finite(name: &str, values: &[f64]) -> LwrResult<()> {
    if values.iter().any(|value| !value.is_finite()) {
        return Err(configuration_error(format!(
            "lwr: {} has to be finite, got {:?}",
            name, values
        )));
    }
    Ok(())
}

impl DriverConfig {
    /// Parses and validates a configuration from a TOML document.
    /// # Errors
    /// * ConfigurationException if the document is malformed or a value is invalid.
    pub fn from_toml_str(toml: &str) -> LwrResult<Self> {
        let config: DriverConfig = toml::from_str(toml)
            .map_err(|e| configuration_error(format!("lwr: invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    /// # Errors
    /// * ConfigurationException if the file cannot be read or
    /// [`from_toml_str`](`Self::from_toml_str`) fails.
    pub fn from_file<P: AsRef<Path>>(path: P) -> LwrResult<Self> {
        let path = path.as_ref();
        let toml = std::fs::read_to_string(path).map_err(|e| {
            configuration_error(format!("lwr: failed to read {}: {}", path.display(), e))
        })?;
        DriverConfig::from_toml_str(&toml)
    }

    /// Serializes the configuration to a TOML document.
    pub fn to_toml_string(&self) -> LwrResult<String> {
        toml::to_string(self)
            .map_err(|e| configuration_error(format!("lwr: cannot serialize configuration: {}", e)))
    }

    /// Rejects non-finite values and negative magnitudes or tolerances.
    pub fn validate(&self) -> LwrResult<()> {
        check_magnitude("positioning_torque", self.positioning_torque)?;
        check_magnitude("epsilon", self.epsilon)?;
        check_finite("target_angles", &self.target_angles)?;
        check_finite("pid gains", &[self.pid.k_p, self.pid.k_i, self.pid.k_d])?;
        if let Some(limit) = self.pid.integral_limit {
            check_magnitude("integral_limit", limit)?;
        }
        Ok(())
    }
}
