// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains exception and Result definitions
use thiserror::Error;
use urdf_rs::UrdfError;

/// Represents all kind of errors the test driver can report. Every fallible operation of the
/// driver returns one of these instead of a plain success flag.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LwrException {
    /// ConfigurationException is returned if a command or configuration value is rejected,
    /// e.g. an unknown mode name. The driver state is left untouched.
    #[error("{message}")]
    ConfigurationException { message: String },

    /// ModelException is returned if the robot description cannot be read or parsed, or if one
    /// of the kinematic chains cannot be extracted from it.
    #[error("{message}")]
    ModelException { message: String },

    /// NoDataException is returned if no joint state was available in the current cycle. The
    /// last torque output stays in place.
    #[error("{message}")]
    NoDataException { message: String },

    /// NotConfiguredException is returned if the driver is configured without a model or a
    /// cycle is run before the driver was started.
    #[error("{message}")]
    NotConfiguredException { message: String },

    /// RealTimeException is returned if the real-time priority cannot be set
    #[error("{message}")]
    RealTimeException { message: String },
}

/// creates a ConfigurationException from a static string slice
pub(crate) fn create_configuration_exception(message: &'static str) -> LwrException {
    LwrException::ConfigurationException {
        message: message.to_string(),
    }
}

/// creates a ModelException from anything that can be displayed
pub(crate) fn create_model_exception<M: std::fmt::Display>(message: M) -> LwrException {
    LwrException::ModelException {
        message: message.to_string(),
    }
}

impl From<UrdfError> for LwrException {
    fn from(error: UrdfError) -> Self {
        create_model_exception(format!("lwr: invalid robot description: {}", error))
    }
}

/// Result type which can have LwrException as Error
pub type LwrResult<T> = Result<T, LwrException>;
