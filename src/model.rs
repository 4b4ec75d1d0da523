// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the kinematic model types.
//!
//! The LWR is split into two chains: the lower chain runs from the robot base to a chosen
//! "elbow" link, the upper chain from a chosen link up to the last arm link. The control core
//! only talks to the chains through the [`KinematicChain`] trait.
use std::fmt;
use std::path::Path;

use nalgebra::{DMatrix, DVector, Isometry3};
use tracing::{error, warn};
use urdf_rs::Robot;

use crate::exception::{create_model_exception, LwrException, LwrResult};
use crate::utils::NUMBER_OF_JOINTS;

pub mod chain;

pub use chain::Chain;

/// Root link of the lower chain of the LWR.
pub const DEFAULT_LOWER_ROOT_LINK: &str = "lwr_arm_base_link";
/// Tip link of the upper chain of the LWR.
pub const DEFAULT_UPPER_TIP_LINK: &str = "lwr_arm_7_link";

/// Forward kinematics and Jacobian of a serial chain.
#[cfg_attr(test, mockall::automock)]
pub trait KinematicChain {
    /// Number of joints which add a degree of freedom.
    fn nr_of_joints(&self) -> usize;
    /// Number of segments including rigidly attached ones.
    fn nr_of_segments(&self) -> usize;
    /// Pose of the chain tip in the chain base frame.
    fn forward_kinematics(&self, q: &DVector<f64>) -> LwrResult<Isometry3<f64>>;
    /// 6xN Jacobian of the chain tip. Rows 0..3 are linear, rows 3..6 angular.
    fn jacobian(&self, q: &DVector<f64>) -> LwrResult<DMatrix<f64>>;
}

/// Names of the four links which delimit the lower and upper chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainEndpoints {
    pub lower_root_link: String,
    pub lower_tip_link: String,
    pub upper_root_link: String,
    pub upper_tip_link: String,
}

impl ChainEndpoints {
    /// Endpoints with the default LWR base and tip links.
    pub fn new<S: Into<String>, T: Into<String>>(lower_tip_link: S, upper_root_link: T) -> Self {
        ChainEndpoints {
            lower_root_link: DEFAULT_LOWER_ROOT_LINK.to_string(),
            lower_tip_link: lower_tip_link.into(),
            upper_root_link: upper_root_link.into(),
            upper_tip_link: DEFAULT_UPPER_TIP_LINK.to_string(),
        }
    }
}

impl fmt::Display for ChainEndpoints {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "lower: {} -> {}, upper: {} -> {}",
            self.lower_root_link, self.lower_tip_link, self.upper_root_link, self.upper_tip_link
        )
    }
}

/// The lower and upper chain of the robot.
pub struct Model {
    lower: Box<dyn KinematicChain + Send>,
    upper: Box<dyn KinematicChain + Send>,
}

impl Model {
    /// Creates a model from two chains.
    ///
    /// # Errors
    /// * ModelException if the chains together have more than seven joints.
    pub fn new(
        lower: Box<dyn KinematicChain + Send>,
        upper: Box<dyn KinematicChain + Send>,
    ) -> LwrResult<Self> {
        let joints = lower.nr_of_joints() + upper.nr_of_joints();
        if joints > NUMBER_OF_JOINTS {
            return Err(create_model_exception(format!(
                "lwr: chains have {} joints but the robot only has {}",
                joints, NUMBER_OF_JOINTS
            )));
        }
        if joints < NUMBER_OF_JOINTS {
            warn!(
                "Chains only cover {} of {} joints, remaining joints get no torque",
                joints, NUMBER_OF_JOINTS
            );
        }
        Ok(Model { lower, upper })
    }

    /// Loads the model from a URDF file.
    ///
    /// # Errors
    /// * ModelException if the file cannot be read or parsed, or the lower chain cannot be
    ///   extracted. If only the upper chain cannot be extracted, the error is logged and the
    ///   upper chain stays empty.
    pub fn from_urdf_file<P: AsRef<Path>>(path: P, endpoints: &ChainEndpoints) -> LwrResult<Self> {
        let path = path.as_ref();
        let robot = urdf_rs::read_file(path).map_err(|e| {
            error!("Could not load model from URDF at {}", path.display());
            LwrException::from(e)
        })?;
        Model::from_urdf(&robot, endpoints)
    }

    /// Loads the model from a URDF document.
    ///
    /// # Errors
    /// * see [`from_urdf_file`](`Self::from_urdf_file`)
    pub fn from_urdf_str(xml: &str, endpoints: &ChainEndpoints) -> LwrResult<Self> {
        let robot = urdf_rs::read_from_string(xml).map_err(|e| {
            error!("Could not parse URDF document: {}", e);
            LwrException::from(e)
        })?;
        Model::from_urdf(&robot, endpoints)
    }

    fn from_urdf(robot: &Robot, endpoints: &ChainEndpoints) -> LwrResult<Self> {
        let lower = Chain::from_urdf(robot, &endpoints.lower_root_link, &endpoints.lower_tip_link)
            .ok_or_else(|| {
                error!("Could not get lower chain from tree");
                create_model_exception(format!(
                    "lwr: no chain from {} to {}",
                    endpoints.lower_root_link, endpoints.lower_tip_link
                ))
            })?;
        let upper = Chain::from_urdf(robot, &endpoints.upper_root_link, &endpoints.upper_tip_link)
            .unwrap_or_else(|| {
                error!("Could not get upper chain from tree");
                Chain::default()
            });
        Model::new(Box::new(lower), Box::new(upper))
    }

    pub fn lower(&self) -> &dyn KinematicChain {
        self.lower.as_ref()
    }

    pub fn upper(&self) -> &dyn KinematicChain {
        self.upper.as_ref()
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Model")
            .field("lower_joints", &self.lower.nr_of_joints())
            .field("upper_joints", &self.upper.nr_of_joints())
            .finish()
    }
}
