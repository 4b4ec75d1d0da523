// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains functions for mapping a wrench at the tip of a chain to joint torques.
//!
//! By the principle of virtual work the joint torques which cause a wrench `w` at the chain tip
//! are `tau = J^T * w`. The Jacobian of a chain is expressed in the chain base frame. To command a
//! wrench given in the tip frame (hand or elbow frame) the Jacobian is first premultiplied with
//! the "hand to base" (HTB) matrix built from the inverse tip orientation.
use nalgebra::{DMatrix, DVector, Isometry3};

use crate::exception::LwrResult;
use crate::model::KinematicChain;
use crate::utils::{Matrix6, Wrench};

/// Intermediate results of a wrench mapping, kept for diagnostics.
#[derive(Debug, Clone)]
pub struct WrenchMapping {
    /// Inverse of the tip pose in the chain base frame.
    pub inverse_tip: Isometry3<f64>,
    /// Hand to base matrix built from `inverse_tip`.
    pub htb: Matrix6,
    /// Untransformed 6xN Jacobian of the chain.
    pub jacobian: DMatrix<f64>,
    /// Resulting joint torques.
    pub torques: DVector<f64>,
}

/// Builds the 6x6 block diagonal matrix which has the rotation of `inverse_tip` in its upper
/// left and lower right 3x3 block.
pub fn htb_matrix(inverse_tip: &Isometry3<f64>) -> Matrix6 {
    let rotation = inverse_tip.rotation.to_rotation_matrix();
    let mut htb = Matrix6::zeros();
    htb.fixed_slice_mut::<3, 3>(0, 0).copy_from(rotation.matrix());
    htb.fixed_slice_mut::<3, 3>(3, 3).copy_from(rotation.matrix());
    htb
}

/// Computes the HTB matrix of `chain` at the joint positions `q`.
pub fn frame_transform(chain: &dyn KinematicChain, q: &DVector<f64>) -> LwrResult<Matrix6> {
    Ok(htb_matrix(&chain.forward_kinematics(q)?.inverse()))
}

/// Maps `wrench` to joint torques of `chain` and returns all intermediate results.
///
/// # Arguments
/// * `chain` - Chain the wrench acts on.
/// * `q` - Joint positions of the chain.
/// * `wrench` - Force and torque at the chain tip.
/// * `apply_frame_transform` - if true, `wrench` is given in the tip frame and the HTB-transformed
/// Jacobian is used. Otherwise `wrench` is given in the chain base frame.
/// # Errors
/// * ModelException if `q` does not match the joints of `chain`.
pub fn map_wrench(
    chain: &dyn KinematicChain,
    q: &DVector<f64>,
    wrench: &Wrench,
    apply_frame_transform: bool,
) -> LwrResult<WrenchMapping> {
    let inverse_tip = chain.forward_kinematics(q)?.inverse();
    let htb = htb_matrix(&inverse_tip);
    let jacobian = chain.jacobian(q)?;
    let torques = if apply_frame_transform {
        let htb_dynamic = DMatrix::from_column_slice(6, 6, htb.as_slice());
        (htb_dynamic * &jacobian).transpose() * wrench
    } else {
        jacobian.transpose() * wrench
    };
    Ok(WrenchMapping {
        inverse_tip,
        htb,
        jacobian,
        torques,
    })
}

/// Maps `wrench` to joint torques of `chain`.
///
/// see [`map_wrench`]
pub fn map_wrench_to_torques(
    chain: &dyn KinematicChain,
    q: &DVector<f64>,
    wrench: &Wrench,
    apply_frame_transform: bool,
) -> LwrResult<DVector<f64>> {
    Ok(map_wrench(chain, q, wrench, apply_frame_transform)?.torques)
}
