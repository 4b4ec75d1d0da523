// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the Chain type, a link-to-link chain of a robot description which uses the solvers
//! of the `k` crate.
use std::fmt;

use nalgebra::{DMatrix, DVector, Isometry3};
use urdf_rs::{Joint, Robot};

use crate::exception::{create_model_exception, LwrResult};
use crate::model::KinematicChain;

/// The joints between two links of a robot description.
///
/// `k` works in the frame of the description root, so the chain keeps the whole path from that
/// root to its tip link and re-expresses poses and Jacobians in the frame of its own root link.
/// Joints above the root link are held at zero.
#[derive(Default)]
pub struct Chain {
    path: Option<k::SerialChain<f64>>,
    /// Number of path nodes above the root link.
    start: usize,
    /// Number of movable joints above the root link.
    offset: usize,
    nr_of_joints: usize,
    nr_of_segments: usize,
}

fn joint_with_child<'a>(robot: &'a Robot, link: &str) -> Option<&'a Joint> {
    robot.joints.iter().find(|joint| joint.child.link == link)
}

fn joint_named<'a>(robot: &'a Robot, name: &str) -> Option<&'a Joint> {
    robot.joints.iter().find(|joint| joint.name == name)
}

impl Chain {
    /// Extracts the chain from `root_link` to `tip_link`.
    ///
    /// Returns None if one of the links does not exist or `root_link` is not an ancestor of
    /// `tip_link`. A chain from a link to itself has no joints.
    pub fn from_urdf(robot: &Robot, root_link: &str, tip_link: &str) -> Option<Chain> {
        if !robot.links.iter().any(|link| link.name == tip_link) {
            return None;
        }
        if root_link == tip_link {
            return Some(Chain::default());
        }
        let tip_joint = joint_with_child(robot, tip_link)?;
        let tree = k::Chain::<f64>::from(robot);
        let path = k::SerialChain::from_end(tree.find(&tip_joint.name)?);
        let nodes: Vec<(String, bool)> = path
            .iter()
            .map(|node| {
                let joint = node.joint();
                (joint.name.clone(), joint.is_movable())
            })
            .collect();

        let start = match joint_with_child(robot, root_link) {
            Some(root_joint) => nodes.iter().position(|(name, _)| *name == root_joint.name)? + 1,
            None => {
                // root of the description, the first joint of the path has to leave it
                let first = nodes
                    .iter()
                    .position(|(name, _)| joint_named(robot, name).is_some())?;
                if joint_named(robot, &nodes[first].0)?.parent.link != root_link {
                    return None;
                }
                first
            }
        };
        let movable = |nodes: &[(String, bool)]| nodes.iter().filter(|(_, m)| *m).count();
        Some(Chain {
            offset: movable(&nodes[..start]),
            nr_of_joints: movable(&nodes[start..]),
            nr_of_segments: nodes.len() - start,
            start,
            path: Some(path),
        })
    }

    /// Writes `q` to the joints below the root link and zeros to the ones above.
    fn set_joint_positions(&self, path: &k::SerialChain<f64>, q: &DVector<f64>) -> LwrResult<()> {
        if q.len() != self.nr_of_joints {
            return Err(create_model_exception(format!(
                "lwr: chain has {} joints but {} joint positions were given",
                self.nr_of_joints,
                q.len()
            )));
        }
        let mut positions = vec![0.; self.offset];
        positions.extend(q.iter());
        path.set_joint_positions_unchecked(&positions);
        Ok(())
    }

    /// Checks `q` of a chain without joints.
    fn set_empty(&self, q: &DVector<f64>) -> LwrResult<()> {
        if q.is_empty() {
            Ok(())
        } else {
            Err(create_model_exception(format!(
                "lwr: chain has no joints but {} joint positions were given",
                q.len()
            )))
        }
    }

    fn pose_of_nodes<'a, I: Iterator<Item = &'a k::Node<f64>>>(nodes: I) -> Isometry3<f64> {
        nodes.fold(Isometry3::identity(), |pose, node| {
            pose * node.joint().local_transform()
        })
    }
}

impl KinematicChain for Chain {
    fn nr_of_joints(&self) -> usize {
        self.nr_of_joints
    }

    fn nr_of_segments(&self) -> usize {
        self.nr_of_segments
    }

    /// # Errors
    /// * ModelException if `q` does not have one entry per joint.
    fn forward_kinematics(&self, q: &DVector<f64>) -> LwrResult<Isometry3<f64>> {
        let path = match &self.path {
            Some(path) => path,
            None => return self.set_empty(q).map(|_| Isometry3::identity()),
        };
        self.set_joint_positions(path, q)?;
        Ok(Chain::pose_of_nodes(path.iter().skip(self.start)))
    }

    /// Jacobian with the reference point at the chain tip, expressed in the frame of the root
    /// link. The first three rows are the linear part, the last three the angular part.
    ///
    /// # Errors
    /// * ModelException if `q` does not have one entry per joint.
    fn jacobian(&self, q: &DVector<f64>) -> LwrResult<DMatrix<f64>> {
        let path = match &self.path {
            Some(path) => path,
            None => return self.set_empty(q).map(|_| DMatrix::zeros(6, 0)),
        };
        self.set_joint_positions(path, q)?;
        let world = k::jacobian(path);
        let to_root = Chain::pose_of_nodes(path.iter().take(self.start))
            .rotation
            .inverse();
        let mut jacobian = DMatrix::zeros(6, self.nr_of_joints);
        for (column, world_column) in world.column_iter().skip(self.offset).enumerate() {
            let linear = to_root * world_column.fixed_rows::<3>(0).into_owned();
            let angular = to_root * world_column.fixed_rows::<3>(3).into_owned();
            jacobian.fixed_slice_mut::<3, 1>(0, column).copy_from(&linear);
            jacobian.fixed_slice_mut::<3, 1>(3, column).copy_from(&angular);
        }
        Ok(jacobian)
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Chain")
            .field("nr_of_joints", &self.nr_of_joints)
            .field("nr_of_segments", &self.nr_of_segments)
            .finish()
    }
}
