// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later
use std::path::PathBuf;

use clap::Parser;
use nalgebra::DVector;

use lwr::robot::torque_mapper::{frame_transform, map_wrench_to_torques};
use lwr::{ChainEndpoints, KinematicChain, LwrResult, Model, Wrench};

/// An example which loads the lower and upper chain of the LWR and prints their tip poses,
/// Jacobians and the torques caused by a wrench at the chain tips.
#[derive(Parser, Debug)]
#[clap(author, version, name = "print_chain_jacobians")]
struct CommandLineArguments {
    /// Path to the URDF of the robot
    #[clap(long, default_value = "demos/lwr.urdf")]
    pub urdf: PathBuf,
    /// Tip link of the lower chain
    #[clap(long, default_value = "lwr_arm_4_link")]
    pub lower_tip_link: String,
    /// Root link of the upper chain
    #[clap(long, default_value = "lwr_arm_4_link")]
    pub upper_root_link: String,
    /// Joint angles in rad
    #[clap(long, num_args = 7, default_values_t = [0.3, 0.2, 0., -1.2, 0., 0.8, 0.])]
    pub angles: Vec<f64>,
    /// Wrench (fx fy fz tx ty tz) at both chain tips, given in the tip frames
    #[clap(long, num_args = 6, default_values_t = [0., 0., 5., 0., 0., 0.])]
    pub wrench: Vec<f64>,
}

fn print_chain(
    name: &str,
    chain: &dyn KinematicChain,
    q: &DVector<f64>,
    wrench: &Wrench,
) -> LwrResult<()> {
    println!("--------- {} chain --------------", name);
    println!(
        "{} joints, {} segments",
        chain.nr_of_joints(),
        chain.nr_of_segments()
    );
    println!("tip pose: {}", chain.forward_kinematics(q)?);
    println!("Jacobian:{}", chain.jacobian(q)?);
    println!("HTB:{}", frame_transform(chain, q)?);
    println!(
        "torques (tip frame): {}",
        map_wrench_to_torques(chain, q, wrench, true)?.transpose()
    );
    println!(
        "torques (base frame): {}",
        map_wrench_to_torques(chain, q, wrench, false)?.transpose()
    );
    Ok(())
}

fn main() -> LwrResult<()> {
    let args = CommandLineArguments::parse();
    let model = Model::from_urdf_file(
        &args.urdf,
        &ChainEndpoints::new(args.lower_tip_link.as_str(), args.upper_root_link.as_str()),
    )?;
    let wrench = Wrench::from_row_slice(&args.wrench);
    let lower_joints = model.lower().nr_of_joints();
    let upper_joints = model.upper().nr_of_joints();
    let q_lower = DVector::from_row_slice(&args.angles[..lower_joints]);
    let q_upper = DVector::from_row_slice(&args.angles[args.angles.len() - upper_joints..]);
    print_chain("lower", model.lower(), &q_lower, &wrench)?;
    print_chain("upper", model.upper(), &q_upper, &wrench)
}
