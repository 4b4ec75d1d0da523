// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! # lwr-testdriver-rs
//! lwr-testdriver-rs is a library to test the KUKA LWR in torque control. Every control cycle it
//! reads the joint angles and velocities of the seven joints and computes joint torques from
//! one of three modes:
//! * `none` - do nothing, the last torques stay in place.
//! * `position` - drive every joint to a target angle with constant torques.
//! * `torque` - apply a wrench at the hand and at the elbow of the robot, or let a PID
//!   controller damp the joints of the lower chain.
//!
//! **ALWAYS HAVE THE USER STOP BUTTON AT
//! HAND WHILE CONTROLLING THE ROBOT!**
//!
//! ## Design
//! The robot is split into two kinematic chains. The lower chain runs from the base to a chosen
//! elbow link, the upper chain from a chosen link to the last arm link. Wrenches at the chain
//! tips are mapped to joint torques with the transposed Jacobian of the chain.
//!
//! The library is divided into two main Modules:
//! * [model](`crate::model`) - contains the robot description parser and the kinematic chains.
//! * [robot](`crate::robot`) - contains the driver, its controllers and the control loop.
//!
//! # Example:
//!```no_run
//! use std::sync::mpsc::channel;
//! use std::time::Duration;
//! use lwr::{Command, ControlLoop, JointState, LwrResult, RealtimeConfig, TestDriver, Torques};
//! fn main() -> LwrResult<()> {
//!     let mut driver = TestDriver::new(None)?;
//!     driver.load_model("demos/lwr.urdf", "lwr_arm_4_link", "lwr_arm_4_link")?;
//!     driver.configure()?;
//!     driver.start()?;
//!
//!     let (commands, receiver) = channel();
//!     commands.send(Command::SetMode { mode: "torque".to_string() }).unwrap();
//!     commands.send(Command::RampHandForces { duration_secs: 2., x: 0., y: 0., z: 5. }).unwrap();
//!
//!     let read = || Some(JointState::default());
//!     let write = |torques: &Torques| println!("{}", torques);
//!     ControlLoop::new(&mut driver, read, write, Duration::from_millis(1), RealtimeConfig::Ignore)?
//!         .with_commands(receiver)
//!         .with_max_cycles(3000)
//!         .run()?;
//!     driver.stop();
//!     Ok(())
//! }
//!   ```
//!
//! The main function returns a LwrResult<()> which means that it returns either Ok(())
//! or an Error of type LwrException.
//!
//!```no_run
//! # use lwr::{LwrResult, TestDriver};
//! # fn main() -> LwrResult<()> {
//! let mut driver = TestDriver::new(None)?;
//! driver.load_model("demos/lwr.urdf", "lwr_arm_4_link", "lwr_arm_4_link")?;
//! # Ok(())
//! # }
//! ```
//! creates the driver with the default [`DriverConfig`] and loads the chains from a URDF file.
//! Here both chains are split at the fourth link, so the lower chain gets the first four joints
//! and the upper chain the remaining three.
//!
//! ```no_run
//! # use lwr::{LwrResult, TestDriver};
//! # fn main() -> LwrResult<()> {
//! # let mut driver = TestDriver::new(None)?;
//! driver.configure()?;
//! driver.start()?;
//! # Ok(())
//! # }
//! ```
//! Without a model the driver refuses to be configured. Starting zeroes the torques and the
//! history of the PID controller.
//!
//! Commands change the driver between the cycles. You can call the driver methods directly or
//! send [`Command`]s to the control loop. The ramp above increases the force along the z axis
//! of the hand frame from zero to 5 N within two seconds.
//!
//! The [`ControlLoop`] reads the joint state from a [`JointStateSource`], runs one cycle of the
//! driver and writes the torques to a [`TorqueSink`]. Closures implement both traits. The loop
//! stops after the given number of cycles or when every sender of the command channel is gone.
pub mod exception;
pub mod model;
pub mod robot;
pub mod utils;

pub use exception::{LwrException, LwrResult};
pub use model::{ChainEndpoints, KinematicChain, Model};
pub use robot::command::{Command, CommandScript};
pub use robot::config::DriverConfig;
pub use robot::control_loop::{ControlLoop, JointStateSource, LoopStatistics, TorqueSink};
pub use robot::control_types::*;
pub use robot::driver::{Diagnostics, DriverState, TestDriver};
pub use robot::pid::PidGains;
pub use utils::*;
