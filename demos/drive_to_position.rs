// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lwr::{JointState, LwrResult, TestDriver, NUMBER_OF_JOINTS};

/// An example which drives a simulated LWR to the target angles of position mode. It calls
/// the driver directly instead of using a ControlLoop and stops as soon as all joints are in
/// position.
#[derive(Parser, Debug)]
#[clap(author, version, name = "drive_to_position")]
struct CommandLineArguments {
    /// Path to the URDF of the robot
    #[clap(long, default_value = "demos/lwr.urdf")]
    pub urdf: PathBuf,
    /// Magnitude of the positioning torques in Nm
    #[clap(long, default_value_t = 1.0)]
    pub torque: f64,
    /// Tolerance around the target angles in rad
    #[clap(long, default_value_t = 0.005)]
    pub epsilon: f64,
    /// Maximal simulated time in seconds
    #[clap(long, default_value_t = 30.)]
    pub timeout: f64,
}

const DAMPING: f64 = 5.;
const PERIOD: Duration = Duration::from_millis(1);

fn main() -> LwrResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = CommandLineArguments::parse();

    let mut driver = TestDriver::new(None)?;
    driver.load_model(&args.urdf, "lwr_arm_4_link", "lwr_arm_4_link")?;
    driver.set_positioning_torque(args.torque)?;
    driver.set_epsilon(args.epsilon)?;
    driver.configure()?;
    driver.start()?;
    driver.set_mode("position")?;

    let wall_clock = Instant::now();
    let dt = PERIOD.as_secs_f64();
    let mut state = JointState::default();
    let mut time = Duration::from_secs(0);
    while time.as_secs_f64() < args.timeout {
        let torques = driver.update(Some(&state), time)?;
        if driver.in_position() == NUMBER_OF_JOINTS {
            info!("All joints in position after {:.3} s", time.as_secs_f64());
            break;
        }
        // without friction the bang-bang torques would never settle
        for i in 0..NUMBER_OF_JOINTS {
            state.velocities[i] += (torques.torques[i] - DAMPING * state.velocities[i]) * dt;
            state.angles[i] += state.velocities[i] * dt;
        }
        time += PERIOD;
    }
    println!("target angles: {:?}", driver.config().target_angles);
    println!("joint angles:  {:?}", state.angles);
    println!(
        "{} of {} joints in position, simulated {:?} in {:?}",
        driver.in_position(),
        NUMBER_OF_JOINTS,
        time,
        wall_clock.elapsed()
    );
    driver.stop();
    Ok(())
}
