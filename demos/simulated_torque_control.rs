// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later
use std::cell::Cell;
use std::path::PathBuf;
use std::sync::mpsc::channel;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use lwr::{
    CommandScript, ControlLoop, DriverConfig, JointState, LwrException, LwrResult, RealtimeConfig,
    TestDriver, Torques,
};

/// An example which runs the test driver against a crude simulation of the LWR. Every joint is
/// modelled as a damped unit inertia. A command script configures the driver before the first
/// cycle, see demos/ramp_hand.toml.
#[derive(Parser, Debug)]
#[clap(author, version, name = "simulated_torque_control")]
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
    /// TOML file with the driver configuration
    #[clap(long)]
    pub config: Option<PathBuf>,
    /// TOML file with commands which are sent before the first cycle
    #[clap(long, default_value = "demos/ramp_hand.toml")]
    pub script: PathBuf,
    /// Number of control cycles
    #[clap(long, default_value_t = 2000)]
    pub cycles: u64,
    /// Cycle time in milliseconds
    #[clap(long, default_value_t = 1)]
    pub period_ms: u64,
    /// Raise the control thread to realtime priority
    #[clap(long, action)]
    pub realtime: bool,
}

const DAMPING: f64 = 2.;

fn main() -> LwrResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = CommandLineArguments::parse();

    let config = match &args.config {
        Some(path) => DriverConfig::from_file(path)?,
        None => DriverConfig::default(),
    };
    let mut driver = TestDriver::new(config)?;
    driver.load_model(&args.urdf, &args.lower_tip_link, &args.upper_root_link)?;
    driver.configure()?;
    driver.start()?;

    let script = std::fs::read_to_string(&args.script).map_err(|e| {
        LwrException::ConfigurationException {
            message: format!("cannot read {}: {}", args.script.display(), e),
        }
    })?;
    let (sender, receiver) = channel();
    for command in CommandScript::from_toml_str(&script)?.commands {
        sender.send(command).unwrap();
    }

    let period = Duration::from_millis(args.period_ms);
    let dt = period.as_secs_f64();
    let joint_state = Cell::new(JointState::default());
    let read = || Some(joint_state.get());
    let write = |torques: &Torques| {
        let mut state = joint_state.get();
        for i in 0..7 {
            state.velocities[i] += (torques.torques[i] - DAMPING * state.velocities[i]) * dt;
            state.angles[i] += state.velocities[i] * dt;
        }
        joint_state.set(state);
    };
    let realtime_config = match args.realtime {
        true => RealtimeConfig::Enforce,
        false => RealtimeConfig::Ignore,
    };
    let statistics = ControlLoop::new(&mut driver, read, write, period, realtime_config)?
        .with_commands(receiver)
        .with_max_cycles(args.cycles)
        .run()?;
    drop(sender);

    println!("{}", driver.diagnostics());
    println!("final joint angles: {:?}", joint_state.get().angles);
    println!("{:?}", statistics);
    driver.stop();
    driver.cleanup();
    Ok(())
}
