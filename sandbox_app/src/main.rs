//! Collision sandbox
//!
//! Loads a scenario file (or the built-in arena), runs it on a manual clock
//! and logs what happened.
//!
//! ```text
//! collision_sandbox [scenario.toml|scenario.ron] [--frames N]
//! ```

mod sandbox;
mod scenario;

use std::path::PathBuf;

use clap::{value_parser, Arg, ArgMatches, Command};
use collider_engine::core::config::Config;
use collider_engine::foundation::logging;
use log::info;

use sandbox::{Sandbox, SandboxError};
use scenario::Scenario;

#[derive(Debug)]
struct Args {
    scenario: Option<PathBuf>,
    frames: Option<u32>,
}

impl Args {
    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            scenario: matches.get_one::<PathBuf>("scenario").cloned(),
            frames: matches.get_one::<u32>("frames").copied(),
        }
    }
}

fn command() -> Command {
    Command::new("collision_sandbox")
        .about("Runs a collider scenario on a manual clock and logs what happened")
        .arg(
            Arg::new("scenario")
                .value_name("FILE")
                .help("Scenario file (.toml or .ron); the built-in arena when omitted")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("frames")
                .long("frames")
                .value_name("N")
                .help("Number of frames to run, overriding the scenario")
                .value_parser(value_parser!(u32)),
        )
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::from_matches(&command().get_matches());

    let scenario = match &args.scenario {
        Some(path) => Scenario::load_from_file(path).map_err(SandboxError::from)?,
        None => Scenario::arena(),
    };

    logging::init_with_level(&scenario.simulation.engine.log_level);
    match &args.scenario {
        Some(path) => info!("Running scenario {}", path.display()),
        None => info!("Running built-in arena"),
    }

    let frames = args.frames.unwrap_or(scenario.frames);
    let sandbox = Sandbox::new(&scenario)?;
    let summary = sandbox.run(frames)?;

    info!(
        "{} frames, {} collisions, {} disposed, {} colliders left",
        summary.frames, summary.collisions, summary.disposed, summary.tracked
    );
    Ok(())
}
