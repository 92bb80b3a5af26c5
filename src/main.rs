//! Log Roller headless runner
//!
//! Drives the gameplay scene frame by frame against a physics backend, with
//! input from the autopilot or a fixed key, and logs how each run ends.
//! Rendering and real keyboard input belong to the host engine.
//!
//! ```sh
//! RUST_LOG=info cargo run -- --variant parallax --runs 3
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, ValueEnum};

use log_roller::physics::{KinematicWorld, PhysicsBackend, RapierWorld};
use log_roller::scene::names;
use log_roller::sim::{Autopilot, FrameInput};
use log_roller::{GameScene, SceneDirector, SceneError, Tuning, TuningError, Variant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// Rapier2D rigid bodies with contacts
    Rapier,
    /// Collision-free integration
    Kinematic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Pilot {
    /// Counter-steer automatically
    Auto,
    /// Press nothing
    Idle,
    /// Hold the left key
    Left,
    /// Hold the right key
    Right,
}

/// Run the log-rolling scene without a window
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Scene variant preset (original, balance, stacked, parallax)
    #[arg(long, default_value_t = Variant::Stacked)]
    variant: Variant,

    /// JSON tuning file; replaces the variant preset
    #[arg(long, value_name = "PATH")]
    tuning: Option<PathBuf>,

    /// Seed for the scene RNG (defaults to the clock)
    #[arg(long)]
    seed: Option<u64>,

    /// Frames to simulate per run before giving up
    #[arg(long, default_value_t = 3600)]
    frames: u32,

    /// Number of scene entries to play
    #[arg(long, default_value_t = 1)]
    runs: u32,

    #[arg(long, value_enum, default_value_t = Backend::Rapier)]
    backend: Backend,

    #[arg(long, value_enum, default_value_t = Pilot::Auto)]
    pilot: Pilot,

    /// Drift tolerated by the autopilot before it steers
    #[arg(long, default_value_t = 0.5)]
    dead_zone: f32,

    /// Print the effective tuning as JSON and exit
    #[arg(long)]
    dump_tuning: bool,
}

#[derive(Debug, thiserror::Error)]
enum RunError {
    #[error(transparent)]
    Tuning(#[from] TuningError),
    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// Records scene switches requested by the game
#[derive(Debug, Default)]
struct HeadlessDirector {
    pending: Option<String>,
}

impl SceneDirector for HeadlessDirector {
    fn start(&mut self, scene: &str) {
        log::info!("Scene switch requested: {}", scene);
        self.pending = Some(scene.to_string());
    }
}

/// How a single run ended
#[derive(Debug)]
struct RunSummary {
    seed: u64,
    boxes: usize,
    frames: u64,
    failed_at: Option<u64>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), RunError> {
    let tuning = match &cli.tuning {
        Some(path) => Tuning::load(path)?,
        None => cli.variant.tuning(),
    };

    if cli.dump_tuning {
        println!("{}", tuning.to_json_pretty()?);
        return Ok(());
    }

    let seed = cli.seed.unwrap_or_else(clock_seed);
    log::info!(
        "Log Roller starting: variant={} backend={:?} pilot={:?} seed={}",
        cli.variant,
        cli.backend,
        cli.pilot,
        seed
    );

    let summaries = match cli.backend {
        Backend::Rapier => play(cli, tuning, seed, &mut RapierWorld::new())?,
        Backend::Kinematic => play(cli, tuning, seed, &mut KinematicWorld::new())?,
    };

    let survived = summaries.iter().filter(|s| s.failed_at.is_none()).count();
    for (i, summary) in summaries.iter().enumerate() {
        match summary.failed_at {
            Some(frame) => log::info!(
                "Run {}: seed={} boxes={} fell on frame {}",
                i + 1,
                summary.seed,
                summary.boxes,
                frame
            ),
            None => log::info!(
                "Run {}: seed={} boxes={} balanced for {} frames",
                i + 1,
                summary.seed,
                summary.boxes,
                summary.frames
            ),
        }
    }
    log::info!("{}/{} run(s) survived", survived, summaries.len());
    Ok(())
}

fn play<P: PhysicsBackend>(
    cli: &Cli,
    tuning: Tuning,
    seed: u64,
    physics: &mut P,
) -> Result<Vec<RunSummary>, SceneError> {
    let mut scene = GameScene::new(tuning, seed);
    scene.events_mut().subscribe(|event| {
        log::debug!("Overlay notified: {}", event.topic());
    });

    let autopilot = Autopilot::new(cli.dead_zone);
    let mut director = HeadlessDirector::default();
    let mut summaries = Vec::new();

    for _ in 0..cli.runs {
        scene.restart(physics)?;

        for _ in 0..cli.frames {
            let Some(state) = scene.state() else { break };
            let input = match cli.pilot {
                Pilot::Auto => autopilot.steer(state, state.log_body(physics)?.angle),
                Pilot::Idle => FrameInput::default(),
                Pilot::Left => FrameInput::left(),
                Pilot::Right => FrameInput::right(),
            };

            scene.frame(physics, &input, &mut director)?;

            if director.pending.take().as_deref() == Some(names::GAME_OVER) {
                break;
            }
        }

        if let Some(state) = scene.state() {
            summaries.push(RunSummary {
                seed: state.seed,
                boxes: state.box_count(),
                frames: state.frame,
                failed_at: state.game_over_frame,
            });
        }
    }

    scene.shutdown(physics);
    Ok(summaries)
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
