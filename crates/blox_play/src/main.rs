//! Headless Blox Play runner.
//!
//! Loads a world and a replay, then drives the session the way a display
//! would: each simulated frame feeds `1 / refresh_hz` seconds into the frame
//! clock, and the clock decides how many fixed ticks run. Replay scripts go
//! through the console before their tick.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use blox_core::time::FrameClock;
use blox_play::config::PlayConfig;
use blox_play::console::ScriptConsole;
use blox_play::projection::IsoCamera;
use blox_play::replay::load_replay_from_path;
use blox_play::session::PlaySession;
use blox_play::world::load_world_from_path;

#[derive(Parser, Debug)]
#[command(name = "blox_play")]
#[command(about = "Run a Blox Play world headlessly from a recorded input replay", long_about = None)]
struct Args {
    /// World JSON file
    #[arg(long, default_value = "assets/worlds/obby.json")]
    world: PathBuf,
    /// Replay JSON file
    #[arg(long, default_value = "assets/replays/obby_run.json")]
    replay: PathBuf,
    /// Config JSON file (falls back to BLOX_PLAY_CONFIG, then the default asset)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Simulated display refresh rate
    #[arg(long, default_value_t = 60.0)]
    refresh_hz: f64,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    if !args.refresh_hz.is_finite() || args.refresh_hz <= 0.0 {
        return Err(format!("--refresh-hz must be > 0, got {}", args.refresh_hz).into());
    }

    let config = PlayConfig::load(args.config.as_deref())?;
    let world = load_world_from_path(&args.world)?;
    let replay = load_replay_from_path(&args.replay)?;
    log::info!(
        "Running '{}' at {} Hz display, {} Hz tick",
        world.title.as_deref().unwrap_or(&world.world_id),
        args.refresh_hz,
        config.tick_rate_hz
    );

    let mut clock = FrameClock::with_tick_rate(config.tick_rate_hz, config.max_accumulator);
    let mut session = PlaySession::new(world, config);
    let mut console = ScriptConsole::new()?;
    let mut camera = IsoCamera::new(session.player_position());

    let ticks = replay.expanded();
    let mut next = 0;
    let frame_dt = 1.0 / args.refresh_hz;

    while next < ticks.len() && !session.won() {
        clock.begin_frame_with(frame_dt);
        while clock.should_step() {
            let Some(tick) = ticks.get(next) else {
                break;
            };
            next += 1;

            if let Some(script) = &tick.script {
                match console.execute(script) {
                    Ok(commands) => {
                        for command in &commands {
                            if let Err(err) = session.apply_command(command) {
                                log::warn!("Console command {:?} rejected: {}", command, err);
                            }
                        }
                    }
                    Err(err) => log::warn!("Replay script failed: {err}"),
                }
            }
            session.tick(&tick.input);
            if session.won() {
                break;
            }
        }
        clock.end_frame();
        camera.follow(session.player_position());
    }

    let state = session.state();
    log::debug!(
        "Camera focus {:?}, player at screen {:?}, {} sprites in view",
        camera.focus,
        camera.project(state.position),
        camera.project_scene(session.world(), state).len()
    );
    log::info!(
        "Finished after {} ticks ({} frames): pos=({:.2}, {:.2}, {:.2}) health={} deaths={} won={}",
        session.ticks(),
        clock.frame_count,
        state.position.x,
        state.position.y,
        state.position.z,
        state.health,
        session.deaths(),
        session.won()
    );
    Ok(())
}
