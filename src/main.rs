//! Space Brawl entry point
//!
//! Runs the simulation headless on a fixed timestep with the autopilot
//! flying, until the director has played every round or the player is
//! destroyed.
//!
//! Usage: `space-brawl [config.json]`

use glam::Vec2;

use space_brawl::consts::{PLAYER_SIZE, SIM_DT};
use space_brawl::sim::{ManualTime, TickInput, World};
use space_brawl::{SimConfig, SimResult};

/// Ten minutes of game time
const MAX_TICKS: u64 = 10 * 60 * 120;
/// Log a progress line every this many ticks
const REPORT_EVERY: u64 = 120 * 10;

fn load_config() -> SimConfig {
    let Some(path) = std::env::args().nth(1) else {
        return SimConfig::default();
    };
    match SimConfig::load(&path) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Failed to load config from {path}: {e}; using defaults");
            SimConfig::default()
        }
    }
}

fn run() -> SimResult<()> {
    let config = load_config();
    let arena = config.arena();

    // Headless: time only moves when the loop says so
    let time = ManualTime::new();
    let mut world = World::new(config, time.source())?;
    world.spawn_player(Vec2::new(
        arena.center().x,
        arena.bottom() - PLAYER_SIZE[1],
    ))?;
    world.start_director();

    let input = TickInput {
        autopilot: true,
        ..Default::default()
    };
    while world.ticks() < MAX_TICKS {
        time.advance(SIM_DT as f64);
        world.advance(SIM_DT, &input)?;

        if world.ticks() % REPORT_EVERY == 0 {
            log::info!(
                "t={:.0}s score={} enemies={} projectiles={}",
                world.game_time(),
                world.score(),
                world.enemies().live_len(),
                world.projectiles().live_len()
            );
        }
        if world.director_finished() {
            log::info!("all rounds cleared");
            break;
        }
        if world.players().is_empty() {
            log::info!("player destroyed");
            break;
        }
    }

    println!(
        "score {} after {:.1}s ({} ticks), last upgrade: {}",
        world.score(),
        world.game_time(),
        world.ticks(),
        world
            .last_pick()
            .map_or_else(|| "none".to_string(), |pick| format!("{pick:?}"))
    );
    Ok(())
}

fn main() {
    env_logger::init();
    log::info!("Space Brawl (headless) starting...");

    if let Err(e) = run() {
        log::error!("simulation failed: {e}");
        std::process::exit(1);
    }
}
