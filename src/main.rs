//! Headless swarm simulation
//!
//! Runs a level for a fixed number of ticks with the player walking a
//! planned route to the exit and firing at the nearest enemy, logging what
//! happens.
//!
//! ```text
//! RUST_LOG=info cargo run -- [level.ron] [config.ron]
//! ```

use swarm::prelude::*;

const TICK: f32 = 1.0 / 60.0;
const MAX_TICKS: u32 = 60 * 60;
const FIRE_INTERVAL: u32 = 30;
const WALK_SPEED: f32 = 1.5;
const REPLAN_INTERVAL: u32 = 60;
const WAYPOINT_RADIUS: f32 = 0.2;

const DEMO_LEVEL: &str = include_str!("../levels/crypt.ron");

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let level = match args.next() {
        Some(path) => LevelData::load_ron(path)?,
        None => LevelData::from_ron_str(DEMO_LEVEL)?,
    };
    let config = match args.next() {
        Some(path) => SwarmConfig::load_ron(path)?,
        None => SwarmConfig::default().with_spawn_interval(1.0),
    };

    let exit = level.exit;
    let mut controller = WorldController::new(config, &level)?;
    log::info!("Running '{}'", controller.level_name());

    let mut spawned = 0;
    let mut erased = 0;
    let mut tick = 0;
    let mut route: Vec<Vec2> = Vec::new();
    while tick < MAX_TICKS && controller.state() == GameState::Playing {
        let player = controller.player_position();
        if tick % REPLAN_INTERVAL == 0 {
            route = exit
                .and_then(|exit| controller.path_finder().find_path(player, exit).ok())
                .unwrap_or_default();
        }
        while route.first().is_some_and(|point| point.distance(player) < WAYPOINT_RADIUS) {
            route.remove(0);
        }
        let walk = route.first().map_or(Vec2::ZERO, |&point| (point - player).normalize_or_zero());
        controller.set_player_velocity(walk * WALK_SPEED);

        if tick % FIRE_INTERVAL == 0 {
            let nearest = controller
                .enemy_positions()
                .into_iter()
                .map(|(_, position)| position)
                .min_by(|a, b| a.distance_squared(player).total_cmp(&b.distance_squared(player)));
            if let Some(target) = nearest {
                controller.spawn_bullet(target - player);
            }
        }

        controller.update(TICK);
        tick += 1;

        for event in controller.events().iter() {
            match event {
                GameEvent::EnemySpawned { .. } => spawned += 1,
                GameEvent::EnemyErased { .. } => erased += 1,
                GameEvent::PathResolved { id, code } if *code != ResultCode::PathFound => {
                    log::debug!("Path {id} failed: {code:?}");
                }
                _ => {}
            }
        }
    }

    log::info!(
        "Finished after {tick} ticks: {:?}, {spawned} spawned, {erased} erased, player health {}",
        controller.state(),
        controller.player().health()
    );
    log::info!("Pathfinder: {}", controller.path_finder().stats().format_stats());

    Ok(())
}
