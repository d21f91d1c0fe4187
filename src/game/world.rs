//! World controller
//!
//! Owns everything a running level needs and advances it one tick at a time:
//!
//! 1. player timers and the player light
//! 2. enemies (neighbor positions are snapshotted before any enemy moves)
//! 3. spawner
//! 4. pathfinder, within its time budget
//! 5. physics step and contact dispatch
//! 6. sweep of erased enemies and spent bullets
//! 7. event queue swap

use glam::Vec2;
use hecs::Entity;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::ai::agent::AgentContext;
use crate::ai::grid::TileSource;
use crate::ai::pathfinding::{PathFinder, PathResult, RequestId};
use crate::ai::spawn::{Light, LightField, SpawnManager};
use crate::core::config::SwarmConfig;
use crate::core::events::{EventQueue, GameEvent, GameState};
use crate::core::level::{LevelData, TileMap};
use crate::core::LoadError;
use crate::ecs::{Body, Bullet, Enemy, EntityKind, World};
use crate::game::contact::{Collider, Contact, ContactRule};
use crate::game::player::Player;
use crate::physics::{BallDesc, BodyHandle, BodyPair, Physics};

/// Radius of the exit trigger in metres
const EXIT_RADIUS: f32 = 0.5;

/// Gap between the player's body and a freshly fired bullet
const MUZZLE_GAP: f32 = 0.01;

/// Runs a level: physics, enemies, spawning, pathfinding and contacts
pub struct WorldController {
    config: SwarmConfig,
    physics: Physics,
    world: World,
    path_finder: PathFinder,
    spawner: SpawnManager,
    lights: LightField,
    player_light: usize,
    player: Player,
    exit: Option<BodyHandle>,
    /// Contact identity of every body
    colliders: FxHashMap<BodyHandle, Collider>,
    /// Pairs touching after the previous step
    touching: FxHashSet<BodyPair>,
    events: EventQueue,
    state: GameState,
    level_name: String,
}

impl WorldController {
    /// Create a controller running `level`
    ///
    /// # Errors
    ///
    /// Returns `LoadError::InvalidLevel` if the level's tiles are unusable
    pub fn new(config: SwarmConfig, level: &LevelData) -> Result<Self, LoadError> {
        let tiles = level.tile_map()?;

        let mut physics = Physics::new();
        let player_body = physics.create_ball(level.player_spawn, BallDesc::new(config.player.radius));

        let mut controller = Self {
            physics,
            world: World::new(),
            path_finder: PathFinder::new(&config.path_finder),
            spawner: SpawnManager::new(&config.spawner),
            lights: LightField::default(),
            player_light: 0,
            player: Player::new(&config.player, player_body),
            exit: None,
            colliders: FxHashMap::default(),
            touching: FxHashSet::default(),
            events: EventQueue::new(),
            state: GameState::Playing,
            level_name: String::new(),
            config,
        };
        controller.populate(level, &tiles);
        Ok(controller)
    }

    /// Replace the running level; everything from the previous one is dropped
    ///
    /// # Errors
    ///
    /// Returns `LoadError::InvalidLevel` if the level's tiles are unusable.
    /// The previous level keeps running in that case.
    pub fn load_level(&mut self, level: &LevelData) -> Result<(), LoadError> {
        let tiles = level.tile_map()?;

        self.physics.clear();
        self.world.clear();
        self.colliders.clear();
        self.touching.clear();
        self.events.clear();
        self.spawner.clear();

        let player_body = self
            .physics
            .create_ball(level.player_spawn, BallDesc::new(self.config.player.radius));
        self.player = Player::new(&self.config.player, player_body);

        self.populate(level, &tiles);
        Ok(())
    }

    /// Set up everything but the player body, which must already exist
    fn populate(&mut self, level: &LevelData, tiles: &TileMap) {
        self.path_finder.init(tiles);

        for &point in &level.enemy_spawns {
            self.spawner.add_spawn_point(point);
        }
        if let Some(max_enemies) = level.max_enemies {
            self.spawner.set_max_enemies(max_enemies);
        }

        let walls = self.build_walls(tiles);
        self.colliders.insert(self.player.body(), Collider::player());

        self.lights = LightField::new(level.lights.clone());
        self.player_light = self
            .lights
            .add(Light::new(level.player_spawn, self.config.player.light_radius));

        self.exit = level.exit.map(|position| {
            let exit = self.physics.create_sensor(position, EXIT_RADIUS);
            self.colliders.insert(exit, Collider::exit());
            exit
        });

        self.state = GameState::Playing;
        self.level_name.clone_from(&level.name);

        log::info!(
            "Level '{}' loaded: {}x{} tiles, {walls} wall bodies, {} spawn points",
            level.name,
            tiles.width(),
            tiles.height(),
            level.enemy_spawns.len()
        );
    }

    /// One fixed box per horizontal run of wall tiles
    fn build_walls(&mut self, tiles: &TileMap) -> usize {
        let ppm = self.config.path_finder.pixels_per_metre;
        let tile_w = tiles.tile_width() / ppm;
        let tile_h = tiles.tile_height() / ppm;
        let mut count = 0;

        for y in 0..tiles.height() {
            let mut x = 0;
            while x < tiles.width() {
                if tiles.is_walkable(x, y) {
                    x += 1;
                    continue;
                }

                let start = x;
                while x < tiles.width() && !tiles.is_walkable(x, y) {
                    x += 1;
                }

                let run = (x - start) as f32;
                let center = Vec2::new((start as f32 + run / 2.0) * tile_w, (y as f32 + 0.5) * tile_h);
                let half_extents = Vec2::new(run * tile_w / 2.0, tile_h / 2.0);
                let wall = self.physics.create_wall(center, half_extents);
                self.colliders.insert(wall, Collider::geometry());
                count += 1;
            }
        }

        count
    }

    /// Advance the level by `delta` seconds
    pub fn update(&mut self, delta: f32) {
        if self.state == GameState::Playing {
            let player_position = self.player_position();

            self.player.update(delta);
            self.lights.set_position(self.player_light, player_position);

            self.update_enemies(delta, player_position);

            let live = self.world.enemy_count();
            if let Some(position) = self.spawner.update(delta, live, player_position, &self.lights) {
                self.spawn_enemy(position);
            }

            self.update_paths();

            self.physics.step(delta);
            self.dispatch_contacts();

            self.sweep();
        }

        self.events.swap();
    }

    fn update_enemies(&mut self, delta: f32, player_position: Vec2) {
        let neighbors: Vec<Vec2> = self
            .world
            .query::<(&Enemy, &Body)>()
            .iter()
            .filter_map(|(_, (_, body))| self.physics.position(body.0))
            .collect();

        for (_, (enemy, body)) in self.world.query_mut::<(&mut Enemy, &Body)>() {
            let Some(mut rigid_body) = self.physics.body_mut(body.0) else {
                continue;
            };
            let mut ctx = AgentContext {
                delta,
                target: player_position,
                neighbors: &neighbors,
                path_finder: &mut self.path_finder,
            };
            enemy.update(&mut rigid_body, &mut ctx);
        }
    }

    fn update_paths(&mut self) {
        let owners: FxHashMap<RequestId, Entity> = self
            .world
            .query::<&Enemy>()
            .iter()
            .filter_map(|(entity, enemy)| enemy.pending_request().map(|id| (id, entity)))
            .collect();

        let mut resolved: Vec<PathResult> = Vec::new();
        self.path_finder.update_with(|result| resolved.push(result));

        for result in resolved {
            self.events.push(GameEvent::PathResolved {
                id: result.id,
                code: result.code(),
            });

            if let Some(&entity) = owners.get(&result.id) {
                if let Ok(mut enemy) = self.world.get_mut::<Enemy>(entity) {
                    enemy.on_path_result(result);
                }
            }
        }
    }

    fn dispatch_contacts(&mut self) {
        let now: FxHashSet<BodyPair> = self.physics.touching_pairs().into_iter().collect();
        let began: Vec<BodyPair> = now.difference(&self.touching).copied().collect();
        let ended: Vec<BodyPair> = self.touching.difference(&now).copied().collect();
        self.touching = now;

        for pair in began {
            if let Some(contact) = self.contact(pair) {
                self.begin_contact(contact);
            }
        }
        for pair in ended {
            if let Some(contact) = self.contact(pair) {
                self.end_contact(contact);
            }
        }
    }

    fn contact(&self, pair: BodyPair) -> Option<Contact> {
        Some(Contact::new(
            *self.colliders.get(&pair.0)?,
            *self.colliders.get(&pair.1)?,
        ))
    }

    /// Two colliders started touching
    pub fn begin_contact(&mut self, contact: Contact) {
        match ContactRule::classify(contact) {
            ContactRule::EnemyPlayer { enemy } => {
                let damage = self.world.get_mut::<Enemy>(enemy).ok().and_then(|mut enemy| {
                    enemy.state().can_move().then(|| {
                        enemy.on_player_contact();
                        enemy.damage()
                    })
                });
                if let Some(damage) = damage {
                    self.damage_player(damage, Some(enemy));
                }
            }
            ContactRule::BulletEnemy { bullet, enemy } => {
                let Some(damage) = self.spend_bullet(bullet) else {
                    return;
                };
                if let Ok(mut enemy) = self.world.get_mut::<Enemy>(enemy) {
                    if enemy.hit(damage) {
                        log::debug!("Enemy killed");
                    }
                }
            }
            ContactRule::BulletGeometry { bullet } => {
                self.spend_bullet(bullet);
            }
            ContactRule::PlayerExit => self.set_state(GameState::Victory),
            ContactRule::Ignore => {}
        }
    }

    /// Two colliders stopped touching
    pub fn end_contact(&mut self, contact: Contact) {
        if let ContactRule::EnemyPlayer { enemy } = ContactRule::classify(contact) {
            if let Ok(mut enemy) = self.world.get_mut::<Enemy>(enemy) {
                enemy.on_player_contact_end();
            }
        }
    }

    /// Mark a bullet spent, returning its damage if it was still live
    fn spend_bullet(&mut self, bullet: Entity) -> Option<f32> {
        let mut bullet = self.world.get_mut::<Bullet>(bullet).ok()?;
        if bullet.spent {
            return None;
        }
        bullet.spent = true;
        Some(bullet.damage)
    }

    fn damage_player(&mut self, amount: f32, source: Option<Entity>) {
        if !self.player.take_damage(amount) {
            return;
        }

        let health = self.player.health();
        log::info!("Player hit for {amount}, {health} health left");
        self.events.push(GameEvent::PlayerDamaged {
            amount,
            health,
            source,
        });

        if self.player.is_dead() {
            self.set_state(GameState::Defeat);
        }
    }

    fn set_state(&mut self, state: GameState) {
        if self.state != state {
            log::info!("Game state: {} -> {}", self.state.name(), state.name());
            self.state = state;
            self.events.push(GameEvent::StateChanged { state });
        }
    }

    /// Remove erased enemies and spent bullets
    fn sweep(&mut self) {
        for (entity, body) in self.world.finished() {
            let is_enemy = self.world.kind(entity) == Some(EntityKind::Enemy);
            if is_enemy {
                let pending = self
                    .world
                    .get::<Enemy>(entity)
                    .ok()
                    .and_then(|enemy| enemy.pending_request());
                if let Some(id) = pending {
                    self.path_finder.forget(id);
                }
            }

            self.physics.remove_body(body);
            self.colliders.remove(&body);
            self.touching.retain(|pair| !pair.contains(body));

            if self.world.despawn(entity).is_ok() && is_enemy {
                log::debug!("Enemy {entity:?} erased");
                self.events.push(GameEvent::EnemyErased { entity });
            }
        }
    }

    /// Spawn an enemy at `position`
    pub fn spawn_enemy(&mut self, position: Vec2) -> Entity {
        let enemy = &self.config.enemy;
        let desc = BallDesc::new(enemy.radius)
            .with_density(enemy.density)
            .with_friction(enemy.friction)
            .with_restitution(enemy.restitution);

        let body = self.physics.create_ball(position, desc);
        let entity = self.world.spawn_enemy(Enemy::new(enemy, position), body);
        self.colliders.insert(body, Collider::enemy(entity));

        log::info!(
            "Enemy spawned at ({:.2}, {:.2}), swarm level {:.2}",
            position.x,
            position.y,
            self.swarm_level()
        );
        self.events.push(GameEvent::EnemySpawned { entity, position });
        entity
    }

    /// Fire a bullet from the player along `direction`
    ///
    /// Returns `None` when the game is over or `direction` is zero.
    pub fn spawn_bullet(&mut self, direction: Vec2) -> Option<Entity> {
        let direction = direction.normalize_or_zero();
        if self.state != GameState::Playing || direction == Vec2::ZERO {
            return None;
        }

        let player = &self.config.player;
        let position =
            self.player_position() + direction * (player.radius + player.bullet_radius + MUZZLE_GAP);
        let body = self.physics.create_ball(position, BallDesc::new(player.bullet_radius));
        self.physics
            .set_linear_velocity(body, direction * player.bullet_speed);

        let entity = self.world.spawn_bullet(Bullet::new(player.bullet_damage), body);
        self.colliders.insert(body, Collider::bullet(entity));
        Some(entity)
    }

    /// Drive the player body
    pub fn set_player_velocity(&mut self, velocity: Vec2) {
        self.physics.set_linear_velocity(self.player.body(), velocity);
    }

    #[must_use]
    pub fn player_position(&self) -> Vec2 {
        self.physics
            .position(self.player.body())
            .unwrap_or(Vec2::ZERO)
    }

    #[must_use]
    pub fn player(&self) -> &Player {
        &self.player
    }

    #[must_use]
    pub fn state(&self) -> GameState {
        self.state
    }

    #[must_use]
    pub fn level_name(&self) -> &str {
        &self.level_name
    }

    /// Events from the previous tick
    #[must_use]
    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    #[must_use]
    pub fn physics(&self) -> &Physics {
        &self.physics
    }

    #[must_use]
    pub fn path_finder(&self) -> &PathFinder {
        &self.path_finder
    }

    #[must_use]
    pub fn spawner(&self) -> &SpawnManager {
        &self.spawner
    }

    #[must_use]
    pub fn exit(&self) -> Option<BodyHandle> {
        self.exit
    }

    #[must_use]
    pub fn enemy_count(&self) -> usize {
        self.world.enemy_count()
    }

    /// Live enemies relative to the configured cap
    #[must_use]
    pub fn swarm_level(&self) -> f32 {
        self.spawner.swarm_level(self.world.enemy_count())
    }

    /// Positions of all enemies
    #[must_use]
    pub fn enemy_positions(&self) -> Vec<(Entity, Vec2)> {
        self.world
            .query::<(&Enemy, &Body)>()
            .iter()
            .filter_map(|(entity, (_, body))| Some((entity, self.physics.position(body.0)?)))
            .collect()
    }
}
