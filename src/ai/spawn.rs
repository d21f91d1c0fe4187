//! Enemy spawn scheduling
//!
//! Spawns happen at fixed points, never in the light and never too close to
//! the player, and are rate limited and capped.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::core::config::SpawnerConfig;

/// Answers whether a world position is currently illuminated
pub trait Visibility {
    fn is_lit(&self, point: Vec2) -> bool;
}

impl<F: Fn(Vec2) -> bool> Visibility for F {
    fn is_lit(&self, point: Vec2) -> bool {
        self(point)
    }
}

/// A circular light
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub position: Vec2,
    pub radius: f32,
}

impl Light {
    #[must_use]
    pub fn new(position: Vec2, radius: f32) -> Self {
        Self { position, radius }
    }

    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        self.position.distance_squared(point) <= self.radius * self.radius
    }
}

/// A set of lights, usable as a visibility oracle
#[derive(Debug, Clone, Default)]
pub struct LightField {
    lights: Vec<Light>,
}

impl LightField {
    #[must_use]
    pub fn new(lights: Vec<Light>) -> Self {
        Self { lights }
    }

    /// Add a light, returning its index
    pub fn add(&mut self, light: Light) -> usize {
        self.lights.push(light);
        self.lights.len() - 1
    }

    /// Move an existing light
    pub fn set_position(&mut self, index: usize, position: Vec2) {
        if let Some(light) = self.lights.get_mut(index) {
            light.position = position;
        }
    }

    pub fn clear(&mut self) {
        self.lights.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lights.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }
}

impl Visibility for LightField {
    fn is_lit(&self, point: Vec2) -> bool {
        self.lights.iter().any(|light| light.contains(point))
    }
}

/// A fixed spawn location
#[derive(Debug, Clone)]
pub struct SpawnPoint {
    pub position: Vec2,
    /// Seconds since an enemy last appeared here
    pub time_since_last_spawn: f32,
}

impl SpawnPoint {
    #[must_use]
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            time_since_last_spawn: 0.0,
        }
    }
}

/// Decides when and where enemies appear
#[derive(Debug, Clone)]
pub struct SpawnManager {
    spawn_points: Vec<SpawnPoint>,
    game_time: f64,
    time_since_last_spawn: f32,
    max_enemies: usize,
    default_max_enemies: usize,
    min_interval: f32,
    min_distance: f32,
}

impl SpawnManager {
    #[must_use]
    pub fn new(config: &SpawnerConfig) -> Self {
        Self {
            spawn_points: Vec::new(),
            game_time: 0.0,
            time_since_last_spawn: 0.0,
            max_enemies: config.max_enemies,
            default_max_enemies: config.max_enemies,
            min_interval: config.min_interval,
            min_distance: config.min_distance,
        }
    }

    pub fn add_spawn_point(&mut self, position: Vec2) {
        self.spawn_points.push(SpawnPoint::new(position));
    }

    #[must_use]
    pub fn spawn_points(&self) -> &[SpawnPoint] {
        &self.spawn_points
    }

    /// Override the live enemy cap for the current level
    pub fn set_max_enemies(&mut self, max_enemies: usize) {
        self.max_enemies = max_enemies;
    }

    #[must_use]
    pub fn max_enemies(&self) -> usize {
        self.max_enemies
    }

    /// Seconds since the level started
    #[must_use]
    pub fn game_time(&self) -> f64 {
        self.game_time
    }

    /// Live enemy count relative to the configured cap
    #[must_use]
    pub fn swarm_level(&self, live_count: usize) -> f32 {
        if self.default_max_enemies == 0 {
            return 0.0;
        }
        live_count as f32 / self.default_max_enemies as f32
    }

    /// Forget all spawn points and timers (level change)
    pub fn clear(&mut self) {
        self.spawn_points.clear();
        self.game_time = 0.0;
        self.time_since_last_spawn = 0.0;
        self.max_enemies = self.default_max_enemies;
    }

    /// Advance timers and return where to spawn an enemy this tick, if anywhere
    pub fn update(
        &mut self,
        delta: f32,
        live_count: usize,
        player: Vec2,
        visibility: &impl Visibility,
    ) -> Option<Vec2> {
        self.game_time += f64::from(delta);
        self.time_since_last_spawn += delta;
        for point in &mut self.spawn_points {
            point.time_since_last_spawn += delta;
        }

        if !self.should_spawn(live_count) {
            return None;
        }

        let index = self.pick_spawn_point(player, visibility)?;
        let point = &mut self.spawn_points[index];
        point.time_since_last_spawn = 0.0;
        self.time_since_last_spawn = 0.0;

        log::debug!("Spawning enemy at ({:.2}, {:.2})", point.position.x, point.position.y);
        Some(point.position)
    }

    fn should_spawn(&self, live_count: usize) -> bool {
        self.time_since_last_spawn > self.min_interval && live_count < self.max_enemies
    }

    /// Nearest unlit spawn point farther than the minimum distance
    fn pick_spawn_point(&self, player: Vec2, visibility: &impl Visibility) -> Option<usize> {
        let min_distance_sq = self.min_distance * self.min_distance;
        let mut best = None;
        let mut best_distance_sq = f32::INFINITY;

        for (i, point) in self.spawn_points.iter().enumerate() {
            let distance_sq = player.distance_squared(point.position);
            if distance_sq > min_distance_sq
                && distance_sq < best_distance_sq
                && !visibility.is_lit(point.position)
            {
                best = Some(i);
                best_distance_sq = distance_sq;
            }
        }

        best
    }
}
