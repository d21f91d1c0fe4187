//! Tunable parameters for the swarm simulation
//!
//! Every scalar the pathfinder, steering, spawner and player logic consume
//! lives here. Defaults reproduce the shipped game's feel; a RON file can
//! override any subset of fields.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::LoadError;

/// Pathfinder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathFinderConfig {
    /// Wall-clock budget per `update()` call, in milliseconds
    pub budget_ms: u64,
    /// Conversion between world metres and tile pixels
    pub pixels_per_metre: f32,
}

impl Default for PathFinderConfig {
    fn default() -> Self {
        Self {
            budget_ms: 5,
            pixels_per_metre: 64.0,
        }
    }
}

impl PathFinderConfig {
    /// Budget as a `Duration`
    #[must_use]
    pub fn budget(&self) -> Duration {
        Duration::from_millis(self.budget_ms)
    }
}

/// Enemy movement and steering configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyConfig {
    /// Collision radius in metres
    pub radius: f32,
    pub friction: f32,
    pub density: f32,
    pub restitution: f32,
    /// Velocity clamp applied after steering
    pub max_speed: f32,
    /// Maximum acceleration of every behavior and clamp of the blended force
    pub max_force: f32,
    /// Distance between the path's end and the player that triggers a new request
    pub repath_distance: f32,
    /// Waypoint arrival radius for path following
    pub arrive_distance: f32,
    /// Lookahead used to predict the agent's position when following a path
    pub predict_time: f32,
    /// Dot product above which the agent skips to the next waypoint
    pub path_angle_threshold: f32,
    pub separation_check_distance: f32,
    pub separation_decay: f32,
    pub follow_path_weight: f32,
    pub separation_weight: f32,
    pub seek_weight: f32,
    /// Damage dealt to the player on contact
    pub damage: f32,
    pub health: f32,
    /// Seconds spent in `Damaged` before requesting a fresh path
    pub damaged_time: f32,
    /// Seconds spent in `Dying` before the agent is erased
    pub dying_time: f32,
}

impl Default for EnemyConfig {
    fn default() -> Self {
        Self {
            radius: 0.25,
            friction: 0.2,
            density: 0.1,
            restitution: 0.2,
            max_speed: 3.5,
            max_force: 2.0,
            repath_distance: 5.0,
            arrive_distance: 0.1,
            predict_time: 0.05,
            path_angle_threshold: 0.8,
            separation_check_distance: 5.0,
            separation_decay: 0.05,
            follow_path_weight: 0.6,
            separation_weight: 0.4,
            seek_weight: 0.6,
            damage: 25.0,
            health: 1.0,
            damaged_time: 0.5,
            dying_time: 0.25,
        }
    }
}

/// Spawner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnerConfig {
    /// Minimum seconds between two spawns anywhere on the map
    pub min_interval: f32,
    /// Spawn points closer than this to the player are never used
    pub min_distance: f32,
    /// Default cap on live enemies (levels may override)
    pub max_enemies: usize,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            min_interval: 5.0,
            min_distance: 6.0,
            max_enemies: 10,
        }
    }
}

/// Player configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub health: f32,
    /// Body radius in metres
    pub radius: f32,
    /// Seconds of invulnerability after taking damage
    pub recover_time: f32,
    /// Radius of the light carried by the player
    pub light_radius: f32,
    pub bullet_speed: f32,
    pub bullet_radius: f32,
    /// Damage a bullet deals to an enemy
    pub bullet_damage: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            health: 50.0,
            radius: 0.25,
            recover_time: 2.0,
            light_radius: 8.0,
            bullet_speed: 5.0,
            bullet_radius: 0.1,
            bullet_damage: 1.0,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmConfig {
    pub path_finder: PathFinderConfig,
    pub enemy: EnemyConfig,
    pub spawner: SpawnerConfig,
    pub player: PlayerConfig,
}

impl SwarmConfig {
    /// Set the pathfinder budget in milliseconds
    pub fn with_budget_ms(mut self, budget_ms: u64) -> Self {
        self.path_finder.budget_ms = budget_ms;
        self
    }

    /// Set the pixel/metre conversion factor
    pub fn with_pixels_per_metre(mut self, pixels_per_metre: f32) -> Self {
        self.path_finder.pixels_per_metre = pixels_per_metre;
        self
    }

    /// Set the default live enemy cap
    pub fn with_max_enemies(mut self, max_enemies: usize) -> Self {
        self.spawner.max_enemies = max_enemies;
        self
    }

    /// Set the minimum interval between spawns
    pub fn with_spawn_interval(mut self, seconds: f32) -> Self {
        self.spawner.min_interval = seconds;
        self
    }

    /// Load configuration from a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let content = fs::read_to_string(path).map_err(|e| LoadError::Io(e.to_string()))?;
        Self::from_ron_str(&content)
    }

    /// Parse configuration from RON text
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails
    pub fn from_ron_str(content: &str) -> Result<Self, LoadError> {
        ron::from_str(content).map_err(|e| LoadError::Deserialize(e.to_string()))
    }

    /// Save configuration to a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save_ron(&self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        let ron_string = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| LoadError::Serialize(e.to_string()))?;
        fs::write(path, ron_string).map_err(|e| LoadError::Io(e.to_string()))?;
        Ok(())
    }

    /// Load configuration from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let content = fs::read_to_string(path).map_err(|e| LoadError::Io(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| LoadError::Deserialize(e.to_string()))
    }
}
