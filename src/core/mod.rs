//! Core module
//!
//! Configuration, level data, events, statistics and load errors

pub mod config;
pub mod debug;
mod error;
pub mod events;
pub mod level;

pub use config::{EnemyConfig, PathFinderConfig, PlayerConfig, SpawnerConfig, SwarmConfig};
pub use debug::BudgetStats;
pub use error::LoadError;
pub use events::{EventQueue, GameEvent};
pub use level::{LevelData, TileMap};
