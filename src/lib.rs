//! Enemy swarms for a top-down tile game
//!
//! This crate provides:
//! - Budgeted A* pathfinding on a tile grid, resolved a few requests per tick
//! - Steering behaviors (follow path, separation, seek) with weighted blending
//! - An enemy state machine driving physics bodies
//! - Spawn scheduling that keeps enemies out of the light
//! - A world controller running levels with rapier3d physics and a hecs world

pub mod ai;
pub mod core;
pub mod ecs;
pub mod game;
pub mod physics;

// Re-exports for convenience
pub use glam;
pub use hecs;
pub use rapier3d;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::ai::{
        AgentBody, AgentState, Enemy, NavGrid, PathError, PathFinder, PathResult, RequestId,
        ResultCode, SpawnManager, TileSource, Visibility,
    };
    pub use crate::core::events::GameState;
    pub use crate::core::{EventQueue, GameEvent, LevelData, LoadError, SwarmConfig};
    pub use crate::game::{Collider, Contact, WorldController};
    pub use glam::Vec2;
}
