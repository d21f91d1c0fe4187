//! AI and navigation module
//!
//! Provides grid pathfinding with a per-tick time budget, steering behaviors
//! with weighted blending, the enemy state machine, and spawn scheduling.

pub mod agent;
pub mod grid;
pub mod pathfinding;
pub mod spawn;
pub mod steering;

pub use agent::{AgentBody, AgentContext, AgentState, Enemy};
pub use grid::{GridCoord, NavGrid, TileSource};
pub use pathfinding::{Path, PathError, PathFinder, PathResult, RequestId, ResultCode};
pub use spawn::{Light, LightField, SpawnManager, SpawnPoint, Visibility};
pub use steering::{
    BlendWeights, Flee, FollowPath, Seek, Separation, SteeringBehavior, SteeringBlender,
    SteeringContext, SteeringOutput,
};
