//! Entity Component System module
//!
//! Built on top of the hecs ECS library

mod components;
mod world;

pub use components::{Body, Bullet, Enemy, EntityKind};
pub use world::World;
