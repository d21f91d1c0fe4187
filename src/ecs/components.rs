//! Swarm components
//!
//! Entities carry an [`EntityKind`] plus a physics [`BodyHandle`]; enemies
//! additionally carry their [`Enemy`] controller, bullets a [`Bullet`].

use crate::physics::BodyHandle;

pub use crate::ai::agent::Enemy;

/// What an entity is, for contact dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Player,
    Enemy,
    Bullet,
    Exit,
    /// Walls and other static level geometry
    Geometry,
}

/// Physics body backing an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Body(pub BodyHandle);

/// A projectile fired by the player
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bullet {
    /// Damage dealt to the first enemy hit
    pub damage: f32,
    /// Set once the bullet hit something; swept at the end of the tick
    pub spent: bool,
}

impl Bullet {
    #[must_use]
    pub fn new(damage: f32) -> Self {
        Self {
            damage,
            spent: false,
        }
    }
}
