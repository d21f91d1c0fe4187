//! Game module
//!
//! The world controller that runs a level, plus contact rules and the player

mod contact;
mod player;
mod world;

pub use contact::{Collider, Contact, ContactRule};
pub use player::Player;
pub use world::WorldController;
