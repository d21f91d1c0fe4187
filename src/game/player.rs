//! Player health and recovery

use crate::core::config::PlayerConfig;
use crate::physics::BodyHandle;

/// The player character
///
/// After taking damage the player recovers for `recover_time` seconds and
/// cannot be damaged again until the window closes.
#[derive(Debug, Clone)]
pub struct Player {
    body: BodyHandle,
    health: f32,
    recover_time: f32,
    /// Seconds of recovery left
    recovering: f32,
}

impl Player {
    #[must_use]
    pub fn new(config: &PlayerConfig, body: BodyHandle) -> Self {
        Self {
            body,
            health: config.health,
            recover_time: config.recover_time,
            recovering: 0.0,
        }
    }

    #[must_use]
    pub fn body(&self) -> BodyHandle {
        self.body
    }

    #[must_use]
    pub fn health(&self) -> f32 {
        self.health
    }

    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }

    #[must_use]
    pub fn is_recovering(&self) -> bool {
        self.recovering > 0.0
    }

    /// Advance the recovery timer
    pub fn update(&mut self, delta: f32) {
        self.recovering = (self.recovering - delta).max(0.0);
    }

    /// Apply damage unless recovering or already dead; returns whether it landed
    pub fn take_damage(&mut self, amount: f32) -> bool {
        if self.is_recovering() || self.is_dead() {
            return false;
        }

        self.health -= amount;
        self.recovering = self.recover_time;
        true
    }
}
