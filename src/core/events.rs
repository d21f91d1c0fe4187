//! Event queue for decoupled communication
//!
//! A double-buffered queue of [`GameEvent`]s. The world controller pushes
//! events while it runs a tick and swaps the buffers at the end of the tick,
//! so consumers (HUD, audio, the demo binary) read a consistent view of
//! everything that happened during the previous tick.
//!
//! # Example
//!
//! ```ignore
//! controller.update(dt);
//! for event in controller.events().iter() {
//!     if let GameEvent::EnemySpawned { position, .. } = event {
//!         spawn_effect(*position);
//!     }
//! }
//! ```

use std::collections::VecDeque;

use glam::Vec2;
use hecs::Entity;

use crate::ai::pathfinding::{RequestId, ResultCode};

// ============================================================================
// Event Types
// ============================================================================

/// Outcome of a whole game, as reported by [`GameEvent::StateChanged`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameState {
    Playing,
    Victory,
    Defeat,
}

impl GameState {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Playing => "Playing",
            Self::Victory => "Victory",
            Self::Defeat => "Defeat",
        }
    }
}

/// Things that happened in the world during a tick
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum GameEvent {
    // -------------------------------------------------------------------------
    // Swarm Events
    // -------------------------------------------------------------------------
    /// An enemy appeared at a spawn point.
    EnemySpawned {
        entity: Entity,
        position: Vec2,
    },

    /// An enemy was removed from the world.
    EnemyErased {
        entity: Entity,
    },

    /// A path request was resolved.
    PathResolved {
        id: RequestId,
        code: ResultCode,
    },

    // -------------------------------------------------------------------------
    // Player Events
    // -------------------------------------------------------------------------
    /// The player took damage.
    PlayerDamaged {
        /// Amount of damage dealt
        amount: f32,
        /// Health left afterwards
        health: f32,
        /// Enemy that dealt the damage
        source: Option<Entity>,
    },

    // -------------------------------------------------------------------------
    // Game State Events
    // -------------------------------------------------------------------------
    /// The game ended or restarted.
    StateChanged {
        state: GameState,
    },
}

// ============================================================================
// Event Queue
// ============================================================================

/// Double-buffered event queue.
///
/// Events pushed during tick N are readable after the swap that ends tick N,
/// until the swap that ends tick N+1.
#[derive(Debug)]
pub struct EventQueue {
    /// Events being written this tick
    pending: VecDeque<GameEvent>,
    /// Events from the previous tick, ready for processing
    processing: VecDeque<GameEvent>,
}

impl EventQueue {
    const DEFAULT_CAPACITY: usize = 64;

    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pending: VecDeque::with_capacity(capacity),
            processing: VecDeque::with_capacity(capacity),
        }
    }

    /// Push an event; it becomes visible after the next `swap()`
    #[inline]
    pub fn push(&mut self, event: GameEvent) {
        self.pending.push_back(event);
    }

    /// Make this tick's events readable and start a fresh pending buffer
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.pending, &mut self.processing);
        self.pending.clear();
    }

    /// Iterate over events from the previous tick
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &GameEvent> {
        self.processing.iter()
    }

    /// Take ownership of events from the previous tick
    #[inline]
    pub fn drain(&mut self) -> impl Iterator<Item = GameEvent> + '_ {
        self.processing.drain(..)
    }

    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.processing.is_empty()
    }

    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.processing.len()
    }

    /// Number of events waiting for the next swap
    #[must_use]
    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Drop everything (level change)
    pub fn clear(&mut self) {
        self.pending.clear();
        self.processing.clear();
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
