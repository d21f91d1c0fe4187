//! Steering behaviors for AI movement
//!
//! Behaviors turn an agent's kinematic state into a desired acceleration.
//! An agent owns one of each and blends them with [`BlendWeights`] through a
//! [`SteeringBlender`].

use glam::Vec2;

use crate::core::config::EnemyConfig;

/// Output from a steering behavior
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SteeringOutput {
    /// Linear acceleration
    pub linear: Vec2,
    /// Angular acceleration (unused by the current behaviors)
    pub angular: f32,
}

impl SteeringOutput {
    /// Zero steering
    pub const ZERO: Self = Self {
        linear: Vec2::ZERO,
        angular: 0.0,
    };

    /// Combine with another steering output
    #[must_use]
    pub fn combine(self, other: Self) -> Self {
        Self {
            linear: self.linear + other.linear,
            angular: self.angular + other.angular,
        }
    }

    /// Scale the output
    #[must_use]
    pub fn scale(self, factor: f32) -> Self {
        Self {
            linear: self.linear * factor,
            angular: self.angular * factor,
        }
    }
}

/// Agent state visible to behaviors for one tick
#[derive(Debug, Clone, Copy)]
pub struct SteeringContext<'a> {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Seconds since the previous tick
    pub delta: f32,
    /// Positions of every agent in the world, possibly including this one
    pub neighbors: &'a [Vec2],
}

impl<'a> SteeringContext<'a> {
    #[must_use]
    pub fn new(position: Vec2, velocity: Vec2, delta: f32, neighbors: &'a [Vec2]) -> Self {
        Self {
            position,
            velocity,
            delta,
            neighbors,
        }
    }
}

/// Trait for steering behaviors
pub trait SteeringBehavior {
    /// Calculate steering based on agent state
    fn calculate(&mut self, ctx: &SteeringContext<'_>) -> SteeringOutput;
}

/// Seek behavior - move towards target
#[derive(Debug, Clone)]
pub struct Seek {
    /// Target position
    pub target: Vec2,
    /// Maximum acceleration
    pub max_acceleration: f32,
}

impl Seek {
    /// Create a new seek behavior
    #[must_use]
    pub fn new(target: Vec2, max_acceleration: f32) -> Self {
        Self {
            target,
            max_acceleration,
        }
    }

    pub fn set_target(&mut self, target: Vec2) {
        self.target = target;
    }
}

impl SteeringBehavior for Seek {
    fn calculate(&mut self, ctx: &SteeringContext<'_>) -> SteeringOutput {
        let direction = (self.target - ctx.position).normalize_or_zero();
        SteeringOutput {
            linear: direction * self.max_acceleration,
            angular: 0.0,
        }
    }
}

/// Flee behavior - move away from target
#[derive(Debug, Clone)]
pub struct Flee {
    /// Target position to flee from
    pub target: Vec2,
    /// Maximum acceleration
    pub max_acceleration: f32,
}

impl Flee {
    /// Create a new flee behavior
    #[must_use]
    pub fn new(target: Vec2, max_acceleration: f32) -> Self {
        Self {
            target,
            max_acceleration,
        }
    }

    pub fn set_target(&mut self, target: Vec2) {
        self.target = target;
    }
}

impl SteeringBehavior for Flee {
    fn calculate(&mut self, ctx: &SteeringContext<'_>) -> SteeringOutput {
        let direction = (ctx.position - self.target).normalize_or_zero();
        SteeringOutput {
            linear: direction * self.max_acceleration,
            angular: 0.0,
        }
    }
}

/// Follow path behavior - seek waypoints in order, cutting corners
///
/// The agent's position is predicted `predict_time` seconds ahead. The
/// current waypoint is skipped when that prediction is within
/// `arrive_distance` of it, or when heading to it already points along the
/// next path segment (dot product above `path_angle_threshold`). At most one
/// waypoint is skipped per tick.
#[derive(Debug, Clone)]
pub struct FollowPath {
    seek: Seek,
    /// Waypoint arrival radius
    pub arrive_distance: f32,
    /// Lookahead in seconds
    pub predict_time: f32,
    /// Alignment above which a waypoint is skipped
    pub path_angle_threshold: f32,
    path: Vec<Vec2>,
    current: usize,
    done: bool,
}

impl FollowPath {
    /// Create a follow path behavior with no path
    #[must_use]
    pub fn new(
        max_acceleration: f32,
        arrive_distance: f32,
        predict_time: f32,
        path_angle_threshold: f32,
    ) -> Self {
        Self {
            seek: Seek::new(Vec2::ZERO, max_acceleration),
            arrive_distance,
            predict_time,
            path_angle_threshold,
            path: Vec::new(),
            current: 0,
            done: false,
        }
    }

    /// Replace the path and restart from its first waypoint
    pub fn set_path(&mut self, path: Vec<Vec2>) {
        self.path = path;
        self.current = 0;
        self.done = false;
    }

    #[must_use]
    pub fn path(&self) -> &[Vec2] {
        &self.path
    }

    /// Index of the waypoint being sought
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Waypoint being sought, if there is a path
    #[must_use]
    pub fn current_point(&self) -> Option<Vec2> {
        self.path.get(self.current).copied()
    }

    /// Whether the last waypoint has been reached
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    fn next_index(&mut self, future: Vec2) -> usize {
        let last = self.path.len() - 1;
        if self.current == last {
            self.done = true;
            return self.current;
        }

        let point = self.path[self.current];
        if future.distance_squared(point) < self.arrive_distance * self.arrive_distance {
            return self.current + 1;
        }

        let to_point = (point - future).normalize_or_zero();
        let segment = (self.path[self.current + 1] - point).normalize_or_zero();
        if to_point.dot(segment) > self.path_angle_threshold {
            return self.current + 1;
        }

        self.current
    }
}

impl SteeringBehavior for FollowPath {
    fn calculate(&mut self, ctx: &SteeringContext<'_>) -> SteeringOutput {
        if self.path.is_empty() {
            return SteeringOutput::ZERO;
        }

        let future = ctx.position + ctx.velocity * self.predict_time;
        self.current = self.next_index(future);
        self.seek.set_target(self.path[self.current]);
        self.seek.calculate(ctx)
    }
}

/// Separation behavior - steer away from nearby agents
///
/// Each neighbor within `check_distance` pushes with strength
/// `min(decay / distance², max_acceleration)`; the sum is normalized, so the
/// output is a unit direction (or zero) regardless of crowd size.
#[derive(Debug, Clone)]
pub struct Separation {
    pub check_distance: f32,
    pub decay_coefficient: f32,
    pub max_acceleration: f32,
}

impl Separation {
    #[must_use]
    pub fn new(check_distance: f32, decay_coefficient: f32, max_acceleration: f32) -> Self {
        Self {
            check_distance,
            decay_coefficient,
            max_acceleration,
        }
    }
}

impl SteeringBehavior for Separation {
    fn calculate(&mut self, ctx: &SteeringContext<'_>) -> SteeringOutput {
        let check_sq = self.check_distance * self.check_distance;
        let mut linear = Vec2::ZERO;

        for &other in ctx.neighbors {
            let away = ctx.position - other;
            let distance_sq = away.length_squared();

            // Coincident positions (the agent itself) have no direction to push along
            if distance_sq < check_sq && distance_sq > 0.0 {
                let strength = (self.decay_coefficient / distance_sq).min(self.max_acceleration);
                linear += away.normalize_or_zero() * strength;
            }
        }

        SteeringOutput {
            linear: linear.normalize_or_zero(),
            angular: 0.0,
        }
    }
}

/// Per-behavior blend weights
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendWeights {
    pub follow_path: f32,
    pub separation: f32,
    pub seek: f32,
}

impl BlendWeights {
    /// Weights while a path is being followed
    #[must_use]
    pub fn following(config: &EnemyConfig) -> Self {
        Self {
            follow_path: config.follow_path_weight,
            separation: config.separation_weight,
            seek: 0.0,
        }
    }

    /// Weights once the path is done and the target is sought directly
    #[must_use]
    pub fn homing(config: &EnemyConfig) -> Self {
        Self {
            follow_path: 0.0,
            separation: config.separation_weight,
            seek: config.seek_weight,
        }
    }
}

/// Accumulates weighted behavior outputs into one clamped steering command
#[derive(Debug, Clone)]
pub struct SteeringBlender {
    accumulator: SteeringOutput,
    /// Maximum length of the blended linear output
    pub max_force: f32,
}

impl SteeringBlender {
    #[must_use]
    pub fn new(max_force: f32) -> Self {
        Self {
            accumulator: SteeringOutput::ZERO,
            max_force,
        }
    }

    /// Clear the accumulator before a blend pass
    pub fn reset(&mut self) {
        self.accumulator = SteeringOutput::ZERO;
    }

    /// Add a behavior's output scaled by its weight
    pub fn add(&mut self, output: SteeringOutput, weight: f32) {
        self.accumulator = self.accumulator.combine(output.scale(weight));
    }

    /// Clamped result of the current pass
    #[must_use]
    pub fn finish(&self) -> SteeringOutput {
        SteeringOutput {
            linear: self.accumulator.linear.clamp_length_max(self.max_force),
            angular: self.accumulator.angular,
        }
    }

    /// Run a full blend pass over an agent's behaviors
    ///
    /// Every behavior is evaluated even at zero weight so that path
    /// following keeps advancing its waypoint index.
    pub fn blend(
        &mut self,
        ctx: &SteeringContext<'_>,
        behaviors: &mut [(&mut dyn SteeringBehavior, f32)],
    ) -> SteeringOutput {
        self.reset();
        for (behavior, weight) in behaviors.iter_mut() {
            let output = behavior.calculate(ctx);
            self.add(output, *weight);
        }
        self.finish()
    }
}
