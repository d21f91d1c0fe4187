//! Enemy controller
//!
//! Each enemy runs a small state machine that requests a path to the player,
//! follows it with blended steering, and falls back to seeking the player
//! directly once the path runs out:
//!
//! ```text
//! Idle -> WaitingForPath -> Moving -> (Attacking | Damaged | Dying) -> Erased
//! ```
//!
//! `Attacking`, `Damaged` and `Dying` are entered from contact handling in the
//! world controller. `Erased` is terminal; the owner removes the agent after
//! the tick's updates.

use glam::Vec2;

use crate::ai::pathfinding::{PathFinder, PathResult, RequestId};
use crate::ai::steering::{
    BlendWeights, FollowPath, Seek, Separation, SteeringBehavior, SteeringBlender,
    SteeringContext, SteeringOutput,
};
use crate::core::config::EnemyConfig;

/// Physics body driven by an agent
pub trait AgentBody {
    fn position(&self) -> Vec2;
    fn linear_velocity(&self) -> Vec2;
    fn set_linear_velocity(&mut self, velocity: Vec2);
    /// Apply a force for the next physics step
    fn apply_force(&mut self, force: Vec2);
}

/// Behavior state of an enemy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentState {
    Idle,
    WaitingForPath,
    Moving,
    Attacking,
    Damaged,
    Dying,
    Erased,
}

impl AgentState {
    /// State name for debugging and logging
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::WaitingForPath => "WaitingForPath",
            Self::Moving => "Moving",
            Self::Attacking => "Attacking",
            Self::Damaged => "Damaged",
            Self::Dying => "Dying",
            Self::Erased => "Erased",
        }
    }

    /// Whether steering may move the body
    #[must_use]
    pub fn can_move(self) -> bool {
        !matches!(self, Self::Dying | Self::Erased)
    }
}

/// World state an enemy reads during its update
pub struct AgentContext<'a> {
    /// Seconds since the previous tick
    pub delta: f32,
    /// Live position of the player
    pub target: Vec2,
    /// Positions of all enemies this tick
    pub neighbors: &'a [Vec2],
    pub path_finder: &'a mut PathFinder,
}

/// Per-enemy AI: state machine, path and steering
#[derive(Debug, Clone)]
pub struct Enemy {
    state: AgentState,
    /// Seconds spent in the current state
    state_time: f32,
    position: Vec2,
    orientation: f32,
    health: f32,
    damage: f32,
    follow_path: FollowPath,
    separation: Separation,
    seek: Seek,
    weights: BlendWeights,
    following: BlendWeights,
    homing: BlendWeights,
    blender: SteeringBlender,
    pending: Option<RequestId>,
    max_speed: f32,
    repath_distance: f32,
    damaged_time: f32,
    dying_time: f32,
}

impl Enemy {
    #[must_use]
    pub fn new(config: &EnemyConfig, position: Vec2) -> Self {
        let following = BlendWeights::following(config);
        Self {
            state: AgentState::Idle,
            state_time: 0.0,
            position,
            orientation: 0.0,
            health: config.health,
            damage: config.damage,
            follow_path: FollowPath::new(
                config.max_force,
                config.arrive_distance,
                config.predict_time,
                config.path_angle_threshold,
            ),
            separation: Separation::new(
                config.separation_check_distance,
                config.separation_decay,
                config.max_force,
            ),
            seek: Seek::new(position, config.max_force),
            weights: following,
            following,
            homing: BlendWeights::homing(config),
            blender: SteeringBlender::new(config.max_force),
            pending: None,
            max_speed: config.max_speed,
            repath_distance: config.repath_distance,
            damaged_time: config.damaged_time,
            dying_time: config.dying_time,
        }
    }

    #[must_use]
    pub fn state(&self) -> AgentState {
        self.state
    }

    /// Position as of the last update
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Heading in radians, following the velocity
    #[must_use]
    pub fn orientation(&self) -> f32 {
        self.orientation
    }

    #[must_use]
    pub fn health(&self) -> f32 {
        self.health
    }

    /// Damage dealt to the player on contact
    #[must_use]
    pub fn damage(&self) -> f32 {
        self.damage
    }

    #[must_use]
    pub fn path(&self) -> &[Vec2] {
        self.follow_path.path()
    }

    #[must_use]
    pub fn follow_path(&self) -> &FollowPath {
        &self.follow_path
    }

    #[must_use]
    pub fn weights(&self) -> BlendWeights {
        self.weights
    }

    /// Request awaiting a result, if any
    #[must_use]
    pub fn pending_request(&self) -> Option<RequestId> {
        self.pending
    }

    fn set_state(&mut self, state: AgentState) {
        if self.state != state {
            log::trace!("Enemy {} -> {}", self.state.name(), state.name());
            self.state = state;
            self.state_time = 0.0;
        }
    }

    /// Run one tick: state machine, steering blend, then movement
    ///
    /// Returns the blended steering that was (or, when the agent cannot move,
    /// would have been) applied.
    pub fn update(&mut self, body: &mut impl AgentBody, ctx: &mut AgentContext<'_>) -> SteeringOutput {
        self.position = body.position();
        self.state_time += ctx.delta;

        self.update_ai(ctx);

        let velocity = body.linear_velocity();
        self.seek.set_target(ctx.target);
        let steering_ctx = SteeringContext::new(self.position, velocity, ctx.delta, ctx.neighbors);

        let mut behaviors: [(&mut dyn SteeringBehavior, f32); 3] = [
            (&mut self.follow_path, self.weights.follow_path),
            (&mut self.separation, self.weights.separation),
            (&mut self.seek, self.weights.seek),
        ];
        let steering = self.blender.blend(&steering_ctx, &mut behaviors);

        if self.state.can_move() && steering.linear.length_squared() > 0.0 {
            body.apply_force(steering.linear);
            let velocity = velocity.clamp_length_max(self.max_speed);
            if velocity != Vec2::ZERO {
                // Look where you're going
                self.orientation = velocity.y.atan2(velocity.x);
            }
            body.set_linear_velocity(velocity);
        } else {
            body.set_linear_velocity(Vec2::ZERO);
        }

        steering
    }

    fn update_ai(&mut self, ctx: &mut AgentContext<'_>) {
        match self.state {
            AgentState::Idle => {
                self.request_path(ctx.path_finder, ctx.target);
                self.set_state(AgentState::WaitingForPath);
            }
            AgentState::WaitingForPath => {
                if let Some(result) = self.pending.and_then(|id| ctx.path_finder.try_take_result(id)) {
                    self.on_path_result(result);
                }
            }
            AgentState::Moving => self.update_move(ctx.target),
            AgentState::Damaged => {
                if self.state_time >= self.damaged_time {
                    self.set_state(AgentState::Idle);
                }
            }
            AgentState::Dying => {
                if self.state_time >= self.dying_time {
                    self.set_state(AgentState::Erased);
                }
            }
            AgentState::Attacking | AgentState::Erased => {}
        }
    }

    fn update_move(&mut self, target: Vec2) {
        // The player wandered off from where the path leads: plan again
        let stale = self.follow_path.path().last().is_none_or(|end| {
            end.distance_squared(target) > self.repath_distance * self.repath_distance
        });
        if stale {
            self.set_state(AgentState::Idle);
            return;
        }

        if self.follow_path.is_done() {
            self.weights = self.homing;
        }
    }

    /// Queue a path request; a newer request supersedes any outstanding one
    pub fn request_path(&mut self, path_finder: &mut PathFinder, target: Vec2) -> RequestId {
        let id = path_finder.request_path(self.position, target);
        if let Some(previous) = self.pending.replace(id) {
            path_finder.forget(previous);
        }
        id
    }

    /// Accept a resolved request
    ///
    /// Results for superseded requests, and results arriving when the enemy
    /// is no longer waiting, are ignored. Failures are dropped without retry:
    /// the enemy keeps waiting until something else sends it back to `Idle`.
    pub fn on_path_result(&mut self, result: PathResult) {
        if self.pending != Some(result.id) {
            return;
        }
        self.pending = None;

        if self.state != AgentState::WaitingForPath {
            return;
        }

        match result.outcome {
            Ok(path) => {
                self.follow_path.set_path(path);
                self.weights = self.following;
                self.set_state(AgentState::Moving);
            }
            Err(e) => log::debug!("Path request {} dropped: {e}", result.id),
        }
    }

    /// The enemy touched the player
    pub fn on_player_contact(&mut self) {
        if matches!(
            self.state,
            AgentState::Idle | AgentState::WaitingForPath | AgentState::Moving | AgentState::Damaged
        ) {
            self.set_state(AgentState::Attacking);
        }
    }

    /// The enemy stopped touching the player
    pub fn on_player_contact_end(&mut self) {
        if self.state == AgentState::Attacking {
            if self.follow_path.path().is_empty() {
                self.set_state(AgentState::Idle);
            } else {
                self.set_state(AgentState::Moving);
            }
        }
    }

    /// Take damage; returns true if this hit started the dying sequence
    pub fn hit(&mut self, damage: f32) -> bool {
        if !self.state.can_move() {
            return false;
        }

        self.health -= damage;
        if self.health <= 0.0 {
            self.set_state(AgentState::Dying);
            true
        } else {
            self.set_state(AgentState::Damaged);
            false
        }
    }

    /// Mark for removal immediately
    pub fn erase(&mut self) {
        self.set_state(AgentState::Erased);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::grid::NavGrid;
    use crate::core::config::PathFinderConfig;

    #[derive(Debug, Default)]
    struct TestBody {
        position: Vec2,
        velocity: Vec2,
        force: Vec2,
    }

    impl AgentBody for TestBody {
        fn position(&self) -> Vec2 {
            self.position
        }
        fn linear_velocity(&self) -> Vec2 {
            self.velocity
        }
        fn set_linear_velocity(&mut self, velocity: Vec2) {
            self.velocity = velocity;
        }
        fn apply_force(&mut self, force: Vec2) {
            self.force += force;
        }
    }

    fn path_finder(grid: NavGrid) -> PathFinder {
        let mut finder = PathFinder::new(&PathFinderConfig {
            budget_ms: 5,
            pixels_per_metre: 1.0,
        });
        finder.set_grid(grid);
        finder
    }

    fn tick(enemy: &mut Enemy, body: &mut TestBody, finder: &mut PathFinder, target: Vec2) -> SteeringOutput {
        let neighbors = [body.position];
        let mut ctx = AgentContext {
            delta: 0.1,
            target,
            neighbors: &neighbors,
            path_finder: finder,
        };
        enemy.update(body, &mut ctx)
    }

    fn setup(position: Vec2) -> (Enemy, TestBody) {
        let enemy = Enemy::new(&EnemyConfig::default(), position);
        let body = TestBody {
            position,
            ..Default::default()
        };
        (enemy, body)
    }

    #[test]
    fn test_idle_requests_path_then_moves() {
        let mut finder = path_finder(NavGrid::new(10, 10, 1.0, 1.0));
        let (mut enemy, mut body) = setup(Vec2::new(0.5, 0.5));
        let target = Vec2::new(8.5, 8.5);

        tick(&mut enemy, &mut body, &mut finder, target);
        assert_eq!(enemy.state(), AgentState::WaitingForPath);
        assert!(enemy.pending_request().is_some());
        assert_eq!(finder.pending_len(), 1);

        // Still waiting: no second request
        tick(&mut enemy, &mut body, &mut finder, target);
        assert_eq!(finder.pending_len(), 1);

        finder.update();
        tick(&mut enemy, &mut body, &mut finder, target);
        assert_eq!(enemy.state(), AgentState::Moving);
        assert_eq!(enemy.path().len(), 9);
        assert_eq!(enemy.weights(), BlendWeights::following(&EnemyConfig::default()));
        assert!(enemy.pending_request().is_none());
    }

    #[test]
    fn test_failed_request_is_dropped() {
        let mut grid = NavGrid::new(10, 10, 1.0, 1.0);
        grid.set_walkable(8, 8, false);
        let mut finder = path_finder(grid);
        let (mut enemy, mut body) = setup(Vec2::new(0.5, 0.5));
        let target = Vec2::new(8.5, 8.5);

        tick(&mut enemy, &mut body, &mut finder, target);
        finder.update();
        for _ in 0..5 {
            tick(&mut enemy, &mut body, &mut finder, target);
        }

        assert_eq!(enemy.state(), AgentState::WaitingForPath);
        assert!(enemy.pending_request().is_none());
        assert_eq!(finder.pending_len(), 0);
    }

    #[test]
    fn test_repath_when_player_moves_away() {
        let mut finder = path_finder(NavGrid::new(20, 20, 1.0, 1.0));
        let (mut enemy, mut body) = setup(Vec2::new(0.5, 0.5));

        tick(&mut enemy, &mut body, &mut finder, Vec2::new(4.5, 4.5));
        finder.update();
        tick(&mut enemy, &mut body, &mut finder, Vec2::new(4.5, 4.5));
        assert_eq!(enemy.state(), AgentState::Moving);

        // Within the re-path distance of the path's end: keep going
        tick(&mut enemy, &mut body, &mut finder, Vec2::new(6.5, 4.5));
        assert_eq!(enemy.state(), AgentState::Moving);

        tick(&mut enemy, &mut body, &mut finder, Vec2::new(15.5, 15.5));
        assert_eq!(enemy.state(), AgentState::Idle);

        tick(&mut enemy, &mut body, &mut finder, Vec2::new(15.5, 15.5));
        assert_eq!(enemy.state(), AgentState::WaitingForPath);
    }

    #[test]
    fn test_switches_to_seek_when_path_done() {
        let mut finder = path_finder(NavGrid::new(10, 10, 1.0, 1.0));
        let (mut enemy, mut body) = setup(Vec2::new(3.2, 3.2));
        let target = Vec2::new(3.8, 3.7);
        let config = EnemyConfig::default();

        tick(&mut enemy, &mut body, &mut finder, target);
        finder.update();
        tick(&mut enemy, &mut body, &mut finder, target);
        assert_eq!(enemy.path().len(), 1);
        assert!(enemy.follow_path().is_done());
        assert_eq!(enemy.weights(), BlendWeights::following(&config));

        tick(&mut enemy, &mut body, &mut finder, target);
        assert_eq!(enemy.state(), AgentState::Moving);
        assert_eq!(enemy.weights(), BlendWeights::homing(&config));
    }

    #[test]
    fn test_movement_applies_force_and_clamps_speed() {
        let mut finder = path_finder(NavGrid::new(10, 10, 1.0, 1.0));
        let (mut enemy, mut body) = setup(Vec2::new(3.2, 3.2));
        let target = Vec2::new(3.8, 3.7);

        tick(&mut enemy, &mut body, &mut finder, target);
        finder.update();
        tick(&mut enemy, &mut body, &mut finder, target);
        tick(&mut enemy, &mut body, &mut finder, target);

        body.force = Vec2::ZERO;
        body.velocity = Vec2::new(10.0, 0.0);
        let steering = tick(&mut enemy, &mut body, &mut finder, target);

        let config = EnemyConfig::default();
        assert!(steering.linear.length() <= config.max_force + 1e-5);
        assert!(body.force.length() > 0.0);
        assert!((body.velocity.length() - config.max_speed).abs() < 1e-4);
        assert!(enemy.orientation().abs() < 1e-5);
    }

    #[test]
    fn test_dying_stops_and_erases() {
        let mut finder = path_finder(NavGrid::new(10, 10, 1.0, 1.0));
        let (mut enemy, mut body) = setup(Vec2::new(0.5, 0.5));

        assert!(enemy.hit(EnemyConfig::default().health));
        assert_eq!(enemy.state(), AgentState::Dying);
        assert!(!enemy.hit(1.0));

        body.velocity = Vec2::new(1.0, 1.0);
        tick(&mut enemy, &mut body, &mut finder, Vec2::new(5.5, 5.5));
        assert_eq!(body.velocity, Vec2::ZERO);
        assert_eq!(body.force, Vec2::ZERO);
        assert_eq!(finder.pending_len(), 0);

        for _ in 0..5 {
            tick(&mut enemy, &mut body, &mut finder, Vec2::new(5.5, 5.5));
        }
        assert_eq!(enemy.state(), AgentState::Erased);
        assert_eq!(body.velocity, Vec2::ZERO);
    }

    #[test]
    fn test_damaged_recovers_to_idle() {
        let config = EnemyConfig {
            health: 3.0,
            damaged_time: 0.25,
            ..EnemyConfig::default()
        };
        let mut finder = path_finder(NavGrid::new(10, 10, 1.0, 1.0));
        let mut enemy = Enemy::new(&config, Vec2::new(0.5, 0.5));
        let mut body = TestBody {
            position: Vec2::new(0.5, 0.5),
            ..Default::default()
        };

        assert!(!enemy.hit(1.0));
        assert_eq!(enemy.state(), AgentState::Damaged);
        assert!((enemy.health() - 2.0).abs() < f32::EPSILON);

        for _ in 0..3 {
            tick(&mut enemy, &mut body, &mut finder, Vec2::new(5.5, 5.5));
        }
        assert_eq!(enemy.state(), AgentState::Idle);
    }

    #[test]
    fn test_contact_enters_and_leaves_attacking() {
        let mut finder = path_finder(NavGrid::new(10, 10, 1.0, 1.0));
        let (mut enemy, mut body) = setup(Vec2::new(0.5, 0.5));
        let target = Vec2::new(4.5, 4.5);

        tick(&mut enemy, &mut body, &mut finder, target);
        finder.update();
        tick(&mut enemy, &mut body, &mut finder, target);

        enemy.on_player_contact();
        assert_eq!(enemy.state(), AgentState::Attacking);
        enemy.on_player_contact_end();
        assert_eq!(enemy.state(), AgentState::Moving);

        enemy.erase();
        enemy.on_player_contact();
        assert_eq!(enemy.state(), AgentState::Erased);
    }

    #[test]
    fn test_newer_request_supersedes_older() {
        let mut finder = path_finder(NavGrid::new(10, 10, 1.0, 1.0));
        let (mut enemy, _) = setup(Vec2::new(0.5, 0.5));

        let first = enemy.request_path(&mut finder, Vec2::new(5.5, 5.5));
        let second = enemy.request_path(&mut finder, Vec2::new(6.5, 6.5));
        assert_eq!(enemy.pending_request(), Some(second));

        finder.update();
        assert!(finder.try_take_result(first).is_none());
        assert!(finder.try_take_result(second).is_some());
    }
}
