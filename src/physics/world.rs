//! Physics simulation using rapier3d
//!
//! The game is planar: every body lives on the z = 0 plane. Dynamic bodies
//! are balls locked to XY translation with rotations locked, walls are fixed
//! boxes one metre deep. Forces are accumulated between steps and cleared
//! after each step, so a force applied once affects exactly one step.

use glam::Vec2;
use rapier3d::prelude::*;

use crate::ai::agent::AgentBody;

/// Handle to a rigid body in the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub RigidBodyHandle);

impl BodyHandle {
    fn sort_key(self) -> (u32, u32) {
        self.0.into_raw_parts()
    }
}

/// Two bodies in contact, smaller handle first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyPair(pub BodyHandle, pub BodyHandle);

impl BodyPair {
    #[must_use]
    pub fn new(a: BodyHandle, b: BodyHandle) -> Self {
        if a.sort_key() <= b.sort_key() {
            Self(a, b)
        } else {
            Self(b, a)
        }
    }

    #[must_use]
    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.0 == handle || self.1 == handle
    }
}

/// Material of a dynamic ball
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BallDesc {
    pub radius: f32,
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
}

impl BallDesc {
    #[must_use]
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            density: 1.0,
            friction: 0.0,
            restitution: 0.0,
        }
    }

    #[must_use]
    pub fn with_density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    #[must_use]
    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    #[must_use]
    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }
}

/// Physics world manager
pub struct Physics {
    /// Gravity in the XY plane
    pub gravity: Vec2,
    pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    integration_parameters: IntegrationParameters,
}

impl Physics {
    /// Create a physics world without gravity (top-down)
    #[must_use]
    pub fn new() -> Self {
        Self::with_gravity(Vec2::ZERO)
    }

    #[must_use]
    pub fn with_gravity(gravity: Vec2) -> Self {
        Self {
            gravity,
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            integration_parameters: IntegrationParameters::default(),
        }
    }

    /// Step the simulation, then clear accumulated forces
    pub fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;

        self.pipeline.step(
            &vector![self.gravity.x, self.gravity.y, 0.0],
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );

        for (_, rb) in self.rigid_body_set.iter_mut() {
            rb.reset_forces(false);
        }
    }

    /// Create a dynamic ball on the XY plane
    pub fn create_ball(&mut self, position: Vec2, desc: BallDesc) -> BodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(vector![position.x, position.y, 0.0])
            .enabled_translations(true, true, false)
            .lock_rotations()
            .build();
        let handle = self.rigid_body_set.insert(body);

        let collider = ColliderBuilder::ball(desc.radius)
            .density(desc.density)
            .friction(desc.friction)
            .restitution(desc.restitution)
            .build();
        self.collider_set
            .insert_with_parent(collider, handle, &mut self.rigid_body_set);

        BodyHandle(handle)
    }

    /// Create a fixed box centred on `center`
    pub fn create_wall(&mut self, center: Vec2, half_extents: Vec2) -> BodyHandle {
        let body = RigidBodyBuilder::fixed()
            .translation(vector![center.x, center.y, 0.0])
            .build();
        let handle = self.rigid_body_set.insert(body);

        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, 0.5).build();
        self.collider_set
            .insert_with_parent(collider, handle, &mut self.rigid_body_set);

        BodyHandle(handle)
    }

    /// Create a fixed circular trigger; it reports overlaps but does not block
    pub fn create_sensor(&mut self, center: Vec2, radius: f32) -> BodyHandle {
        let body = RigidBodyBuilder::fixed()
            .translation(vector![center.x, center.y, 0.0])
            .build();
        let handle = self.rigid_body_set.insert(body);

        let collider = ColliderBuilder::ball(radius).sensor(true).build();
        self.collider_set
            .insert_with_parent(collider, handle, &mut self.rigid_body_set);

        BodyHandle(handle)
    }

    #[must_use]
    pub fn position(&self, body: BodyHandle) -> Option<Vec2> {
        self.rigid_body_set.get(body.0).map(|rb| {
            let pos = rb.translation();
            Vec2::new(pos.x, pos.y)
        })
    }

    #[must_use]
    pub fn linear_velocity(&self, body: BodyHandle) -> Option<Vec2> {
        self.rigid_body_set.get(body.0).map(|rb| {
            let vel = rb.linvel();
            Vec2::new(vel.x, vel.y)
        })
    }

    pub fn set_linear_velocity(&mut self, body: BodyHandle, velocity: Vec2) {
        if let Some(rb) = self.rigid_body_set.get_mut(body.0) {
            rb.set_linvel(vector![velocity.x, velocity.y, 0.0], true);
        }
    }

    /// Apply a force for the next step
    pub fn apply_force(&mut self, body: BodyHandle, force: Vec2) {
        if let Some(rb) = self.rigid_body_set.get_mut(body.0) {
            rb.add_force(vector![force.x, force.y, 0.0], true);
        }
    }

    /// Borrow a body as something an agent can steer
    pub fn body_mut(&mut self, body: BodyHandle) -> Option<PhysicsBody<'_>> {
        self.rigid_body_set.get_mut(body.0).map(PhysicsBody)
    }

    /// Remove a rigid body and its colliders
    pub fn remove_body(&mut self, body: BodyHandle) {
        self.rigid_body_set.remove(
            body.0,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
    }

    /// Remove every body
    pub fn clear(&mut self) {
        *self = Self::with_gravity(self.gravity);
    }

    #[must_use]
    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    /// Body pairs touching after the last step, sensors included
    #[must_use]
    pub fn touching_pairs(&self) -> Vec<BodyPair> {
        let parent = |collider: ColliderHandle| {
            self.collider_set
                .get(collider)
                .and_then(|c| c.parent())
                .map(BodyHandle)
        };

        let contacts = self
            .narrow_phase
            .contact_pairs()
            .filter(|pair| pair.has_any_active_contact)
            .map(|pair| (pair.collider1, pair.collider2));
        let overlaps = self
            .narrow_phase
            .intersection_pairs()
            .filter(|&(_, _, intersecting)| intersecting)
            .map(|(a, b, _)| (a, b));

        contacts
            .chain(overlaps)
            .filter_map(|(a, b)| Some(BodyPair::new(parent(a)?, parent(b)?)))
            .collect()
    }
}

impl Default for Physics {
    fn default() -> Self {
        Self::new()
    }
}

/// A borrowed rigid body seen through the XY plane
pub struct PhysicsBody<'a>(&'a mut RigidBody);

impl AgentBody for PhysicsBody<'_> {
    fn position(&self) -> Vec2 {
        let pos = self.0.translation();
        Vec2::new(pos.x, pos.y)
    }

    fn linear_velocity(&self) -> Vec2 {
        let vel = self.0.linvel();
        Vec2::new(vel.x, vel.y)
    }

    fn set_linear_velocity(&mut self, velocity: Vec2) {
        self.0.set_linvel(vector![velocity.x, velocity.y, 0.0], true);
    }

    fn apply_force(&mut self, force: Vec2) {
        self.0.add_force(vector![force.x, force.y, 0.0], true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_no_gravity() {
        let mut physics = Physics::new();
        let ball = physics.create_ball(Vec2::new(1.0, 2.0), BallDesc::new(0.25));

        for _ in 0..10 {
            physics.step(DT);
        }

        let pos = physics.position(ball).unwrap();
        assert!((pos - Vec2::new(1.0, 2.0)).length() < 1e-5);
    }

    #[test]
    fn test_force_lasts_one_step() {
        let mut physics = Physics::new();
        let ball = physics.create_ball(Vec2::ZERO, BallDesc::new(0.25));

        physics.apply_force(ball, Vec2::new(1.0, 0.0));
        physics.step(DT);
        let after_push = physics.linear_velocity(ball).unwrap();
        assert!(after_push.x > 0.0);
        assert!(after_push.y.abs() < 1e-6);

        physics.step(DT);
        let coasting = physics.linear_velocity(ball).unwrap();
        assert!((coasting.x - after_push.x).abs() < 1e-6);
    }

    #[test]
    fn test_physics_body_drives_velocity() {
        let mut physics = Physics::new();
        let ball = physics.create_ball(Vec2::new(3.0, 4.0), BallDesc::new(0.25));

        {
            let mut body = physics.body_mut(ball).unwrap();
            assert_eq!(body.position(), Vec2::new(3.0, 4.0));
            body.set_linear_velocity(Vec2::new(0.0, 2.0));
        }
        physics.step(0.5);

        let pos = physics.position(ball).unwrap();
        assert!((pos.y - 5.0).abs() < 1e-3);
        assert!((pos.x - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_overlapping_balls_touch() {
        let mut physics = Physics::new();
        let a = physics.create_ball(Vec2::ZERO, BallDesc::new(0.25));
        let b = physics.create_ball(Vec2::new(0.3, 0.0), BallDesc::new(0.25));
        let far = physics.create_ball(Vec2::new(10.0, 0.0), BallDesc::new(0.25));

        physics.step(DT);

        let pairs = physics.touching_pairs();
        assert!(pairs.contains(&BodyPair::new(b, a)));
        assert!(!pairs.iter().any(|pair| pair.contains(far)));
    }

    #[test]
    fn test_remove_body() {
        let mut physics = Physics::new();
        let wall = physics.create_wall(Vec2::ZERO, Vec2::splat(0.5));
        assert_eq!(physics.body_count(), 1);

        physics.remove_body(wall);
        assert_eq!(physics.body_count(), 0);
        assert!(physics.position(wall).is_none());
    }
}
