//! World wrapper around hecs

use hecs::Entity;

use crate::ai::agent::AgentState;
use crate::ecs::components::{Body, Bullet, Enemy, EntityKind};
use crate::physics::BodyHandle;

/// Entities of the running level: enemies and bullets
pub struct World {
    /// The underlying hecs world
    pub inner: hecs::World,
}

impl World {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: hecs::World::new(),
        }
    }

    /// Spawn an enemy backed by `body`
    pub fn spawn_enemy(&mut self, enemy: Enemy, body: BodyHandle) -> Entity {
        self.inner.spawn((EntityKind::Enemy, Body(body), enemy))
    }

    /// Spawn a bullet backed by `body`
    pub fn spawn_bullet(&mut self, bullet: Bullet, body: BodyHandle) -> Entity {
        self.inner.spawn((EntityKind::Bullet, Body(body), bullet))
    }

    pub fn despawn(&mut self, entity: Entity) -> Result<(), hecs::NoSuchEntity> {
        self.inner.despawn(entity)
    }

    pub fn get<T: hecs::Component>(
        &self,
        entity: Entity,
    ) -> Result<hecs::Ref<'_, T>, hecs::ComponentError> {
        self.inner.get::<&T>(entity)
    }

    pub fn get_mut<T: hecs::Component>(
        &mut self,
        entity: Entity,
    ) -> Result<hecs::RefMut<'_, T>, hecs::ComponentError> {
        self.inner.get::<&mut T>(entity)
    }

    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.inner.contains(entity)
    }

    /// Kind of an entity, if it is still alive
    #[must_use]
    pub fn kind(&self, entity: Entity) -> Option<EntityKind> {
        self.get::<EntityKind>(entity).ok().map(|kind| *kind)
    }

    /// Live enemies, including those still dying
    #[must_use]
    pub fn enemy_count(&self) -> usize {
        self.inner.query::<&Enemy>().iter().count()
    }

    /// Enemies whose state machine finished, and spent bullets
    #[must_use]
    pub fn finished(&self) -> Vec<(Entity, BodyHandle)> {
        let mut finished: Vec<(Entity, BodyHandle)> = self
            .inner
            .query::<(&Enemy, &Body)>()
            .iter()
            .filter(|(_, (enemy, _))| enemy.state() == AgentState::Erased)
            .map(|(entity, (_, body))| (entity, body.0))
            .collect();

        finished.extend(
            self.inner
                .query::<(&Bullet, &Body)>()
                .iter()
                .filter(|(_, (bullet, _))| bullet.spent)
                .map(|(entity, (_, body))| (entity, body.0)),
        );

        finished
    }

    #[must_use]
    pub fn len(&self) -> u32 {
        self.inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Remove every entity
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn query<Q: hecs::Query>(&self) -> hecs::QueryBorrow<'_, Q> {
        self.inner.query::<Q>()
    }

    pub fn query_mut<Q: hecs::Query>(&mut self) -> hecs::QueryMut<'_, Q> {
        self.inner.query_mut::<Q>()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
